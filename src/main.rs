mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};

use sg_core::config::Config;
use sg_core::{Category, Role};
use sg_db::queries::tracks::NewTrack;

fn load_config(path: Option<&Path>) -> Config {
    let mut config = Config::load_or_default(path);
    config.apply_env_overrides();
    config
}

async fn start_server(host: Option<String>, port: Option<u16>, config_path: Option<&Path>) -> Result<()> {
    let mut config = load_config(config_path);

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting soundgate {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        backend = ?config.storage.backend,
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    sg_server::start(config).await?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "soundgate=trace,sg_server=trace,sg_storage=trace,sg_db=debug,sg_core=debug,tower_http=debug".to_string()
        } else {
            "soundgate=debug,sg_server=debug,sg_storage=debug,sg_db=info,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::AddTrack {
            title,
            artist,
            category,
            locator,
            duration_secs,
            tags,
            mime_type,
            cover_image,
            premium,
        } => {
            let category: Category = category.parse()?;
            let new = NewTrack {
                title,
                artist,
                duration_secs,
                category,
                tags: tags
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
                storage_locator: locator,
                size_bytes: None,
                mime_type,
                cover_image,
                is_premium: premium,
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(add_track(new, cli.config.as_deref()))
        }
        Commands::CreateUser {
            username,
            password,
            premium,
            admin,
        } => create_user(&username, &password, premium, admin, cli.config.as_deref()),
        Commands::SetPremium { username, revoke } => {
            set_premium(&username, !revoke, cli.config.as_deref())
        }
        Commands::HashPassword { password } => hash_password(&password),
        Commands::GenerateApiKey => {
            println!("{}", generate_api_key());
            Ok(())
        }
        Commands::Version => {
            println!("soundgate {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn open_db(config: &Config) -> Result<sg_db::pool::DbPool> {
    let path = &config.server.db_path;
    sg_db::pool::init_pool(path)
        .with_context(|| format!("failed to open database at {}", path.display()))
}

/// Stat the blob through the configured store, then insert the track.
async fn add_track(mut new: NewTrack, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let store = sg_storage::build_store(&config.storage)?;

    let blob = store
        .resolve(&new.storage_locator)
        .await
        .with_context(|| format!("cannot resolve {} in the {} store", new.storage_locator, store.backend()))?;
    new.size_bytes = Some(blob.size_bytes);
    if new.mime_type.is_none() {
        new.mime_type = blob.content_type;
    }

    let db = open_db(&config)?;
    let conn = sg_db::pool::get_conn(&db)?;
    let track = sg_db::queries::tracks::create_track(&conn, &new)?;

    println!("Added track {} ({} bytes)", track.id, blob.size_bytes);
    println!("  Title: {}", track.title);
    println!("  Category: {}", track.category);
    println!("  Premium: {}", track.is_premium);
    Ok(())
}

fn create_user(
    username: &str,
    password: &str,
    premium: bool,
    admin: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    if username.trim().is_empty() {
        anyhow::bail!("username must not be empty");
    }
    if password.len() < 8 {
        anyhow::bail!("password must be at least 8 characters");
    }

    let config = load_config(config_path);
    let db = open_db(&config)?;
    let conn = sg_db::pool::get_conn(&db)?;

    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let role = if admin { Role::Admin } else { Role::User };
    let user =
        sg_db::queries::users::create_user(&conn, username.trim(), &hash, role.as_str(), premium)?;

    println!("Created user {} ({})", user.username, user.id);
    println!("  Role: {}", user.role);
    println!("  Premium: {}", user.is_premium);
    Ok(())
}

fn set_premium(username: &str, premium: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let db = open_db(&config)?;
    let conn = sg_db::pool::get_conn(&db)?;

    let user = sg_db::queries::users::get_user_by_username(&conn, username)?
        .with_context(|| format!("no user named {username}"))?;
    sg_db::queries::users::set_premium(&conn, user.id, premium)?;

    println!(
        "{} premium access for {}",
        if premium { "Granted" } else { "Revoked" },
        user.username
    );
    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let contents = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read {}", p.display()))?;
            let mut config = Config::from_json(&contents)?;
            config.apply_env_overrides();
            println!("✓ Configuration is valid");
            print_summary(&config);
            for warning in config.validate() {
                println!("  ⚠ {warning}");
            }
        }
        None => {
            println!("No config file specified, using defaults");
            print_summary(&Config::default());
        }
    }

    Ok(())
}

fn print_summary(config: &Config) {
    println!("  Server: {}:{}", config.server.host, config.server.port);
    println!("  Database: {}", config.server.db_path.display());
    println!("  Auth enabled: {}", config.auth.enabled);
    println!("  Storage backend: {:?}", config.storage.backend);
    println!("  Chunk size: {}", config.streaming.effective_chunk_size());
    println!("  Rate limit: {}/min", config.rate_limit.requests_per_minute);
}

fn hash_password(password: &str) -> Result<()> {
    let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    println!("{}", hash);
    Ok(())
}

fn generate_api_key() -> String {
    use rand::Rng;
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}
