use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "soundgate")]
#[command(author, version, about = "Audio streaming backend with premium-gated byte-range delivery")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Register a track whose audio is already in the blob store
    AddTrack {
        /// Track title
        #[arg(long)]
        title: String,

        /// Artist name
        #[arg(long, default_value = "Unknown")]
        artist: String,

        /// focus, meditation, ambient or nature
        #[arg(long)]
        category: String,

        /// Storage locator (path under the local root, or object key/URL)
        #[arg(long)]
        locator: String,

        /// Duration in seconds
        #[arg(long, default_value_t = 0)]
        duration_secs: u32,

        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// MIME type (detected from the store when omitted)
        #[arg(long)]
        mime_type: Option<String>,

        /// Cover image URL
        #[arg(long)]
        cover_image: Option<String>,

        /// Restrict to premium members
        #[arg(long)]
        premium: bool,
    },

    /// Create a user account
    CreateUser {
        /// Login name
        username: String,

        /// Password (hashed with bcrypt before storing)
        #[arg(long)]
        password: String,

        /// Grant premium access
        #[arg(long)]
        premium: bool,

        /// Give the account the admin role (edit and delete catalog tracks)
        #[arg(long)]
        admin: bool,
    },

    /// Grant or revoke premium access for an existing user
    SetPremium {
        /// Login name
        username: String,

        /// Revoke instead of grant
        #[arg(long)]
        revoke: bool,
    },

    /// Generate a bcrypt password hash
    HashPassword {
        /// Password to hash
        password: String,
    },

    /// Generate a random API key for `auth.api_key`
    GenerateApiKey,

    /// Display version information
    Version,
}
