//! Premium access gate.
//!
//! The gate is a pure decision over already-resolved flags. Callers must run
//! it before touching storage or writing any response header so a denial
//! never reveals content or its size.

use crate::error::{Error, Result};
use crate::track::{Track, UserEntitlement};

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    PremiumRequired,
}

/// Outcome of [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }

    /// Convert a denial into the matching [`Error`].
    pub fn into_result(self) -> Result<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(DenyReason::PremiumRequired) => Err(Error::PremiumRequired),
        }
    }
}

/// Decide whether `user` may receive `track`.
pub fn authorize(track: &Track, user: &UserEntitlement) -> Access {
    if track.is_premium && !user.is_premium {
        Access::Deny(DenyReason::PremiumRequired)
    } else {
        Access::Allow
    }
}
