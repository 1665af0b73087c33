//! Admin authentication.
//!
//! [`AdminGate`] tracks a single session through anonymous, pending-role and
//! admin states. [`IdentityProvider`] is the seam to whatever verifies
//! credentials and stores roles; [`LocalIdentity`] is the SQLite-backed one.

mod gate;
mod identity;

use thiserror::Error;

pub use gate::{AdminGate, SessionState};
pub use identity::{Identity, IdentityProvider, LocalIdentity};

/// Authorization and role-lookup failures.
///
/// Every variant leaves the gate anonymous.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This account does not have admin access")]
    NotAdmin,

    #[error("Could not verify account role: {0}")]
    RoleLookup(String),

    #[error("Sign in as an admin to continue")]
    NotSignedIn,

    #[error("Identity service unavailable: {0}")]
    Unavailable(String),
}
