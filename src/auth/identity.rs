use std::future::Future;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

use super::AuthError;
use crate::storage::{Database, Role};

/// A verified account, as returned by credential verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

/// Identity and role service consumed by [`super::AdminGate`].
///
/// `lookup_role` must be authoritative: the gate calls it before every
/// privileged operation and never caches the answer.
pub trait IdentityProvider {
    fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    fn lookup_role(&self, identity: &Identity)
        -> impl Future<Output = Result<Role, AuthError>> + Send;

    fn sign_out(&self) -> impl Future<Output = ()> + Send;
}

// ============================================================================
// SQLite-backed provider
// ============================================================================

/// Accounts and profiles stored in the local database.
///
/// Passwords are stored as Argon2id PHC strings. Hashing and verification run
/// on the blocking pool.
#[derive(Clone)]
pub struct LocalIdentity {
    db: Database,
}

impl LocalIdentity {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create an account with the given role
    pub async fn register(&self, email: &str, password: &str, role: Role) -> anyhow::Result<i64> {
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
        self.db.create_account(email.trim(), &hash, role).await
    }
}

impl IdentityProvider for LocalIdentity {
    async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let account = self
            .db
            .find_account(email.trim())
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let password = password.to_owned();
        let stored = account.password_hash;
        let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored))
            .await
            .map_err(|e| AuthError::Unavailable(e.to_string()))?;
        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(Identity {
            id: account.id,
            email: account.email,
        })
    }

    async fn lookup_role(&self, identity: &Identity) -> Result<Role, AuthError> {
        self.db
            .get_role(identity.id)
            .await
            .map_err(|e| AuthError::RoleLookup(e.to_string()))?
            .ok_or_else(|| AuthError::RoleLookup(format!("no profile for account {}", identity.id)))
    }

    async fn sign_out(&self) {
        // Nothing is held server-side for a local session.
        tracing::debug!("Local identity signed out");
    }
}

fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|e| anyhow::anyhow!("Failed to encode salt: {}", e))?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    Ok(hash.to_string())
}

/// Unparseable stored hashes never verify
fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored).is_ok_and(|hash| {
        Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok()
    })
}
