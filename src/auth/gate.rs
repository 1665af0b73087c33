use super::identity::{Identity, IdentityProvider};
use super::AuthError;
use crate::storage::Role;

/// Where a session stands with respect to admin access
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    /// Credentials verified, role not yet resolved. Grants nothing.
    PendingRole(Identity),
    Admin(Identity),
}

/// Admin authorization state machine.
///
/// Only [`SessionState::Admin`] permits privileged work, and even then
/// [`AdminGate::authorize`] re-resolves the role against the provider before
/// each operation. Any verification or lookup failure, and any non-admin role,
/// signs the identity out and leaves the gate `Anonymous`.
pub struct AdminGate<P> {
    provider: P,
    state: SessionState,
}

impl<P: IdentityProvider> AdminGate<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            state: SessionState::Anonymous,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.state, SessionState::Admin(_))
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Verify credentials, then resolve the role.
    ///
    /// The role lookup is deferred to the next scheduler tick so it never runs
    /// inside the provider's own verification callback.
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<(), AuthError> {
        self.state = SessionState::Anonymous;

        let identity = match self.provider.verify_credentials(email, password).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::info!(error = %e, "Sign-in rejected");
                return Err(e);
            }
        };

        tracing::debug!(account_id = identity.id, "Credentials verified, resolving role");
        self.state = SessionState::PendingRole(identity.clone());
        tokio::task::yield_now().await;

        self.resolve_role(identity).await
    }

    /// Explicit logout
    pub async fn sign_out(&mut self) {
        self.provider.sign_out().await;
        self.state = SessionState::Anonymous;
    }

    /// Check that the session may perform a privileged operation right now.
    ///
    /// Call immediately before every mutation. A role revoked since sign-in is
    /// detected here and ends the session.
    pub async fn authorize(&mut self) -> Result<(), AuthError> {
        let identity = match &self.state {
            SessionState::Admin(identity) => identity.clone(),
            _ => return Err(AuthError::NotSignedIn),
        };
        self.resolve_role(identity).await
    }

    async fn resolve_role(&mut self, identity: Identity) -> Result<(), AuthError> {
        match self.provider.lookup_role(&identity).await {
            Ok(Role::Admin) => {
                self.state = SessionState::Admin(identity);
                Ok(())
            }
            Ok(Role::User) => {
                tracing::warn!(account_id = identity.id, "Non-admin account signed out");
                self.fail_closed().await;
                Err(AuthError::NotAdmin)
            }
            Err(e) => {
                tracing::warn!(account_id = identity.id, error = %e, "Role lookup failed");
                self.fail_closed().await;
                Err(match e {
                    AuthError::RoleLookup(msg) => AuthError::RoleLookup(msg),
                    other => AuthError::RoleLookup(other.to_string()),
                })
            }
        }
    }

    async fn fail_closed(&mut self) {
        self.provider.sign_out().await;
        self.state = SessionState::Anonymous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Provider whose role answer can be changed between calls
    #[derive(Clone, Default)]
    struct MockIdentity {
        role: Arc<Mutex<Option<Role>>>,
        sign_outs: Arc<AtomicUsize>,
        lookups: Arc<AtomicUsize>,
    }

    impl MockIdentity {
        fn with_role(role: Option<Role>) -> Self {
            let mock = Self::default();
            *mock.role.lock().unwrap() = role;
            mock
        }

        fn set_role(&self, role: Option<Role>) {
            *self.role.lock().unwrap() = role;
        }

        fn sign_outs(&self) -> usize {
            self.sign_outs.load(Ordering::SeqCst)
        }
    }

    impl IdentityProvider for MockIdentity {
        async fn verify_credentials(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
            if password == "correct" {
                Ok(Identity {
                    id: 1,
                    email: email.to_string(),
                })
            } else {
                Err(AuthError::InvalidCredentials)
            }
        }

        async fn lookup_role(&self, _identity: &Identity) -> Result<Role, AuthError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let role = *self.role.lock().unwrap();
            role.ok_or_else(|| AuthError::RoleLookup("profile missing".to_string()))
        }

        async fn sign_out(&self) {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_admin_sign_in() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::Admin)));

        gate.sign_in("admin@example.com", "correct").await.unwrap();

        assert!(gate.is_admin());
        assert_eq!(gate.provider().sign_outs(), 0);
    }

    #[tokio::test]
    async fn test_bad_credentials_stay_anonymous() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::Admin)));

        let err = gate.sign_in("admin@example.com", "nope").await.unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(gate.provider().lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_non_admin_is_signed_out() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::User)));

        let err = gate.sign_in("user@example.com", "correct").await.unwrap_err();

        assert!(matches!(err, AuthError::NotAdmin));
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(gate.provider().sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let mut gate = AdminGate::new(MockIdentity::with_role(None));

        let err = gate.sign_in("admin@example.com", "correct").await.unwrap_err();

        assert!(matches!(err, AuthError::RoleLookup(_)));
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(gate.provider().sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_authorize_requires_admin_state() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::Admin)));
        assert!(matches!(gate.authorize().await, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_authorize_rechecks_role_every_time() {
        let mock = MockIdentity::with_role(Some(Role::Admin));
        let mut gate = AdminGate::new(mock.clone());
        gate.sign_in("admin@example.com", "correct").await.unwrap();

        gate.authorize().await.unwrap();
        gate.authorize().await.unwrap();
        assert_eq!(mock.lookups.load(Ordering::SeqCst), 3);

        // Role revoked mid-session
        mock.set_role(Some(Role::User));
        assert!(matches!(gate.authorize().await, Err(AuthError::NotAdmin)));
        assert_eq!(gate.state(), &SessionState::Anonymous);
        assert_eq!(mock.sign_outs(), 1);

        // The stale session cannot be reused even after the role comes back
        mock.set_role(Some(Role::Admin));
        assert!(matches!(gate.authorize().await, Err(AuthError::NotSignedIn)));
    }

    #[tokio::test]
    async fn test_explicit_sign_out() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::Admin)));
        gate.sign_in("admin@example.com", "correct").await.unwrap();

        gate.sign_out().await;

        assert!(!gate.is_admin());
        assert_eq!(gate.provider().sign_outs(), 1);
    }

    #[tokio::test]
    async fn test_failed_sign_in_drops_previous_session() {
        let mut gate = AdminGate::new(MockIdentity::with_role(Some(Role::Admin)));
        gate.sign_in("admin@example.com", "correct").await.unwrap();

        let _ = gate.sign_in("admin@example.com", "wrong").await;

        assert_eq!(gate.state(), &SessionState::Anonymous);
    }
}
