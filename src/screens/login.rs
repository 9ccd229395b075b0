use std::sync::Arc;

use crate::{
    gateway::{Gateway, GatewayError},
    session::SessionStore,
};

pub const CREDENTIALS_REQUIRED: &str = "Please provide an email and password.";
pub const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const SIGN_IN_FAILED: &str = "Unable to sign in right now. Please try again later.";

pub struct LoginScreen {
    gateway: Arc<dyn Gateway>,
    pub email: String,
    pub error: Option<String>,
}

impl LoginScreen {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            email: String::new(),
            error: None,
        }
    }

    /// Authenticates at the backend and, on success, fills the session store
    /// with the identity, roles and permissions the backend returned.
    pub async fn sign_in(&mut self, session: &SessionStore, email: &str, password: &str) -> bool {
        self.email = email.trim().to_string();
        self.error = None;
        if self.email.is_empty() || password.is_empty() {
            self.error = Some(CREDENTIALS_REQUIRED.to_string());
            return false;
        }

        match self.gateway.sign_in(&self.email, password).await {
            Ok(signed_in) => {
                log::info!(
                    "{} signed in with roles {:?}",
                    signed_in.user.email,
                    signed_in.roles
                );
                session.set_user(Some(signed_in.user));
                session.set_roles(signed_in.roles);
                session.set_permissions(signed_in.permissions);
                true
            }
            Err(GatewayError::InvalidCredentials) => {
                log::warn!("Rejected sign-in for {}", self.email);
                self.error = Some(INVALID_CREDENTIALS.to_string());
                false
            }
            Err(err) => {
                log::error!("Error signing in {}: {}", self.email, err);
                self.error = Some(SIGN_IN_FAILED.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryGateway, Operation};

    fn gateway() -> Arc<InMemoryGateway> {
        let gateway = Arc::new(InMemoryGateway::new());
        let perm = gateway.seed_permission("manage_roles", "");
        let role = gateway.seed_role("admin", "");
        gateway.grant(role.id, perm.id);
        let id = gateway.seed_account("ops@example.com", "s3cret", 4).unwrap();
        gateway.assign_role(id, role.id);
        gateway
    }

    #[tokio::test]
    async fn successful_sign_in_fills_the_session() {
        let gateway = gateway();
        let session = SessionStore::new();
        let mut screen = LoginScreen::new(gateway.clone());

        assert!(screen.sign_in(&session, " ops@example.com ", "s3cret").await);

        assert_eq!(session.current_user().unwrap().email, "ops@example.com");
        assert_eq!(session.roles(), vec!["admin"]);
        assert!(session.has_permission("manage_roles"));
        assert!(screen.error.is_none());
    }

    #[tokio::test]
    async fn wrong_password_leaves_session_empty() {
        let gateway = gateway();
        let session = SessionStore::new();
        let mut screen = LoginScreen::new(gateway.clone());

        assert!(!screen.sign_in(&session, "ops@example.com", "wrong").await);

        assert!(!session.is_authenticated());
        assert_eq!(screen.error.as_deref(), Some(INVALID_CREDENTIALS));
        assert_eq!(screen.email, "ops@example.com");
    }

    #[tokio::test]
    async fn blank_fields_skip_the_backend() {
        let gateway = gateway();
        let session = SessionStore::new();
        let mut screen = LoginScreen::new(gateway.clone());

        assert!(!screen.sign_in(&session, "", "s3cret").await);
        assert!(!screen.sign_in(&session, "ops@example.com", "").await);

        assert_eq!(screen.error.as_deref(), Some(CREDENTIALS_REQUIRED));
        assert_eq!(gateway.calls_to(Operation::SignIn), 0);
    }

    #[tokio::test]
    async fn backend_outage_gets_a_generic_message() {
        let gateway = gateway();
        gateway.fail(Operation::SignIn, "connection refused");
        let session = SessionStore::new();
        let mut screen = LoginScreen::new(gateway.clone());

        assert!(!screen.sign_in(&session, "ops@example.com", "s3cret").await);

        assert_eq!(screen.error.as_deref(), Some(SIGN_IN_FAILED));
    }
}
