use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of the backend's `users_with_roles` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserWithRoles {
    pub id: Uuid,
    pub email: String,
    pub roles: Vec<String>,
}

impl UserWithRoles {
    pub fn new(email: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            roles,
        }
    }
}

/// Identity of the signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
}

/// What the backend hands back after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIn {
    pub user: SessionUser,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}
