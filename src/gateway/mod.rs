//! Boundary to the hosted backend that owns every table this console shows.
//!
//! Screens only ever talk to [`Gateway`]. [`PgGateway`] runs the queries
//! against the backend's Postgres; [`InMemoryGateway`] keeps the same tables
//! in process for demo mode and tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    NewRoleRow, Permission, Role, RolePermissionRow, SignedIn, UserWithRoles,
};

pub use memory::{InMemoryGateway, Operation};
pub use postgres::PgGateway;

/// Failure reported by the backend. `Display` is the human-readable message.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Remote(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Tables and views the dashboard counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Roles,
    Permissions,
    UsersWithRoles,
}

impl Table {
    pub fn as_str(self) -> &'static str {
        match self {
            Table::Roles => "roles",
            Table::Permissions => "permissions",
            Table::UsersWithRoles => "users_with_roles",
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    /// All roles ordered by name.
    async fn list_roles(&self) -> GatewayResult<Vec<Role>>;

    /// Inserts one role and returns it with its generated id.
    async fn insert_role(&self, row: NewRoleRow) -> GatewayResult<Role>;

    /// The full permission catalog ordered by name.
    async fn list_permissions(&self) -> GatewayResult<Vec<Permission>>;

    /// Permissions attached to `role_id`, joined with their details.
    async fn role_permissions(&self, role_id: Uuid) -> GatewayResult<Vec<Permission>>;

    async fn insert_role_permissions(&self, rows: &[RolePermissionRow]) -> GatewayResult<()>;

    /// Number of `user_roles` rows pointing at `role_id`.
    async fn count_user_roles(&self, role_id: Uuid) -> GatewayResult<i64>;

    async fn list_users_with_roles(&self) -> GatewayResult<Vec<UserWithRoles>>;

    async fn insert_user_with_roles(&self, email: &str, roles: &[String]) -> GatewayResult<()>;

    async fn count(&self, table: Table) -> GatewayResult<i64>;

    /// Checks credentials and resolves the caller's role and permission names.
    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignedIn>;

    async fn sign_out(&self, user_id: Uuid) -> GatewayResult<()>;
}
