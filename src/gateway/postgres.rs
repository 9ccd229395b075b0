use async_trait::async_trait;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    database::Database,
    models::{NewRoleRow, Permission, Role, RolePermissionRow, SessionUser, SignedIn, UserWithRoles},
};

use super::{Gateway, GatewayError, GatewayResult, Table};

const ROLE_COLUMNS: &str = "id, name, COALESCE(description, '') AS description, created_at";

/// Gateway backed by the hosted backend's Postgres database.
#[derive(Clone)]
pub struct PgGateway {
    db: Database,
}

impl PgGateway {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[derive(FromRow)]
struct AuthAccount {
    id: Uuid,
    email: String,
    encrypted_password: Option<String>,
}

#[async_trait]
impl Gateway for PgGateway {
    async fn list_roles(&self) -> GatewayResult<Vec<Role>> {
        let roles = sqlx::query_as::<_, Role>(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY name"
        ))
        .fetch_all(&self.db)
        .await?;

        Ok(roles)
    }

    async fn insert_role(&self, row: NewRoleRow) -> GatewayResult<Role> {
        let role = sqlx::query_as::<_, Role>(&format!(
            "INSERT INTO roles (name, description) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}"
        ))
        .bind(&row.name)
        .bind(&row.description)
        .fetch_one(&self.db)
        .await?;

        Ok(role)
    }

    async fn list_permissions(&self) -> GatewayResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            "SELECT id, name, COALESCE(description, '') AS description FROM permissions ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn role_permissions(&self, role_id: Uuid) -> GatewayResult<Vec<Permission>> {
        let permissions = sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.id, p.name, COALESCE(p.description, '') AS description
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.db)
        .await?;

        Ok(permissions)
    }

    async fn insert_role_permissions(&self, rows: &[RolePermissionRow]) -> GatewayResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut builder =
            QueryBuilder::<Postgres>::new("INSERT INTO role_permissions (role_id, permission_id) ");
        builder.push_values(rows, |mut values, row| {
            values.push_bind(row.role_id).push_bind(row.permission_id);
        });
        builder.build().execute(&self.db).await?;

        Ok(())
    }

    async fn count_user_roles(&self, role_id: Uuid) -> GatewayResult<i64> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_roles WHERE role_id = $1")
                .bind(role_id)
                .fetch_one(&self.db)
                .await?;

        Ok(count)
    }

    async fn list_users_with_roles(&self) -> GatewayResult<Vec<UserWithRoles>> {
        let users = sqlx::query_as::<_, UserWithRoles>(
            "SELECT id, email, COALESCE(roles, ARRAY[]::text[]) AS roles FROM users_with_roles",
        )
        .fetch_all(&self.db)
        .await?;

        Ok(users)
    }

    async fn insert_user_with_roles(&self, email: &str, roles: &[String]) -> GatewayResult<()> {
        sqlx::query("INSERT INTO users_with_roles (email, roles) VALUES ($1, $2)")
            .bind(email)
            .bind(roles.to_vec())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn count(&self, table: Table) -> GatewayResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {}", table.as_str()))
            .fetch_one(&self.db)
            .await?;

        Ok(count)
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignedIn> {
        let account = sqlx::query_as::<_, AuthAccount>(
            "SELECT id, email, encrypted_password FROM auth.users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(GatewayError::InvalidCredentials)?;

        let hash = account
            .encrypted_password
            .ok_or(GatewayError::InvalidCredentials)?;
        if !bcrypt::verify(password, &hash)? {
            return Err(GatewayError::InvalidCredentials);
        }

        let roles = sqlx::query_scalar::<_, String>(
            r#"
            SELECT r.name FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(account.id)
        .fetch_all(&self.db)
        .await?;

        let permissions = sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT p.name FROM permissions p
            JOIN role_permissions rp ON rp.permission_id = p.id
            JOIN user_roles ur ON ur.role_id = rp.role_id
            WHERE ur.user_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(account.id)
        .fetch_all(&self.db)
        .await?;

        Ok(SignedIn {
            user: SessionUser {
                id: account.id,
                email: account.email,
            },
            roles,
            permissions,
        })
    }

    async fn sign_out(&self, user_id: Uuid) -> GatewayResult<()> {
        // refresh_tokens.user_id is varchar in the auth schema
        sqlx::query(
            "UPDATE auth.refresh_tokens SET revoked = true, updated_at = NOW() WHERE user_id = $1 AND revoked = false",
        )
        .bind(user_id.to_string())
        .execute(&self.db)
        .await?;

        Ok(())
    }
}
