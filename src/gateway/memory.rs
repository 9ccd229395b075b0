use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    NewRoleRow, Permission, Role, RolePermissionRow, SessionUser, SignedIn, UserWithRoles,
};

use super::{Gateway, GatewayError, GatewayResult, Table};

/// Gateway calls, as recorded in the journal and targeted by failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListRoles,
    InsertRole,
    ListPermissions,
    RolePermissions,
    InsertRolePermissions,
    CountUserRoles,
    ListUsers,
    InsertUser,
    Count,
    SignIn,
    SignOut,
}

struct Account {
    id: Uuid,
    email: String,
    password_hash: String,
}

#[derive(Default)]
struct Tables {
    roles: Vec<Role>,
    permissions: Vec<Permission>,
    role_permissions: Vec<RolePermissionRow>,
    // (user_id, role_id)
    user_roles: Vec<(Uuid, Uuid)>,
    users: Vec<UserWithRoles>,
    accounts: Vec<Account>,
    revoked: Vec<Uuid>,
}

impl Tables {
    fn role_by_name(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }
}

/// In-process stand-in for the hosted backend.
#[derive(Default)]
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    journal: Mutex<Vec<Operation>>,
    failures: Mutex<HashMap<Operation, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A small catalog with an `admin` and a `user` role, plus one admin
    /// account that can sign in.
    pub fn demo(admin_email: &str, admin_password: &str) -> GatewayResult<Self> {
        let gateway = Self::new();

        let manage_roles = gateway.seed_permission("manage_roles", "Create and edit roles");
        let manage_users = gateway.seed_permission("manage_users", "Invite and edit users");
        let view_dashboard =
            gateway.seed_permission("view_dashboard", "See dashboard statistics");

        let admin = gateway.seed_role("admin", "Full access to the console");
        let user = gateway.seed_role("user", "Default role for new accounts");
        for permission in [&manage_roles, &manage_users, &view_dashboard] {
            gateway.grant(admin.id, permission.id);
        }
        gateway.grant(user.id, view_dashboard.id);

        let admin_id = gateway.seed_account(admin_email, admin_password, bcrypt::DEFAULT_COST)?;
        gateway.assign_role(admin_id, admin.id);

        Ok(gateway)
    }

    pub fn seed_permission(&self, name: &str, description: &str) -> Permission {
        let permission = Permission {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
        };
        lock(&self.tables).permissions.push(permission.clone());
        permission
    }

    pub fn seed_role(&self, name: &str, description: &str) -> Role {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            created_at: Utc::now(),
        };
        lock(&self.tables).roles.push(role.clone());
        role
    }

    pub fn grant(&self, role_id: Uuid, permission_id: Uuid) {
        lock(&self.tables).role_permissions.push(RolePermissionRow {
            role_id,
            permission_id,
        });
    }

    /// Creates a sign-in account and its (role-less) row in the users view.
    pub fn seed_account(&self, email: &str, password: &str, cost: u32) -> GatewayResult<Uuid> {
        let password_hash = bcrypt::hash(password, cost)?;
        let id = Uuid::new_v4();

        let mut tables = lock(&self.tables);
        tables.accounts.push(Account {
            id,
            email: email.to_string(),
            password_hash,
        });
        tables.users.push(UserWithRoles {
            id,
            email: email.to_string(),
            roles: Vec::new(),
        });

        Ok(id)
    }

    pub fn assign_role(&self, user_id: Uuid, role_id: Uuid) {
        let mut tables = lock(&self.tables);
        tables.user_roles.push((user_id, role_id));

        let role_name = tables
            .roles
            .iter()
            .find(|r| r.id == role_id)
            .map(|r| r.name.clone());
        let user = tables.users.iter_mut().find(|u| u.id == user_id);
        if let (Some(name), Some(user)) = (role_name, user) {
            user.roles.push(name);
        }
    }

    fn enter(&self, operation: Operation) -> GatewayResult<()> {
        log::debug!("in-memory gateway: {operation:?}");
        lock(&self.journal).push(operation);

        match lock(&self.failures).get(&operation) {
            Some(message) => Err(GatewayError::Remote(message.clone())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
impl InMemoryGateway {
    pub fn seed_user(&self, user: UserWithRoles) {
        lock(&self.tables).users.push(user);
    }

    /// Makes every later call to `operation` fail with `message`.
    pub fn fail(&self, operation: Operation, message: &str) {
        lock(&self.failures).insert(operation, message.to_string());
    }

    pub fn recover(&self, operation: Operation) {
        lock(&self.failures).remove(&operation);
    }

    pub fn journal(&self) -> Vec<Operation> {
        lock(&self.journal).clone()
    }

    pub fn calls_to(&self, operation: Operation) -> usize {
        lock(&self.journal)
            .iter()
            .filter(|recorded| **recorded == operation)
            .count()
    }

    pub fn clear_journal(&self) {
        lock(&self.journal).clear();
    }

    pub fn role_named(&self, name: &str) -> Option<Role> {
        lock(&self.tables).role_by_name(name).cloned()
    }

    pub fn permission_ids_of(&self, role_id: Uuid) -> Vec<Uuid> {
        lock(&self.tables)
            .role_permissions
            .iter()
            .filter(|row| row.role_id == role_id)
            .map(|row| row.permission_id)
            .collect()
    }

    pub fn revoked_sessions(&self) -> Vec<Uuid> {
        lock(&self.tables).revoked.clone()
    }
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn list_roles(&self) -> GatewayResult<Vec<Role>> {
        self.enter(Operation::ListRoles)?;
        let mut roles = lock(&self.tables).roles.clone();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn insert_role(&self, row: NewRoleRow) -> GatewayResult<Role> {
        self.enter(Operation::InsertRole)?;
        let mut tables = lock(&self.tables);
        if tables.role_by_name(&row.name).is_some() {
            return Err(GatewayError::Remote(
                "duplicate key value violates unique constraint \"roles_name_key\"".to_string(),
            ));
        }

        let role = Role {
            id: Uuid::new_v4(),
            name: row.name,
            description: row.description,
            created_at: Utc::now(),
        };
        tables.roles.push(role.clone());
        Ok(role)
    }

    async fn list_permissions(&self) -> GatewayResult<Vec<Permission>> {
        self.enter(Operation::ListPermissions)?;
        let mut permissions = lock(&self.tables).permissions.clone();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn role_permissions(&self, role_id: Uuid) -> GatewayResult<Vec<Permission>> {
        self.enter(Operation::RolePermissions)?;
        let tables = lock(&self.tables);
        let mut permissions: Vec<Permission> = tables
            .role_permissions
            .iter()
            .filter(|row| row.role_id == role_id)
            .filter_map(|row| tables.permissions.iter().find(|p| p.id == row.permission_id))
            .cloned()
            .collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }

    async fn insert_role_permissions(&self, rows: &[RolePermissionRow]) -> GatewayResult<()> {
        self.enter(Operation::InsertRolePermissions)?;
        let mut tables = lock(&self.tables);

        // all-or-nothing, like a single multi-row INSERT
        for row in rows {
            if !tables.roles.iter().any(|r| r.id == row.role_id) {
                return Err(GatewayError::Remote(
                    "insert or update on table \"role_permissions\" violates foreign key constraint \"role_permissions_role_id_fkey\"".to_string(),
                ));
            }
            if !tables.permissions.iter().any(|p| p.id == row.permission_id) {
                return Err(GatewayError::Remote(
                    "insert or update on table \"role_permissions\" violates foreign key constraint \"role_permissions_permission_id_fkey\"".to_string(),
                ));
            }
        }
        tables.role_permissions.extend_from_slice(rows);
        Ok(())
    }

    async fn count_user_roles(&self, role_id: Uuid) -> GatewayResult<i64> {
        self.enter(Operation::CountUserRoles)?;
        let count = lock(&self.tables)
            .user_roles
            .iter()
            .filter(|(_, assigned)| *assigned == role_id)
            .count();
        Ok(count as i64)
    }

    async fn list_users_with_roles(&self) -> GatewayResult<Vec<UserWithRoles>> {
        self.enter(Operation::ListUsers)?;
        Ok(lock(&self.tables).users.clone())
    }

    async fn insert_user_with_roles(&self, email: &str, roles: &[String]) -> GatewayResult<()> {
        self.enter(Operation::InsertUser)?;
        let mut tables = lock(&self.tables);
        if tables.users.iter().any(|u| u.email == email) {
            return Err(GatewayError::Remote(
                "duplicate key value violates unique constraint \"users_email_key\"".to_string(),
            ));
        }

        let user = UserWithRoles::new(email, roles.to_vec());
        let role_ids: Vec<Uuid> = roles
            .iter()
            .filter_map(|name| tables.role_by_name(name).map(|r| r.id))
            .collect();
        for role_id in role_ids {
            tables.user_roles.push((user.id, role_id));
        }
        tables.users.push(user);
        Ok(())
    }

    async fn count(&self, table: Table) -> GatewayResult<i64> {
        self.enter(Operation::Count)?;
        let tables = lock(&self.tables);
        let count = match table {
            Table::Roles => tables.roles.len(),
            Table::Permissions => tables.permissions.len(),
            Table::UsersWithRoles => tables.users.len(),
        };
        Ok(count as i64)
    }

    async fn sign_in(&self, email: &str, password: &str) -> GatewayResult<SignedIn> {
        self.enter(Operation::SignIn)?;
        let tables = lock(&self.tables);
        let account = tables
            .accounts
            .iter()
            .find(|a| a.email == email)
            .ok_or(GatewayError::InvalidCredentials)?;
        if !bcrypt::verify(password, &account.password_hash)? {
            return Err(GatewayError::InvalidCredentials);
        }

        let role_ids: Vec<Uuid> = tables
            .user_roles
            .iter()
            .filter(|(user_id, _)| *user_id == account.id)
            .map(|(_, role_id)| *role_id)
            .collect();
        let roles: BTreeSet<String> = tables
            .roles
            .iter()
            .filter(|r| role_ids.contains(&r.id))
            .map(|r| r.name.clone())
            .collect();
        let permissions: BTreeSet<String> = tables
            .role_permissions
            .iter()
            .filter(|row| role_ids.contains(&row.role_id))
            .filter_map(|row| tables.permissions.iter().find(|p| p.id == row.permission_id))
            .map(|p| p.name.clone())
            .collect();

        Ok(SignedIn {
            user: SessionUser {
                id: account.id,
                email: account.email.clone(),
            },
            roles: roles.into_iter().collect(),
            permissions: permissions.into_iter().collect(),
        })
    }

    async fn sign_out(&self, user_id: Uuid) -> GatewayResult<()> {
        self.enter(Operation::SignOut)?;
        lock(&self.tables).revoked.push(user_id);
        Ok(())
    }
}
