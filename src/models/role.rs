use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::rbac::{Permission, RolePermissionRow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Payload of a `roles` insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoleRow {
    pub name: String,
    pub description: String,
}

/// A role together with the permissions attached to it at the time it was
/// inspected. Never refreshed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleWithPermissions {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

impl RoleWithPermissions {
    pub fn has_permission(&self, permission_id: Uuid) -> bool {
        self.permissions.iter().any(|p| p.id == permission_id)
    }
}

/// Draft edited in the "create role" modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    permission_ids: Vec<Uuid>,
}

impl NewRole {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            permission_ids: Vec::new(),
        }
    }

    /// Rebuilds a draft from submitted form state, dropping repeated ids.
    pub fn with_permissions(mut self, ids: impl IntoIterator<Item = Uuid>) -> Self {
        for id in ids {
            if !self.permission_ids.contains(&id) {
                self.permission_ids.push(id);
            }
        }
        self
    }

    /// Adds the permission when absent, removes it when present.
    pub fn toggle_permission(&mut self, permission_id: Uuid) {
        match self.permission_ids.iter().position(|id| *id == permission_id) {
            Some(index) => {
                self.permission_ids.remove(index);
            }
            None => self.permission_ids.push(permission_id),
        }
    }

    pub fn is_selected(&self, permission_id: Uuid) -> bool {
        self.permission_ids.contains(&permission_id)
    }

    pub fn trimmed_name(&self) -> &str {
        self.name.trim()
    }

    pub fn to_row(&self) -> NewRoleRow {
        NewRoleRow {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
        }
    }

    pub fn association_rows(&self, role_id: Uuid) -> Vec<RolePermissionRow> {
        self.permission_ids
            .iter()
            .map(|permission_id| RolePermissionRow {
                role_id,
                permission_id: *permission_id,
            })
            .collect()
    }
}
