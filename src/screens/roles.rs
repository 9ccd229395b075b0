use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    gateway::Gateway,
    models::{NewRole, Permission, Role, RoleWithPermissions},
};

pub const ROLES_LOAD_FAILED: &str = "Failed to load roles. Please try again later.";
pub const PERMISSIONS_LOAD_FAILED: &str = "Failed to load permissions. Please try again later.";
pub const ROLE_NOT_FOUND: &str = "That role no longer exists.";
pub const ROLE_NAME_REQUIRED: &str = "Role name is required";

/// A role as listed in the table.
#[derive(Debug, Clone)]
pub struct RoleRow {
    pub role: Role,
    pub user_count: i64,
}

/// A catalog entry in one of the modals, marked when the role (or draft) has it.
#[derive(Debug, Clone)]
pub struct PermissionOption {
    pub permission: Permission,
    pub checked: bool,
}

pub struct RolesScreen {
    gateway: Arc<dyn Gateway>,
    pub roles: Vec<Role>,
    pub user_counts: HashMap<Uuid, i64>,
    pub permissions: Vec<Permission>,
    pub loading: bool,
    pub load_errors: Vec<String>,
    pub selected_role: Option<RoleWithPermissions>,
    pub detail_open: bool,
    pub add_modal_open: bool,
    pub draft: NewRole,
    pub error: Option<String>,
}

impl RolesScreen {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            roles: Vec::new(),
            user_counts: HashMap::new(),
            permissions: Vec::new(),
            loading: true,
            load_errors: Vec::new(),
            selected_role: None,
            detail_open: false,
            add_modal_open: false,
            draft: NewRole::default(),
            error: None,
        }
    }

    pub async fn activate(&mut self) {
        self.load_errors.clear();
        self.fetch_roles().await;
        self.fetch_permissions().await;
    }

    /// Reloads the role list and then, one role at a time, its user count.
    pub async fn fetch_roles(&mut self) {
        match self.gateway.list_roles().await {
            Ok(roles) => {
                self.roles = roles;

                // One count per role. Fine for a handful of roles; a grouped
                // aggregate on the backend would replace this.
                let mut counts = HashMap::new();
                for role in &self.roles {
                    match self.gateway.count_user_roles(role.id).await {
                        Ok(count) => {
                            counts.insert(role.id, count);
                        }
                        Err(err) => {
                            log::warn!("Error counting users of role {}: {}", role.name, err)
                        }
                    }
                }
                self.user_counts = counts;
            }
            Err(err) => {
                log::error!("Error fetching roles: {}", err);
                self.load_errors.push(ROLES_LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    pub async fn fetch_permissions(&mut self) {
        match self.gateway.list_permissions().await {
            Ok(permissions) => self.permissions = permissions,
            Err(err) => {
                log::error!("Error fetching permissions: {}", err);
                self.load_errors.push(PERMISSIONS_LOAD_FAILED.to_string());
            }
        }
    }

    pub fn user_count(&self, role_id: Uuid) -> i64 {
        self.user_counts.get(&role_id).copied().unwrap_or(0)
    }

    pub fn rows(&self) -> Vec<RoleRow> {
        self.roles
            .iter()
            .map(|role| RoleRow {
                role: role.clone(),
                user_count: self.user_count(role.id),
            })
            .collect()
    }

    /// Loads the permissions of one listed role and opens the detail modal.
    pub async fn select_role(&mut self, role_id: Uuid) -> bool {
        let Some(role) = self.roles.iter().find(|r| r.id == role_id).cloned() else {
            self.load_errors.push(ROLE_NOT_FOUND.to_string());
            return false;
        };

        match self.gateway.role_permissions(role.id).await {
            Ok(permissions) => {
                self.selected_role = Some(RoleWithPermissions { role, permissions });
                self.detail_open = true;
                true
            }
            Err(err) => {
                log::error!("Error fetching permissions of role {}: {}", role.name, err);
                self.load_errors
                    .push(format!("Failed to load permissions for role \"{}\".", role.name));
                false
            }
        }
    }

    pub fn detail_options(&self) -> Vec<PermissionOption> {
        let Some(selected) = &self.selected_role else {
            return Vec::new();
        };
        self.permissions
            .iter()
            .map(|permission| PermissionOption {
                permission: permission.clone(),
                checked: selected.has_permission(permission.id),
            })
            .collect()
    }

    pub fn open_add_modal(&mut self) {
        self.add_modal_open = true;
    }

    pub fn close_add_modal(&mut self) {
        self.add_modal_open = false;
        self.draft = NewRole::default();
        self.error = None;
    }

    /// Flips one permission in the draft. Nothing is sent until submit.
    pub fn toggle_permission(&mut self, permission_id: Uuid) {
        self.draft.toggle_permission(permission_id);
    }

    pub fn draft_options(&self) -> Vec<PermissionOption> {
        self.permissions
            .iter()
            .map(|permission| PermissionOption {
                permission: permission.clone(),
                checked: self.draft.is_selected(permission.id),
            })
            .collect()
    }

    /// Inserts the draft role, then its permission links, then reloads the
    /// list. The two writes are not atomic: if the links fail the role stays
    /// and the operator is told so. Returns whether everything succeeded.
    pub async fn create_role(&mut self) -> bool {
        self.error = None;
        let outcome = self.write_draft().await;

        match outcome {
            Ok(()) => {
                self.fetch_roles().await;
                self.close_add_modal();
                true
            }
            Err(DraftFailure::Invalid(message)) | Err(DraftFailure::Rejected(message)) => {
                self.error = Some(message);
                false
            }
            Err(DraftFailure::Partial(message)) => {
                self.error = Some(message);
                self.fetch_roles().await;
                false
            }
        }
    }

    async fn write_draft(&self) -> Result<(), DraftFailure> {
        if self.draft.trimmed_name().is_empty() {
            return Err(DraftFailure::Invalid(ROLE_NAME_REQUIRED.to_string()));
        }

        let role = self
            .gateway
            .insert_role(self.draft.to_row())
            .await
            .map_err(|err| {
                log::error!("Error creating role {}: {}", self.draft.trimmed_name(), err);
                DraftFailure::Rejected(format!("Failed to create role: {}", err))
            })?;
        log::info!("Created role {} ({})", role.name, role.id);

        let rows = self.draft.association_rows(role.id);
        if !rows.is_empty() {
            self.gateway
                .insert_role_permissions(&rows)
                .await
                .map_err(|err| {
                    log::error!("Error attaching permissions to role {}: {}", role.name, err);
                    DraftFailure::Partial(format!(
                        "Role \"{}\" was created, but its permissions could not be saved: {}",
                        role.name, err
                    ))
                })?;
        }

        Ok(())
    }
}

enum DraftFailure {
    Invalid(String),
    Rejected(String),
    // the role row exists, its permission links do not
    Partial(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{InMemoryGateway, Operation};

    struct Fixture {
        gateway: Arc<InMemoryGateway>,
        admin: Role,
        p1: Permission,
        p2: Permission,
    }

    fn fixture() -> Fixture {
        let gateway = Arc::new(InMemoryGateway::new());
        let p1 = gateway.seed_permission("edit_role", "Edit roles");
        let p2 = gateway.seed_permission("delete_user", "Delete users");
        let admin = gateway.seed_role("admin", "Everything");
        gateway.seed_role("viewer", "Read only");
        gateway.grant(admin.id, p1.id);
        let id = gateway.seed_account("ops@example.com", "pw", 4).unwrap();
        gateway.assign_role(id, admin.id);
        Fixture {
            gateway,
            admin,
            p1,
            p2,
        }
    }

    #[tokio::test]
    async fn activate_loads_roles_counts_and_catalog() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());

        screen.activate().await;

        assert!(!screen.loading);
        let names: Vec<&str> = screen.roles.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["admin", "viewer"]);
        assert_eq!(screen.user_count(f.admin.id), 1);
        assert_eq!(screen.rows()[1].user_count, 0);
        assert_eq!(screen.permissions.len(), 2);
        assert_eq!(f.gateway.calls_to(Operation::CountUserRoles), 2);
    }

    #[tokio::test]
    async fn failed_counts_fall_back_to_zero() {
        let f = fixture();
        f.gateway.fail(Operation::CountUserRoles, "timeout");
        let mut screen = RolesScreen::new(f.gateway.clone());

        screen.activate().await;

        assert_eq!(screen.roles.len(), 2);
        assert_eq!(screen.user_count(f.admin.id), 0);
        assert!(screen.load_errors.is_empty());
    }

    #[tokio::test]
    async fn failed_role_fetch_is_reported() {
        let f = fixture();
        f.gateway.fail(Operation::ListRoles, "timeout");
        let mut screen = RolesScreen::new(f.gateway.clone());

        screen.activate().await;

        assert!(!screen.loading);
        assert_eq!(screen.load_errors, vec![ROLES_LOAD_FAILED.to_string()]);
        assert_eq!(screen.permissions.len(), 2);
    }

    #[tokio::test]
    async fn selecting_a_role_materializes_its_permissions() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;

        assert!(screen.select_role(f.admin.id).await);

        assert!(screen.detail_open);
        let selected = screen.selected_role.as_ref().unwrap();
        assert_eq!(selected.role.name, "admin");
        assert_eq!(selected.permissions, vec![f.p1.clone()]);
        let checked: Vec<(String, bool)> = screen
            .detail_options()
            .into_iter()
            .map(|o| (o.permission.name, o.checked))
            .collect();
        assert_eq!(
            checked,
            vec![("delete_user".to_string(), false), ("edit_role".to_string(), true)]
        );
    }

    #[tokio::test]
    async fn selecting_an_unknown_role_does_not_open_detail() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;

        assert!(!screen.select_role(Uuid::new_v4()).await);
        assert!(!screen.detail_open);
        assert_eq!(f.gateway.calls_to(Operation::RolePermissions), 0);
    }

    #[tokio::test]
    async fn blank_name_never_writes() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        screen.open_add_modal();
        screen.draft = NewRole::new("   ", "whatever");
        screen.toggle_permission(f.p1.id);

        assert!(!screen.create_role().await);

        assert_eq!(screen.error.as_deref(), Some(ROLE_NAME_REQUIRED));
        assert!(screen.add_modal_open);
        assert_eq!(f.gateway.calls_to(Operation::InsertRole), 0);
        assert_eq!(f.gateway.calls_to(Operation::InsertRolePermissions), 0);
    }

    #[tokio::test]
    async fn create_inserts_role_then_links_then_refetches() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        f.gateway.clear_journal();
        screen.open_add_modal();
        screen.draft = NewRole::new("Editor", " Edits content ");
        screen.toggle_permission(f.p1.id);
        screen.toggle_permission(f.p2.id);

        assert!(screen.create_role().await);

        let journal = f.gateway.journal();
        assert_eq!(
            &journal[..3],
            &[
                Operation::InsertRole,
                Operation::InsertRolePermissions,
                Operation::ListRoles
            ]
        );
        assert_eq!(f.gateway.calls_to(Operation::InsertRole), 1);
        assert_eq!(f.gateway.calls_to(Operation::InsertRolePermissions), 1);

        let editor = f.gateway.role_named("Editor").unwrap();
        assert_eq!(editor.description, "Edits content");
        assert_eq!(f.gateway.permission_ids_of(editor.id), vec![f.p1.id, f.p2.id]);
        assert!(screen.roles.iter().any(|r| r.name == "Editor"));
        assert!(!screen.add_modal_open);
        assert_eq!(screen.draft, NewRole::default());
    }

    #[tokio::test]
    async fn create_without_permissions_skips_link_insert() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        screen.open_add_modal();
        screen.draft = NewRole::new("Auditor", "");

        assert!(screen.create_role().await);

        assert_eq!(f.gateway.calls_to(Operation::InsertRole), 1);
        assert_eq!(f.gateway.calls_to(Operation::InsertRolePermissions), 0);
    }

    #[tokio::test]
    async fn failed_link_insert_leaves_role_and_reports() {
        let f = fixture();
        f.gateway
            .fail(Operation::InsertRolePermissions, "permission denied for table role_permissions");
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        screen.open_add_modal();
        screen.draft = NewRole::new("Editor", "");
        screen.toggle_permission(f.p1.id);
        screen.toggle_permission(f.p2.id);

        assert!(!screen.create_role().await);

        let editor = f.gateway.role_named("Editor").unwrap();
        assert!(f.gateway.permission_ids_of(editor.id).is_empty());
        let error = screen.error.as_deref().unwrap();
        assert!(error.contains("was created"));
        assert!(error.contains("permission denied"));
        assert!(screen.add_modal_open);
        assert!(screen.roles.iter().any(|r| r.name == "Editor"));
    }

    #[tokio::test]
    async fn rejected_role_insert_keeps_modal_open() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        screen.open_add_modal();
        screen.draft = NewRole::new("admin", "duplicate");

        assert!(!screen.create_role().await);

        assert!(screen.error.as_deref().unwrap().contains("roles_name_key"));
        assert!(screen.add_modal_open);
        assert_eq!(screen.draft.name, "admin");
        assert_eq!(f.gateway.calls_to(Operation::InsertRolePermissions), 0);
    }

    #[tokio::test]
    async fn closing_the_add_modal_discards_the_draft() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.open_add_modal();
        screen.draft = NewRole::new("Editor", "x");
        screen.toggle_permission(f.p1.id);
        screen.error = Some("stale".to_string());

        screen.close_add_modal();

        assert!(!screen.add_modal_open);
        assert_eq!(screen.draft, NewRole::default());
        assert!(screen.error.is_none());
    }

    #[tokio::test]
    async fn draft_options_follow_toggles() {
        let f = fixture();
        let mut screen = RolesScreen::new(f.gateway.clone());
        screen.activate().await;
        screen.toggle_permission(f.p2.id);

        let checked: Vec<bool> = screen.draft_options().iter().map(|o| o.checked).collect();
        // catalog is ordered by name: delete_user, edit_role
        assert_eq!(checked, vec![true, false]);
    }
}
