use std::sync::Arc;

use crate::{
    gateway::{Gateway, Table},
    session::SessionStore,
};

pub const MANAGE_USERS: &str = "manage_users";
pub const MANAGE_ROLES: &str = "manage_roles";

#[derive(Debug, Clone)]
pub struct Counter {
    pub label: &'static str,
    /// `None` when the backend could not count.
    pub value: Option<i64>,
}

const COUNTED: [(&str, Table); 3] = [
    ("Total users", Table::UsersWithRoles),
    ("Roles", Table::Roles),
    ("Permissions", Table::Permissions),
];

pub struct DashboardScreen {
    gateway: Arc<dyn Gateway>,
    pub email: String,
    pub counters: Vec<Counter>,
    pub can_manage_users: bool,
    pub can_manage_roles: bool,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
    pub recent_activity: Vec<String>,
}

impl DashboardScreen {
    pub fn new(gateway: Arc<dyn Gateway>, session: &SessionStore) -> Self {
        Self {
            gateway,
            email: session.current_user().map(|u| u.email).unwrap_or_default(),
            counters: Vec::new(),
            can_manage_users: session.has_permission(MANAGE_USERS),
            can_manage_roles: session.has_permission(MANAGE_ROLES),
            roles: session.roles(),
            permissions: session.permissions(),
            recent_activity: Vec::new(),
        }
    }

    pub async fn activate(&mut self) {
        let mut counters = Vec::with_capacity(COUNTED.len());
        for (label, table) in COUNTED {
            let value = match self.gateway.count(table).await {
                Ok(count) => Some(count),
                Err(err) => {
                    log::warn!("Error counting {}: {}", table.as_str(), err);
                    None
                }
            };
            counters.push(Counter { label, value });
        }
        self.counters = counters;
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::gateway::{InMemoryGateway, Operation};
    use crate::models::{SessionUser, UserWithRoles};

    fn session_with(permissions: &[&str]) -> SessionStore {
        let session = SessionStore::new();
        session.set_user(Some(SessionUser {
            id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
        }));
        session.set_permissions(permissions.iter().copied());
        session
    }

    #[tokio::test]
    async fn counts_live_rows() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.seed_role("admin", "");
        gateway.seed_permission("edit_role", "");
        gateway.seed_permission("delete_user", "");
        gateway.seed_user(UserWithRoles::new("a@x.com", Vec::new()));
        let session = session_with(&[]);
        let mut screen = DashboardScreen::new(gateway.clone(), &session);

        screen.activate().await;

        assert_eq!(screen.email, "ops@example.com");
        let values: Vec<Option<i64>> = screen.counters.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![Some(1), Some(1), Some(2)]);
        assert!(screen.recent_activity.is_empty());
    }

    #[tokio::test]
    async fn failed_counts_are_unavailable() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.fail(Operation::Count, "timeout");
        let session = session_with(&[]);
        let mut screen = DashboardScreen::new(gateway.clone(), &session);

        screen.activate().await;

        assert_eq!(screen.counters.len(), 3);
        assert!(screen.counters.iter().all(|c| c.value.is_none()));
    }

    #[test]
    fn quick_links_follow_permissions() {
        let gateway = Arc::new(InMemoryGateway::new());
        let screen = DashboardScreen::new(gateway.clone(), &session_with(&[MANAGE_ROLES]));
        assert!(screen.can_manage_roles);
        assert!(!screen.can_manage_users);
        assert_eq!(screen.permissions, vec![MANAGE_ROLES]);
        assert!(screen.roles.is_empty());
    }
}
