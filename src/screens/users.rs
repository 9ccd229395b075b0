use std::sync::Arc;

use crate::{context::AppContext, gateway::Gateway, models::UserWithRoles};

pub const LOAD_FAILED: &str = "Failed to load users. Please try again later.";
pub const EMAIL_REQUIRED: &str = "Please provide an email.";
pub const ADD_FAILED: &str = "Failed to add user. Please try again.";

/// Pinned users first, then every remote user whose email is not pinned.
pub fn merge_pinned_users(
    pinned: &[UserWithRoles],
    remote: Vec<UserWithRoles>,
) -> Vec<UserWithRoles> {
    let mut merged = pinned.to_vec();
    merged.extend(
        remote
            .into_iter()
            .filter(|user| !pinned.iter().any(|p| p.email == user.email)),
    );
    merged
}

pub struct UsersScreen {
    gateway: Arc<dyn Gateway>,
    pinned: Vec<UserWithRoles>,
    default_role: String,
    pub users: Vec<UserWithRoles>,
    pub loading: bool,
    pub load_error: Option<String>,
    pub add_modal_open: bool,
    pub new_email: String,
    pub add_error: Option<String>,
}

impl UsersScreen {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        pinned: Vec<UserWithRoles>,
        default_role: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            pinned,
            default_role: default_role.into(),
            users: Vec::new(),
            loading: true,
            load_error: None,
            add_modal_open: false,
            new_email: String::new(),
            add_error: None,
        }
    }

    pub fn from_context(ctx: &AppContext) -> Self {
        Self::new(
            ctx.gateway.clone(),
            ctx.config.pinned_users.clone(),
            ctx.config.default_user_role.clone(),
        )
    }

    pub async fn activate(&mut self) {
        self.fetch_users().await;
    }

    pub async fn fetch_users(&mut self) {
        match self.gateway.list_users_with_roles().await {
            Ok(remote) => {
                self.users = merge_pinned_users(&self.pinned, remote);
                self.load_error = None;
            }
            Err(err) => {
                log::error!("Error fetching users: {}", err);
                self.load_error = Some(LOAD_FAILED.to_string());
            }
        }
        self.loading = false;
    }

    pub fn open_add_modal(&mut self) {
        self.add_modal_open = true;
    }

    pub fn close_add_modal(&mut self) {
        self.add_modal_open = false;
        self.new_email.clear();
        self.add_error = None;
    }

    /// Inserts the typed email with the default role, then reloads the list.
    /// Returns whether the user was added.
    pub async fn submit_new_user(&mut self) -> bool {
        let email = self.new_email.trim().to_string();
        if email.is_empty() {
            self.add_error = Some(EMAIL_REQUIRED.to_string());
            return false;
        }

        let roles = [self.default_role.clone()];
        if let Err(err) = self.gateway.insert_user_with_roles(&email, &roles).await {
            log::error!("Error adding user {}: {}", email, err);
            self.add_error = Some(ADD_FAILED.to_string());
            return false;
        }

        log::info!("Added user {} with role {}", email, self.default_role);
        self.close_add_modal();
        self.fetch_users().await;
        true
    }
}
