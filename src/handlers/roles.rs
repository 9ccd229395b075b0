use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::Form;
use askama::Template;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    context::AppContext,
    error::AppResult,
    middleware::Operator,
    models::NewRole,
    screens::{
        roles::{PermissionOption, RoleRow},
        RolesScreen,
    },
};

use super::{render, Shell};

#[derive(Template)]
#[template(path = "roles.html")]
struct RolesTemplate {
    shell: Shell,
    rows: Vec<RoleRow>,
    detail_options: Vec<PermissionOption>,
    draft_options: Vec<PermissionOption>,
    screen: RolesScreen,
}

impl RolesTemplate {
    fn new(shell: Shell, screen: RolesScreen) -> Self {
        Self {
            shell,
            rows: screen.rows(),
            detail_options: screen.detail_options(),
            draft_options: screen.draft_options(),
            screen,
        }
    }
}

/// The "create role" modal posts its whole draft back on every click: either
/// to flip one permission (`toggle`) or to submit.
#[derive(Deserialize)]
pub struct RoleDraftForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    permission_ids: Vec<Uuid>,
    toggle: Option<Uuid>,
}

pub async fn roles_list(
    operator: Operator,
    State(ctx): State<AppContext>,
) -> AppResult<Response> {
    let mut screen = RolesScreen::new(ctx.gateway.clone());
    screen.activate().await;

    render(&RolesTemplate::new(Shell::new(&operator.user, "roles"), screen))
}

pub async fn role_detail(
    operator: Operator,
    State(ctx): State<AppContext>,
    Path(role_id): Path<Uuid>,
) -> AppResult<Response> {
    let mut screen = RolesScreen::new(ctx.gateway.clone());
    screen.activate().await;
    screen.select_role(role_id).await;

    render(&RolesTemplate::new(Shell::new(&operator.user, "roles"), screen))
}

pub async fn role_form(
    operator: Operator,
    State(ctx): State<AppContext>,
) -> AppResult<Response> {
    let mut screen = RolesScreen::new(ctx.gateway.clone());
    screen.activate().await;
    screen.open_add_modal();

    render(&RolesTemplate::new(Shell::new(&operator.user, "roles"), screen))
}

pub async fn update_draft(
    operator: Operator,
    State(ctx): State<AppContext>,
    Form(form): Form<RoleDraftForm>,
) -> AppResult<Response> {
    let mut screen = RolesScreen::new(ctx.gateway.clone());
    screen.activate().await;
    screen.open_add_modal();
    screen.draft = NewRole::new(form.name, form.description).with_permissions(form.permission_ids);

    match form.toggle {
        Some(permission_id) => screen.toggle_permission(permission_id),
        None => {
            if screen.create_role().await {
                return Ok(Redirect::to("/roles").into_response());
            }
        }
    }

    render(&RolesTemplate::new(Shell::new(&operator.user, "roles"), screen))
}
