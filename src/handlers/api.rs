use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{context::AppContext, middleware::Operator, models::Permission};

#[derive(Serialize)]
pub struct PermissionResponse {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

impl From<Permission> for PermissionResponse {
    fn from(permission: Permission) -> Self {
        Self {
            id: permission.id,
            name: permission.name,
            description: permission.description,
        }
    }
}

pub async fn current_session(operator: Operator) -> Json<Value> {
    Json(json!({
        "user": operator.user,
        "roles": operator.session.roles(),
        "permissions": operator.session.permissions(),
    }))
}

pub async fn get_role_permissions(
    _operator: Operator,
    State(ctx): State<AppContext>,
    Path(role_id): Path<Uuid>,
) -> Result<Json<Vec<PermissionResponse>>, (StatusCode, Json<Value>)> {
    let permissions = ctx
        .gateway
        .role_permissions(role_id)
        .await
        .map_err(|err| {
            log::error!("Error fetching permissions of role {}: {}", role_id, err);
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.to_string() })))
        })?
        .into_iter()
        .map(PermissionResponse::from)
        .collect();

    Ok(Json(permissions))
}
