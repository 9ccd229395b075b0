pub mod api;
pub mod auth;
pub mod roles;
pub mod users;

use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
};
use askama::Template;

use crate::{
    context::AppContext,
    error::AppResult,
    middleware::Operator,
    models::SessionUser,
    screens::DashboardScreen,
};

/// Data for the persistent chrome around every protected page.
pub struct Shell {
    pub email: String,
    pub active: &'static str,
}

impl Shell {
    pub fn new(operator: &SessionUser, active: &'static str) -> Self {
        Self {
            email: operator.email.clone(),
            active,
        }
    }
}

pub(crate) fn render<T: Template>(template: &T) -> AppResult<Response> {
    Ok(Html(template.render()?).into_response())
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate {
    shell: Shell,
    screen: DashboardScreen,
}

pub async fn dashboard(
    operator: Operator,
    State(ctx): State<AppContext>,
) -> AppResult<Response> {
    let mut screen = DashboardScreen::new(ctx.gateway.clone(), &operator.session);
    screen.activate().await;

    render(&DashboardTemplate {
        shell: Shell::new(&operator.user, "dashboard"),
        screen,
    })
}
