use axum::{
    extract::{Form, State},
    response::{IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;

use crate::{
    context::AppContext,
    error::AppResult,
    middleware::Operator,
    screens::UsersScreen,
};

use super::{render, Shell};

#[derive(Template)]
#[template(path = "users.html")]
struct UsersTemplate {
    shell: Shell,
    screen: UsersScreen,
}

#[derive(Deserialize)]
pub struct AddUserForm {
    email: String,
}

pub async fn users_list(
    operator: Operator,
    State(ctx): State<AppContext>,
) -> AppResult<Response> {
    let mut screen = UsersScreen::from_context(&ctx);
    screen.activate().await;

    render(&UsersTemplate {
        shell: Shell::new(&operator.user, "users"),
        screen,
    })
}

pub async fn user_form(
    operator: Operator,
    State(ctx): State<AppContext>,
) -> AppResult<Response> {
    let mut screen = UsersScreen::from_context(&ctx);
    screen.activate().await;
    screen.open_add_modal();

    render(&UsersTemplate {
        shell: Shell::new(&operator.user, "users"),
        screen,
    })
}

pub async fn create_user(
    operator: Operator,
    State(ctx): State<AppContext>,
    Form(form): Form<AddUserForm>,
) -> AppResult<Response> {
    let mut screen = UsersScreen::from_context(&ctx);
    screen.activate().await;
    screen.open_add_modal();
    screen.new_email = form.email;

    if screen.submit_new_user().await {
        return Ok(Redirect::to("/users").into_response());
    }

    render(&UsersTemplate {
        shell: Shell::new(&operator.user, "users"),
        screen,
    })
}
