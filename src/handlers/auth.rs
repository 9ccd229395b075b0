use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use askama::Template;
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    context::AppContext,
    error::AppResult,
    middleware::{browser_session, end_browser_session, safe_next, session_cookie},
    screens::LoginScreen,
    session::SessionStore,
};

use super::render;

#[derive(Template)]
#[template(path = "login.html")]
struct LoginTemplate {
    email: String,
    error: Option<String>,
    next: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
    next: Option<String>,
}

pub async fn login_page(
    State(ctx): State<AppContext>,
    cookies: Cookies,
    Query(query): Query<LoginQuery>,
) -> AppResult<Response> {
    let next = safe_next(query.next.as_deref()).to_string();
    if browser_session(&ctx, &cookies).is_some() {
        return Ok(Redirect::to(&next).into_response());
    }

    render(&LoginTemplate {
        email: String::new(),
        error: None,
        next,
    })
}

pub async fn login(
    State(ctx): State<AppContext>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let next = safe_next(form.next.as_deref()).to_string();
    let mut screen = LoginScreen::new(ctx.gateway.clone());
    let session = SessionStore::new();

    if screen.sign_in(&session, &form.email, &form.password).await {
        // a browser signing in again starts over with a fresh token
        end_browser_session(&ctx, &cookies);
        cookies.add(session_cookie(ctx.sessions.insert(session)));
        return Ok(Redirect::to(&next).into_response());
    }

    let page = render(&LoginTemplate {
        email: screen.email,
        error: screen.error,
        next,
    })?;
    Ok((StatusCode::UNAUTHORIZED, page).into_response())
}

/// Ends only the requesting browser's session. Without a known session
/// cookie there is nothing to end.
pub async fn logout(State(ctx): State<AppContext>, cookies: Cookies) -> impl IntoResponse {
    if let Some(session) = end_browser_session(&ctx, &cookies) {
        if let Err(err) = session.logout(ctx.gateway.as_ref()).await {
            log::warn!("Remote sign-out failed, local session cleared anyway: {}", err);
        }
    }
    Redirect::to("/login")
}
