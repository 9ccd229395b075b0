use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use time::Duration;
use tower_cookies::{cookie::SameSite, Cookie, Cookies};

use crate::{
    context::AppContext,
    models::SessionUser,
    session::{SessionStore, SESSION_TTL},
};

pub const LOGIN_PATH: &str = "/login";
pub const SESSION_COOKIE: &str = "rbac_session";

/// Whether protected screens may be shown. Decided only by the presence of a
/// signed-in user in the session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    Unauthenticated,
    Authenticated,
}

impl GuardState {
    pub fn of(session: Option<&SessionStore>) -> Self {
        match session {
            Some(session) if session.is_authenticated() => GuardState::Authenticated,
            _ => GuardState::Unauthenticated,
        }
    }
}

/// The signed-in session of the browser that sent `cookies`, if any.
pub fn browser_session(ctx: &AppContext, cookies: &Cookies) -> Option<SessionStore> {
    let token = cookies.get(SESSION_COOKIE)?;
    ctx.sessions.get(token.value())
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(Duration::seconds(SESSION_TTL.as_secs() as i64))
        .build()
}

/// Forgets the browser's session token, returning the session it pointed at.
pub fn end_browser_session(ctx: &AppContext, cookies: &Cookies) -> Option<SessionStore> {
    let token = cookies.get(SESSION_COOKIE)?.value().to_string();
    let mut expired = Cookie::from(SESSION_COOKIE);
    expired.set_path("/");
    cookies.remove(expired);
    ctx.sessions.remove(&token)
}

/// Where to send an anonymous request for `requested`.
pub fn login_redirect(requested: &str) -> String {
    if requested.is_empty() || requested == "/" {
        LOGIN_PATH.to_string()
    } else {
        format!("{LOGIN_PATH}?next={}", urlencoding::encode(requested))
    }
}

/// Accepts only local absolute paths as post-login targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(|c| c.is_ascii_control() || c.is_whitespace())
                && !path.starts_with(LOGIN_PATH) =>
        {
            path
        }
        _ => "/",
    }
}

/// Route layer for every protected screen.
pub async fn require_session(
    State(ctx): State<AppContext>,
    cookies: Cookies,
    request: Request,
    next: Next,
) -> Response {
    match GuardState::of(browser_session(&ctx, &cookies).as_ref()) {
        GuardState::Authenticated => next.run(request).await,
        GuardState::Unauthenticated => {
            let requested = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            log::debug!("redirecting anonymous request for {requested}");
            Redirect::to(&login_redirect(requested)).into_response()
        }
    }
}

/// Extractor for the signed-in operator and their browser's session. A
/// concurrent logout can still end the session between the guard and the
/// handler, which sends the request back to the login page.
pub struct Operator {
    pub user: SessionUser,
    pub session: SessionStore,
}

#[async_trait]
impl FromRequestParts<AppContext> for Operator {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        ctx: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let cookies = Cookies::from_request_parts(parts, ctx)
            .await
            .map_err(|_| Redirect::to(LOGIN_PATH))?;
        let session = browser_session(ctx, &cookies).ok_or_else(|| Redirect::to(LOGIN_PATH))?;
        let user = session.current_user().ok_or_else(|| Redirect::to(LOGIN_PATH))?;
        Ok(Operator { user, session })
    }
}
