mod config;
mod context;
mod database;
mod error;
mod gateway;
mod handlers;
mod middleware;
mod models;
mod screens;
mod session;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use dotenvy::dotenv;
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

use config::Config;
use context::AppContext;
use database::create_database_pool;
use error::AppResult;
use gateway::{Gateway, InMemoryGateway, PgGateway};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    env_logger::init();

    let config = Config::from_env()?;

    let gateway: Arc<dyn Gateway> = match &config.database_url {
        Some(database_url) => Arc::new(PgGateway::new(
            create_database_pool(database_url, &config).await?,
        )),
        None => {
            log::warn!(
                "DATABASE_URL not set, running in demo mode; sign in as {}",
                config.demo_admin_email
            );
            Arc::new(InMemoryGateway::demo(
                &config.demo_admin_email,
                &config.demo_admin_password,
            )?)
        }
    };

    let addr = config.bind_addr;
    let app = create_router(AppContext::new(config, gateway));

    log::info!("RBAC console listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(ctx: AppContext) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::dashboard))
        .route("/users", get(handlers::users::users_list))
        .route("/users", post(handlers::users::create_user))
        .route("/users/new", get(handlers::users::user_form))
        .route("/roles", get(handlers::roles::roles_list))
        .route("/roles/new", get(handlers::roles::role_form))
        .route("/roles/new", post(handlers::roles::update_draft))
        .route("/roles/:id", get(handlers::roles::role_detail))
        // JSON API
        .route("/api/session", get(handlers::api::current_session))
        .route(
            "/api/roles/:id/permissions",
            get(handlers::api::get_role_permissions),
        )
        .route_layer(from_fn_with_state(ctx.clone(), middleware::require_session));

    Router::new()
        // Public routes (no session required)
        .route("/login", get(handlers::auth::login_page))
        .route("/login", post(handlers::auth::login))
        .route("/logout", post(handlers::auth::logout))
        .merge(protected)
        // Static files
        .nest_service("/static", ServeDir::new(&ctx.config.static_dir))
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new()),
        )
        .with_state(ctx)
}
