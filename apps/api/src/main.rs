//! Gatehouse API composition root.

#![forbid(unsafe_code)]

mod auth;
mod bootstrap;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, patch, post};
use gatehouse_application::{AuthorizationService, RoleService, RoutePolicy, UserService};
use gatehouse_core::AppError;
use gatehouse_domain::{Action, Resource};
use gatehouse_infrastructure::{
    Argon2PasswordHasher, PostgresAssignmentRepository, PostgresAuthorizationRepository,
    PostgresRoleRepository, PostgresUserRepository,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

    let database_url = required_env("DATABASE_URL")?;
    let frontend_url =
        env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
    let session_secret = required_env("SESSION_SECRET")?;

    if session_secret.len() < 32 {
        return Err(AppError::Validation(
            "SESSION_SECRET must be at least 32 characters".to_owned(),
        ));
    }

    let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let api_port = env::var("API_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(3001);

    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .unwrap_or_else(|_| "false".to_owned())
        .eq_ignore_ascii_case("true");

    let admin_email = env::var("ADMIN_EMAIL")
        .ok()
        .filter(|value| !value.trim().is_empty());
    let admin_password = env::var("ADMIN_PASSWORD")
        .ok()
        .filter(|value| !value.trim().is_empty());

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    bootstrap::run(&pool, admin_email, admin_password).await?;

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    let authorization_repository = Arc::new(PostgresAuthorizationRepository::new(pool.clone()));
    let authorization_service = AuthorizationService::new(authorization_repository);

    let role_repository = Arc::new(PostgresRoleRepository::new(pool.clone()));
    let assignment_repository = Arc::new(PostgresAssignmentRepository::new(pool.clone()));
    let role_service = RoleService::new(role_repository.clone(), assignment_repository.clone());

    let user_repository = Arc::new(PostgresUserRepository::new(pool.clone()));
    let password_hasher = Arc::new(Argon2PasswordHasher::new());
    let user_service = UserService::new(
        user_repository,
        role_repository,
        assignment_repository,
        password_hasher,
    );

    let app_state = AppState {
        authorization_service,
        role_service,
        user_service,
        frontend_url: frontend_url.clone(),
    };

    // Route policies are attached per group the way rate-limit rules are:
    // a route_layer evaluates the guard, an Extension carries the metadata.
    let users_create_routes = Router::new()
        .route(
            "/api/users/create-user",
            post(handlers::users::create_user_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Users,
            Action::Create,
        )));

    let users_read_routes = Router::new()
        .route("/api/users", get(handlers::users::list_users_handler))
        .route("/api/users/{id}", get(handlers::users::get_user_handler))
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Users,
            Action::Read,
        )));

    let users_update_routes = Router::new()
        .route(
            "/api/users/update-user/{id}",
            patch(handlers::users::update_user_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Users,
            Action::Update,
        )));

    let users_delete_routes = Router::new()
        .route(
            "/api/users/archive/{id}",
            delete(handlers::users::archive_user_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Users,
            Action::Delete,
        )));

    let roles_create_routes = Router::new()
        .route(
            "/api/roles/create",
            post(handlers::roles::create_role_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Roles,
            Action::Create,
        )));

    let roles_read_routes = Router::new()
        .route("/api/roles", get(handlers::roles::list_roles_handler))
        .route("/api/roles/{id}", get(handlers::roles::get_role_handler))
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Roles,
            Action::Read,
        )));

    let roles_update_routes = Router::new()
        .route(
            "/api/roles/update/{id}",
            patch(handlers::roles::update_role_handler),
        )
        .route(
            "/api/role-assignments",
            get(handlers::roles::list_assignments_handler)
                .post(handlers::roles::assign_role_handler),
        )
        .route(
            "/api/role-unassignments",
            post(handlers::roles::archive_assignments_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Roles,
            Action::Update,
        )));

    let roles_delete_routes = Router::new()
        .route(
            "/api/roles/archive/{id}",
            delete(handlers::roles::archive_role_handler),
        )
        .route_layer(from_fn_with_state(app_state.clone(), middleware::authorize))
        .layer(axum::Extension(RoutePolicy::require(
            Resource::Roles,
            Action::Delete,
        )));

    let protected_routes = Router::new()
        .merge(users_create_routes)
        .merge(users_read_routes)
        .merge(users_update_routes)
        .merge(users_delete_routes)
        .merge(roles_create_routes)
        .merge(roles_read_routes)
        .merge(roles_update_routes)
        .merge(roles_delete_routes)
        // Open to any authenticated principal; the password handler enforces
        // account ownership itself.
        .route("/auth/me", get(auth::me_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route(
            "/api/users/update-password/{id}",
            patch(handlers::users::update_password_handler),
        )
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/login", post(auth::login_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let host = IpAddr::from_str(&api_host)
        .map_err(|error| AppError::Internal(format!("invalid API_HOST '{api_host}': {error}")))?;
    let address = SocketAddr::from((host, api_port));

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "gatehouse-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
