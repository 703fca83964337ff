//! Learner Circle backend.
//!
//! A role-based educational platform API: JWT session authentication,
//! argon2 password storage, and explicit per-handler authorization guards
//! over a PostgreSQL user store.
//!
//! # Architecture
//!
//! - [`auth`]: token codec, password hashing, request authentication and
//!   access guards
//! - [`api`]: HTTP models and handlers
//! - [`db`]: the [`CredentialStore`](db::store::CredentialStore) trait and
//!   its PostgreSQL implementation
//! - [`config`]: YAML + environment configuration
//!
//! # Example
//!
//! ```ignore
//! use lcircle::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     config.validate()?;
//!     Application::new(config).await?.serve(std::future::pending()).await
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{self, HeaderValue},
    routing::{get, post},
    Router,
};
use bon::Builder;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, instrument, Level};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod openapi;
pub mod telemetry;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::Config;
pub use errors::Error;

use crate::{
    auth::{
        guards::BatchAccessPolicy,
        identity::{NoDenylist, TokenDenylist},
    },
    db::store::{CredentialStore, PgCredentialStore},
    openapi::ApiDoc,
};

/// Shared application state passed to all handlers.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .store(Arc::new(PgCredentialStore::new(pool)) as Arc<dyn CredentialStore>)
///     .config(config)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: Config,
    /// Token revocation check; defaults to "nothing is ever revoked".
    #[builder(default = Arc::new(NoDenylist) as Arc<dyn TokenDenylist>)]
    pub denylist: Arc<dyn TokenDenylist>,
    #[builder(default)]
    pub batch_policy: BatchAccessPolicy,
}

/// Get the database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = config.cors.frontend_origin.parse::<HeaderValue>()?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            http::Method::GET,
            http::Method::POST,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::OPTIONS,
        ])
        .allow_headers([http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .allow_credentials(config.cors.allow_credentials))
}

/// Build the application router: API routes, docs, CORS, body limit,
/// request tracing.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let auth_routes = Router::new()
        .route("/auth/login", post(api::handlers::auth::login))
        .route("/auth/register", post(api::handlers::auth::register))
        .route("/auth/create-admin", post(api::handlers::auth::create_admin))
        .route("/auth/profile", get(api::handlers::auth::profile))
        .route("/auth/refresh", post(api::handlers::auth::refresh))
        .route("/auth/logout", post(api::handlers::auth::logout))
        .route("/auth/check", get(api::handlers::auth::check));

    let resource_routes = Router::new()
        .route("/users", get(api::handlers::users::list_users))
        .route(
            "/users/{user_id}",
            get(api::handlers::users::get_user).patch(api::handlers::users::update_user),
        )
        .route("/batches/{batch_id}", get(api::handlers::batches::get_batch));

    let cors_layer = create_cors_layer(&state.config)?;
    let max_body = state.config.limits.max_body_bytes;

    let router = Router::new()
        .route("/api/health", get(api::handlers::health::health))
        .nest("/api", auth_routes.merge(resource_routes))
        .with_state(state)
        .merge(Scalar::with_url("/api/docs", ApiDoc::openapi()))
        .layer(cors_layer)
        .layer(DefaultBodyLimit::max(max_body))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    Ok(router)
}

/// The running application: configured router plus its database pool.
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Connect to the database, run migrations and build the router.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let database_url = config
            .database_url()
            .map(str::to_owned)
            .or_else(|| std::env::var("DATABASE_URL").ok())
            .ok_or_else(|| anyhow::anyhow!("database_url not configured (config file or DATABASE_URL)"))?;

        let pool = PgPoolOptions::new().max_connections(10).connect(&database_url).await?;
        migrator().run(&pool).await?;

        let state = AppState::builder()
            .store(Arc::new(PgCredentialStore::new(pool.clone())) as Arc<dyn CredentialStore>)
            .config(config.clone())
            .build();

        let router = build_router(state)?;

        Ok(Self { router, config, pool })
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Learner Circle API listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
