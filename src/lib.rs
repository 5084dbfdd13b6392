//! Portfolio API - REST backend for the portfolio site.
//!
//! Public read endpoints serve normalized content; the admin tier (token
//! verified against the external identity provider) gets full CRUD, an
//! audit trail, and image uploads into the content repository.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod github;
pub mod logging;
pub mod mail;
pub mod repo;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pool: sqlx::PgPool,
    pub verifier: Arc<auth::Verifier>,
    pub mailer: Option<Arc<mail::Client>>,
    pub github: Option<Arc<github::GithubStore>>,
}

impl AppState {
    pub async fn from_config(config: AppConfig) -> Result<Self, sqlx::Error> {
        let pool = db::init_pool(&config).await?;
        Ok(Self {
            verifier: Arc::new(auth::Verifier::new(&config)),
            mailer: mail::Client::from_config(&config).map(Arc::new),
            github: github::GithubStore::from_config(&config).map(Arc::new),
            config: Arc::new(config),
            pool,
        })
    }
}

/// CORS from configuration. `*` allows any origin; credentials are only
/// honored with an explicit origin list.
pub fn configure_cors(config: &AppConfig) -> CorsLayer {
    let wildcard = config.allowed_origins.iter().any(|o| o == "*");

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ]);

    if wildcard {
        layer.allow_origin(tower_http::cors::Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer
            .allow_origin(origins)
            .allow_credentials(config.allow_credentials)
    }
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(&state.config);

    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/app-mode", get(routes::health::app_mode))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/refresh", post(routes::auth::refresh))
        .route("/api/auth/me", get(routes::auth::me))
        .route(
            "/api/products",
            get(routes::products::list).post(routes::products::create),
        )
        .route(
            "/api/products/{id}",
            axum::routing::put(routes::products::update).delete(routes::products::delete),
        )
        .route(
            "/api/sections",
            get(routes::sections::list).post(routes::sections::create),
        )
        .route(
            "/api/sections/{id}",
            axum::routing::put(routes::sections::update_data)
                .delete(routes::sections::delete),
        )
        .route(
            "/api/sections/{id}/meta",
            axum::routing::patch(routes::sections::patch_meta),
        )
        .route(
            "/api/activities",
            get(routes::activities::list).post(routes::activities::create),
        )
        .route(
            "/api/activities/{id}",
            get(routes::activities::get)
                .put(routes::activities::update)
                .patch(routes::activities::patch)
                .delete(routes::activities::delete),
        )
        .route(
            "/api/activity-categories",
            get(routes::activity_categories::list).post(routes::activity_categories::create),
        )
        .route(
            "/api/activity-categories/{id}",
            axum::routing::patch(routes::activity_categories::patch)
                .delete(routes::activity_categories::delete),
        )
        .route(
            "/api/technologies",
            get(routes::technologies::list).post(routes::technologies::create),
        )
        .route(
            "/api/technologies/{id}",
            axum::routing::put(routes::technologies::update)
                .delete(routes::technologies::delete),
        )
        .route("/api/images/upload", post(routes::upload::upload_image))
        .route(
            "/api/inquiries",
            get(routes::inquiries::list).post(routes::inquiries::create),
        )
        .route(
            "/api/inquiries/{id}",
            get(routes::inquiries::get).patch(routes::inquiries::patch_status),
        )
        .route("/api/inquiries/{id}/reply", post(routes::inquiries::reply))
        .route(
            "/api/admin-logs",
            get(routes::admin_logs::list).post(routes::admin_logs::create),
        )
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Upload payloads are capped at 10 MB after decoding; leave room
        // for multipart framing.
        .layer(RequestBodyLimitLayer::new(12 * 1024 * 1024))
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the program's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered lines.
    let _log_guards = logging::init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Configuration error: {}", err);
            std::process::exit(1);
        }
    };

    let state = match AppState::from_config(config).await {
        Ok(state) => state,
        Err(err) => {
            tracing::error!("Failed to initialize database pool: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = db::run_migrations(&state.pool).await {
        tracing::error!("Failed to run database migrations: {}", err);
        std::process::exit(1);
    }

    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    let app = create_app(state);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}
