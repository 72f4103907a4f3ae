use axum::{
    http::{header, Method, StatusCode},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

mod error;
mod handlers;
mod pages;

use email_scanner::config::Config;
use email_scanner::sheets::SheetContactStore;
use shared_types::TokenGenerator;

/// Shared state for all handlers.
pub struct ApiState {
    pub store: SheetContactStore,
    pub site_name: String,
    pub support_email: Option<String>,
    pub allowed_origins: Vec<String>,
    pub cron_secret: Option<String>,
    pub scanner_config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Loads .env.local / .env and the optional scanner.toml; secrets resolve
    // from the environment.
    let scanner_config = Config::load(None)?;

    let key_path = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY_PATH")
        .map(PathBuf::from)
        .map_err(|_| {
            anyhow::anyhow!("GOOGLE_SERVICE_ACCOUNT_KEY_PATH environment variable must be set")
        })?;

    let tokens = TokenGenerator::new(scanner_config.secrets.unsubscribe_secret()?);
    let store = SheetContactStore::with_service_account(
        &key_path,
        scanner_config.secrets.sheet_id()?,
        tokens,
    )
    .await?;

    let state = Arc::new(ApiState {
        store,
        site_name: std::env::var("SITE_NAME")
            .unwrap_or_else(|_| scanner_config.business.name.clone()),
        support_email: std::env::var("SUPPORT_EMAIL").ok(),
        allowed_origins: env_list("SUBSCRIBE_ALLOWED_ORIGINS"),
        cron_secret: std::env::var("CRON_SECRET").ok(),
        scanner_config,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/api/unsubscribe", get(handlers::unsubscribe))
        .route("/api/subscribe", post(handlers::subscribe))
        .route("/api/cron/scan", post(handlers::cron_scan))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer())
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

fn env_list(name: &str) -> Vec<String> {
    std::env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Build the CORS layer from CORS_ALLOWED_ORIGINS; permissive when unset
/// (development only).
fn build_cors_layer() -> CorsLayer {
    let origins: Vec<_> = env_list("CORS_ALLOWED_ORIGINS")
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS_ALLOWED_ORIGINS not set, using permissive CORS (not recommended for production)"
        );
        CorsLayer::permissive()
    } else {
        tracing::info!("CORS configured for {} origins", origins.len());
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    }
}
