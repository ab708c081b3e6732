//! bananalab-api - HTTP API server for BananaLab project auto-save

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bananalab_api::{router, AppState};
use bananalab_core::defaults::{MAX_BODY_SIZE_BYTES, SERVER_PORT};
use bananalab_core::{OptimizerConfig, ProjectRepository};
use bananalab_db::{Database, MemoryProjectRepository};

/// Parse `CORS_ALLOWED_ORIGINS` (comma separated), falling back to the local
/// editor dev server.
fn parse_allowed_origins(raw: &str) -> Vec<HeaderValue> {
    let origins: Vec<HeaderValue> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| o.starts_with("http://") || o.starts_with("https://"))
        .filter_map(|o| o.parse().ok())
        .collect();

    if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5173")]
    } else {
        origins
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing with configurable output
    //
    // Environment variables:
    //   LOG_FORMAT  - "json" or "text" (default: "text")
    //   LOG_FILE    - path to log file (optional, enables file logging)
    //   LOG_ANSI    - "true"/"false" override ANSI colors (auto-detected by default)
    //   RUST_LOG    - standard env filter (default: "bananalab_api=debug,bananalab_core=info,tower_http=debug")
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bananalab_api=debug,bananalab_core=info,tower_http=debug".into());

    let registry = tracing_subscriber::registry().with(env_filter);

    let _file_guard = if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("bananalab-api.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    };

    info!(
        log_format = %log_format,
        log_file = log_file.as_deref().unwrap_or("(stdout)"),
        "Logging initialized"
    );

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(SERVER_PORT);
    let body_limit: usize = std::env::var("MAX_REQUEST_BODY_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(MAX_BODY_SIZE_BYTES);
    let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "postgres".to_string());

    let projects: Arc<dyn ProjectRepository> = match backend.as_str() {
        "memory" => {
            warn!("Using in-memory project storage; data is lost on restart");
            Arc::new(MemoryProjectRepository::new())
        }
        "postgres" => {
            let database_url = std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/bananalab".to_string());
            let db = Database::connect(&database_url)
                .await
                .context("Failed to connect to database")?;
            db.migrate().await.context("Failed to run migrations")?;
            info!("Database connected and migrated");
            Arc::new(db.projects)
        }
        other => anyhow::bail!("Unknown STORAGE_BACKEND '{}' (expected postgres or memory)", other),
    };

    let optimizer_config = OptimizerConfig::from_env();
    info!(
        max_payload_bytes = optimizer_config.max_payload_bytes(),
        large_image_threshold = optimizer_config.large_image_threshold,
        save_routes = ?optimizer_config.save_routes,
        "Payload optimization gate configured"
    );

    let state = AppState::new(projects, optimizer_config)
        .context("Invalid PAYLOAD_SAVE_ROUTES pattern")?
        .with_body_limit(body_limit);

    let allowed_origins = parse_allowed_origins(
        &std::env::var("CORS_ALLOWED_ORIGINS").unwrap_or_default(),
    );
    let app = router(state).layer(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed_origins))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .max_age(std::time::Duration::from_secs(3600)),
    );

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_origins_parsing() {
        let origins = parse_allowed_origins("https://editor.example.com, http://localhost:3000");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1], "http://localhost:3000");
    }

    #[test]
    fn test_allowed_origins_default() {
        let origins = parse_allowed_origins("not-a-url");
        assert_eq!(origins, vec![HeaderValue::from_static("http://localhost:5173")]);
    }
}
