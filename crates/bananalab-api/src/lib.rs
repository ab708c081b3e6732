//! # bananalab-api
//!
//! HTTP API for BananaLab projects. Design saves go through the payload
//! optimization gate before they reach the repository.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use bananalab_core::defaults::MAX_BODY_SIZE_BYTES;
use bananalab_core::{OptimizerConfig, PayloadOptimizer, ProjectRepository};

pub use error::ApiError;
pub use middleware::{payload_optimization, RoutePattern, SaveRoutes};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub projects: Arc<dyn ProjectRepository>,
    pub optimizer: Arc<PayloadOptimizer>,
    pub save_routes: Arc<SaveRoutes>,
    /// Upper bound for buffering a request body in the gate.
    pub body_limit: usize,
}

impl AppState {
    /// Build state from an optimizer configuration. Fails when a save route
    /// glob does not compile.
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        config: OptimizerConfig,
    ) -> Result<Self, regex::Error> {
        let save_routes = SaveRoutes::from_globs(&config.save_routes)?;
        Ok(Self {
            projects,
            optimizer: Arc::new(PayloadOptimizer::new(config)),
            save_routes: Arc::new(save_routes),
            body_limit: MAX_BODY_SIZE_BYTES,
        })
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }
}

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
pub struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// The application router with the gate, tracing, request ids and body limit.
pub fn router(state: AppState) -> Router {
    use handlers::projects;

    let body_limit = state.body_limit;

    Router::new()
        .route("/health", get(handlers::health_check))
        .route(
            "/api/v1/projects",
            post(projects::create_project).get(projects::list_projects),
        )
        .route("/api/v1/projects/:id", get(projects::get_project))
        .route(
            "/api/v1/projects/:id/save-progress",
            post(projects::save_progress),
        )
        .route("/api/v1/projects/:id/auto-save", post(projects::auto_save))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            payload_optimization,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .with_state(state)
}
