//! Payload optimization gate for design save endpoints.
//!
//! Requests whose path matches one of the configured save routes have the
//! `design_data` field of their JSON body rewritten by the
//! [`PayloadOptimizer`](bananalab_core::PayloadOptimizer) before the handler
//! runs. Everything else passes through untouched.

use axum::body::{Body, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

use bananalab_core::Error;

use crate::error::ApiError;
use crate::AppState;

/// Body field holding the design document.
pub const DESIGN_DATA_FIELD: &str = "design_data";

/// A save route glob such as `api/v1/projects/*/auto-save`.
///
/// `*` matches any run of characters. A leading `/` is ignored on both the
/// pattern and the request path.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    glob: String,
    regex: Regex,
}

impl RoutePattern {
    pub fn new(glob: &str) -> Result<Self, regex::Error> {
        let trimmed = glob.trim_start_matches('/');
        let pattern = regex::escape(trimmed).replace(r"\*", ".*");
        Ok(Self {
            glob: glob.to_string(),
            regex: Regex::new(&format!("^{}$", pattern))?,
        })
    }

    pub fn glob(&self) -> &str {
        &self.glob
    }

    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path.trim_start_matches('/'))
    }
}

/// The allow-list of routes guarded by the gate.
#[derive(Debug, Clone, Default)]
pub struct SaveRoutes {
    patterns: Vec<RoutePattern>,
}

impl SaveRoutes {
    pub fn from_globs<I, S>(globs: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = globs
            .into_iter()
            .map(|g| RoutePattern::new(g.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn rebuild(parts: axum::http::request::Parts, bytes: Bytes) -> Request {
    Request::from_parts(parts, Body::from(bytes))
}

/// Optimize `design_data` on save routes; reject with 413 when it cannot be
/// brought under the packet budget.
///
/// On success the [`OptimizationReport`](bananalab_core::OptimizationReport)
/// is available to handlers as a request extension.
pub async fn payload_optimization(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let route = request.uri().path().to_string();
    if !state.save_routes.matches(&route) {
        return Ok(next.run(request).await);
    }

    let (mut parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read request body: {}", e)))?;

    let mut payload = match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => map,
        _ => {
            debug!(route = %route, "Save request body is not a JSON object, passing through");
            return Ok(next.run(rebuild(parts, bytes)).await);
        }
    };

    let Some(field) = payload.remove(DESIGN_DATA_FIELD) else {
        debug!(route = %route, "No design_data in save request, passing through");
        return Ok(next.run(rebuild(parts, bytes)).await);
    };

    let (document, string_encoded) = match field {
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(doc) => (doc, true),
            Err(_) => {
                debug!(route = %route, "design_data string is not JSON, passing through");
                return Ok(next.run(rebuild(parts, bytes)).await);
            }
        },
        other => (other, false),
    };

    let optimized = match state.optimizer.optimize(document) {
        Ok(optimized) => optimized,
        Err(Error::PayloadTooLarge {
            size_bytes,
            limit_bytes,
        }) => {
            warn!(
                route = %route,
                optimized_size = size_bytes,
                size_mb = bananalab_core::size_in_mb(size_bytes),
                max_size_mb = bananalab_core::size_in_mb(limit_bytes),
                "Rejected oversized design payload"
            );
            return Err(ApiError::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            });
        }
        Err(Error::InvalidDesign(e)) => {
            debug!(route = %route, error = %e, "design_data is not a design document, passing through");
            return Ok(next.run(rebuild(parts, bytes)).await);
        }
        Err(e) => return Err(e.into()),
    };

    let report = optimized.report;
    if !report.changed() {
        parts.extensions.insert(report);
        return Ok(next.run(rebuild(parts, bytes)).await);
    }

    let design = if string_encoded {
        Value::String(
            serde_json::to_string(&optimized.document)
                .map_err(|e| ApiError::Internal(e.to_string()))?,
        )
    } else {
        optimized.document
    };
    payload.insert(DESIGN_DATA_FIELD.to_string(), design);

    let rewritten = serde_json::to_vec(&Value::Object(payload))
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    parts
        .headers
        .insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.len()));

    info!(
        route = %route,
        original_size = report.original_bytes,
        optimized_size = report.optimized_bytes,
        saved_percent = report.saved_percent,
        "Optimized design payload"
    );
    parts.extensions.insert(report);

    Ok(next.run(rebuild(parts, Bytes::from(rewritten))).await)
}
