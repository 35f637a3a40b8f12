//! Access log middleware.
//!
//! One `info` line per request with the resolved client address, so logs
//! behind a proxy show the real caller instead of the proxy. Health checks
//! are not logged.
//!
//! The resolution is stored in the request extensions so handlers see the
//! same answer without resolving (and counting) it again.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{header::USER_AGENT, Request},
    middleware::Next,
    response::Response,
};

use crate::http::handlers::peer_of;
use crate::http::server::AppState;
use crate::observability::metrics;

pub const HEALTH_PATH: &str = "/health";

pub async fn access_log(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    if path == HEALTH_PATH {
        let response = next.run(request).await;
        metrics::record_request(&route, response.status().as_u16(), start);
        return response;
    }

    let method = request.method().clone();
    let agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    // Handlers read this back instead of resolving a second time.
    let resolution = peer_of(&request).map(|peer| state.service.resolve_peer(peer, request.headers()));
    if let Some(resolution) = resolution {
        request.extensions_mut().insert(resolution);
    }
    let ip = resolution
        .map(|r| r.address.to_string())
        .unwrap_or_else(|| "-".to_string());

    let response = next.run(request).await;
    let status = response.status().as_u16();

    tracing::info!(
        ip = %ip,
        method = %method,
        path = %path,
        status,
        duration_ms = start.elapsed().as_millis() as u64,
        agent = %agent,
        "request"
    );
    metrics::record_request(&route, status, start);

    response
}
