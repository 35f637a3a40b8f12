//! Route handlers.
//!
//! Handlers stay thin: they pull the peer and headers out of the request,
//! call into [`LookupService`](crate::service::LookupService) and map
//! [`LookupError`] onto a status code.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Path, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::error::LookupError;
use crate::http::server::AppState;
use crate::resolver::{Resolution, ResolutionError};

/// Error wrapper that renders a [`LookupError`] as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub LookupError);

impl From<LookupError> for ApiError {
    fn from(e: LookupError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self.0 {
            LookupError::NoAddress(_) => (
                StatusCode::BAD_REQUEST,
                "unable to determine client ip".to_string(),
            ),
            LookupError::InvalidAddress { .. } => (StatusCode::BAD_REQUEST, "invalid ip".to_string()),
            LookupError::SourceUnavailable { stage, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("{stage} lookup failed"),
            ),
            LookupError::DeadlineExceeded(_) => {
                (StatusCode::GATEWAY_TIMEOUT, "lookup timed out".to_string())
            }
        };

        if status.is_server_error() {
            tracing::error!(stage = self.0.stage(), error = %self.0, "Lookup failed");
        } else {
            tracing::debug!(stage = self.0.stage(), error = %self.0, "Lookup rejected");
        }

        (status, body).into_response()
    }
}

/// The socket peer recorded by `into_make_service_with_connect_info`.
pub(crate) fn peer_of(request: &Request<Body>) -> Option<SocketAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr)
}

/// The client resolution for this request.
///
/// Taken from the access log when it already ran, resolved here otherwise.
fn resolution_of(state: &AppState, request: &Request<Body>) -> Result<Resolution, LookupError> {
    if let Some(resolution) = request.extensions().get::<Resolution>() {
        return Ok(*resolution);
    }
    let peer = peer_of(request).ok_or_else(missing_peer)?;
    Ok(state.service.resolve_peer(peer, request.headers()))
}

fn missing_peer() -> LookupError {
    LookupError::NoAddress(ResolutionError::NoAddress {
        peer: String::new(),
    })
}

pub async fn health() -> &'static str {
    "ok"
}

/// `GET /own`: the caller's own address as text.
pub async fn own(State(state): State<AppState>, request: Request<Body>) -> Result<String, ApiError> {
    let resolution = resolution_of(&state, &request)?;
    Ok(resolution.address.to_string())
}

/// `GET /own/all`: the caller's own address, enriched.
pub async fn own_all(State(state): State<AppState>, request: Request<Body>) -> Result<Response, ApiError> {
    let resolution = resolution_of(&state, &request)?;
    let result = state.service.enrich(resolution.address).await?;
    Ok(Json(result).into_response())
}

/// `GET /lookup/{ip}`: an arbitrary address, enriched.
pub async fn lookup(
    State(state): State<AppState>,
    Path(ip): Path<String>,
) -> Result<Response, ApiError> {
    let result = state.service.lookup(&ip).await?;
    Ok(Json(result).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::EnricherError;
    use std::time::Duration;

    fn status_of(err: LookupError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn errors_map_to_status_codes() {
        assert_eq!(status_of(missing_peer()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(LookupError::InvalidAddress { input: "x".into() }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(LookupError::SourceUnavailable {
                stage: "city",
                source: EnricherError::Database("corrupt".into()),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(LookupError::DeadlineExceeded(Duration::from_secs(2))),
            StatusCode::GATEWAY_TIMEOUT
        );
    }
}
