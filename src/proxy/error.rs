//! Upstream dispatch errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::time::Duration;

use crate::http::response::json_error;
use crate::observability::UpstreamFailure;

/// A forwarded request that produced no backend response.
///
/// Details are for server-side logs; clients only see a generic message.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("backend unreachable: {0}")]
    Unavailable(#[source] hyper_util::client::legacy::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Unavailable(_) => StatusCode::BAD_GATEWAY,
            DispatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> UpstreamFailure {
        match self {
            DispatchError::Unavailable(_) => UpstreamFailure::Connect,
            DispatchError::Timeout(_) => UpstreamFailure::Timeout,
            DispatchError::Request(_) => UpstreamFailure::Request,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            DispatchError::Unavailable(_) => "API service unavailable",
            DispatchError::Timeout(_) => "API service timed out",
            DispatchError::Request(_) => "Internal gateway error",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.public_message())
    }
}

/// Backend settings that cannot produce a usable upstream URI.
#[derive(Debug, thiserror::Error)]
pub enum DispatchSetupError {
    #[error("invalid backend URL {url}: {reason}")]
    InvalidBackend { url: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn timeout_maps_to_504_without_detail() {
        let response = DispatchError::Timeout(Duration::from_secs(25)).into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "API service timed out");
    }

    #[tokio::test]
    async fn request_build_failure_maps_to_500() {
        let err = axum::http::Request::builder()
            .uri("http://[bad")
            .body(())
            .unwrap_err();
        let dispatch = DispatchError::from(err);
        assert_eq!(dispatch.kind(), UpstreamFailure::Request);
        let response = dispatch.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(!String::from_utf8_lossy(&body).contains("bad"));
    }
}
