//! Response handling and transformation.
//!
//! # Responsibilities
//! - Render client-facing errors as JSON `{"error": ...}` bodies
//! - Attach risk metadata headers to gated responses
//! - Map admission denials to 401/403
//!
//! # Design Decisions
//! - Every scored response carries `x-risk-score`, denials included
//! - Body validation runs before scoring, so its 400/413 rejections are the
//!   only gated responses without a score header
//! - Error bodies are fixed strings; internal detail stays in the logs

use axum::http::header::{HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::admission::{Decision, DenyReason};
use crate::auth::AuthFailure;
use crate::proxy::X_RISK_SCORE;

pub const X_RISK_DECISION: HeaderName = HeaderName::from_static("x-risk-decision");

/// `{"error": message}` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Set `x-risk-score` and `x-risk-decision` on a gated response.
pub fn with_risk_headers(mut response: Response, decision: &Decision) -> Response {
    let headers = response.headers_mut();
    headers.insert(X_RISK_SCORE, HeaderValue::from(u16::from(decision.score())));
    headers.insert(X_RISK_DECISION, HeaderValue::from_static(decision.label()));
    response
}

/// Client response for a denied request. Admitted decisions yield `None`.
pub fn denial(decision: &Decision) -> Option<Response> {
    let Decision::Deny { score, reason } = decision else {
        return None;
    };
    let response = match reason {
        DenyReason::RiskThreshold { .. } => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "error": "Access denied due to high risk score.",
                "risk_score": score,
            })),
        )
            .into_response(),
        DenyReason::Authentication {
            failure: AuthFailure::NoToken,
        } => json_error(StatusCode::UNAUTHORIZED, "No token provided"),
        DenyReason::Authentication { .. } => json_error(StatusCode::FORBIDDEN, "Invalid token"),
    };
    Some(with_risk_headers(response, decision))
}

pub fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Route not found")
}

/// One rejected field of a validated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structural validation outcome rendered as 400 (or 413 for oversize bodies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRejection {
    Invalid(Vec<FieldError>),
    TooLarge { limit: usize },
    /// The body stream failed before it was complete.
    Unreadable,
}

impl IntoResponse for InputRejection {
    fn into_response(self) -> Response {
        match self {
            InputRejection::Invalid(details) => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Validation failed",
                    "details": details,
                })),
            )
                .into_response(),
            InputRejection::TooLarge { .. } => {
                json_error(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
            }
            InputRejection::Unreadable => json_error(StatusCode::BAD_REQUEST, "Invalid request body"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn risk_denial_carries_score() {
        let decision = Decision::Deny {
            score: 80,
            reason: DenyReason::RiskThreshold { threshold: 60 },
        };
        let response = denial(&decision).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(response.headers()[&X_RISK_SCORE], "80");
        assert_eq!(response.headers()[&X_RISK_DECISION], "deny");
        let json = body_json(response).await;
        assert_eq!(json["error"], "Access denied due to high risk score.");
        assert_eq!(json["risk_score"], 80);
    }

    #[tokio::test]
    async fn auth_denials_map_to_401_and_403() {
        let missing = Decision::Deny {
            score: 15,
            reason: DenyReason::Authentication {
                failure: AuthFailure::NoToken,
            },
        };
        let response = denial(&missing).unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[&X_RISK_SCORE], "15");
        assert_eq!(body_json(response).await["error"], "No token provided");

        let expired = Decision::Deny {
            score: 0,
            reason: DenyReason::Authentication {
                failure: AuthFailure::Expired,
            },
        };
        let response = denial(&expired).unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "Invalid token");
    }

    #[test]
    fn admitted_decisions_have_no_denial() {
        assert!(denial(&Decision::Allow { score: 0 }).is_none());
        assert!(denial(&Decision::AllowFlagged { score: 30, threshold: 30 }).is_none());
    }

    #[tokio::test]
    async fn validation_failure_lists_fields() {
        let response =
            InputRejection::Invalid(vec![FieldError::new("title", "title is required")]).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"][0]["field"], "title");
    }
}
