//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request IDs (UUID v4)
//! - Resolve the client origin (peer address or trusted `X-Forwarded-For`)
//! - Build the scoring context from the inbound request
//! - Structurally validate JSON bodies on configured routes
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - `X-Forwarded-For` is only honored from trusted proxies
//! - Only bodies that match a validation rule are buffered; everything else
//!   streams through untouched

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderName, USER_AGENT};
use axum::http::{HeaderMap, Method, Request};
use chrono::{DateTime, FixedOffset, Local, Utc};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use ipnet::IpNet;
use std::net::IpAddr;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::config::schema::ValidationRule;
use crate::http::response::{FieldError, InputRejection};
use crate::risk::RequestContext;
use crate::routing::canonical_path;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4().to_string().parse().ok().map(RequestId::new)
    }
}

/// Resolve the client origin.
///
/// The first `X-Forwarded-For` entry is used only when the TCP peer is a
/// trusted proxy; otherwise the peer address is authoritative.
pub fn client_origin(headers: &HeaderMap, peer: Option<IpAddr>, trusted: &[IpNet]) -> String {
    let peer_trusted = peer
        .map(|ip| trusted.iter().any(|net| net.contains(&ip)))
        .unwrap_or(false);

    if peer_trusted {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(first) = forwarded {
            return first.to_string();
        }
    }

    peer.map(|ip| ip.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Current time in the configured offset, or server local time.
pub fn request_timestamp(utc_offset_minutes: Option<i32>) -> DateTime<FixedOffset> {
    match utc_offset_minutes.and_then(|minutes| FixedOffset::east_opt(minutes * 60)) {
        Some(offset) => Utc::now().with_timezone(&offset),
        None => Local::now().fixed_offset(),
    }
}

/// Snapshot the scoring inputs of an inbound request.
pub fn build_context(
    origin: &str,
    headers: &HeaderMap,
    method: &Method,
    path: &str,
    timestamp: DateTime<FixedOffset>,
) -> RequestContext {
    let descriptor = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    RequestContext::new(origin, descriptor, method.clone(), path, timestamp)
}

/// First rule matching the method and the canonical request path.
pub fn matching_rule<'a>(
    rules: &'a [ValidationRule],
    method: &Method,
    path: &str,
) -> Option<&'a ValidationRule> {
    rules.iter().find(|rule| {
        rule.method.eq_ignore_ascii_case(method.as_str())
            && canonical_path(&rule.path).is_ok_and(|rule_path| rule_path == path)
    })
}

/// Check a buffered body against a rule.
pub fn validate_body(rule: &ValidationRule, body: &[u8]) -> Result<(), InputRejection> {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            return Err(InputRejection::Invalid(vec![FieldError::new(
                "body",
                "body must be a JSON object",
            )]))
        }
    };
    let object = match value.as_object() {
        Some(object) => object,
        None => {
            return Err(InputRejection::Invalid(vec![FieldError::new(
                "body",
                "body must be a JSON object",
            )]))
        }
    };

    let details: Vec<FieldError> = rule
        .fields
        .iter()
        .filter_map(|field| match object.get(&field.name) {
            None | Some(serde_json::Value::Null) => Some(FieldError::new(
                &field.name,
                format!("{} is required", field.name),
            )),
            Some(serde_json::Value::String(s)) if s.trim().chars().count() < field.min_len => {
                Some(FieldError::new(
                    &field.name,
                    format!("{} must be at least {} characters", field.name, field.min_len),
                ))
            }
            Some(serde_json::Value::String(_)) => None,
            Some(_) => Some(FieldError::new(
                &field.name,
                format!("{} must be a string", field.name),
            )),
        })
        .collect();

    if details.is_empty() {
        Ok(())
    } else {
        Err(InputRejection::Invalid(details))
    }
}

/// Buffer a body up to `limit` bytes for validation.
///
/// Only the length limit maps to `TooLarge`; an aborted or broken body is
/// `Unreadable`.
pub async fn buffer_body(body: Body, limit: usize) -> Result<Bytes, InputRejection> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => Err(InputRejection::TooLarge { limit }),
        Err(e) => {
            tracing::debug!(error = %e, "Request body could not be read");
            Err(InputRejection::Unreadable)
        }
    }
}
