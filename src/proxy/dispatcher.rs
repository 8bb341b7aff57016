//! Backend dispatch.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend base URL
//! - Strip hop-by-hop headers in both directions
//! - Add forwarding and risk metadata headers
//! - Stream request and response bodies without buffering
//! - Bound the wait for the backend response head
//!
//! # Design Decisions
//! - One attempt per request: failures are surfaced, never retried
//! - The in-flight call lives inside the request future, so a client
//!   disconnect drops it
//! - Failure details are logged here; callers only render the error

use axum::body::Body;
use axum::http::header::{HeaderName, HeaderValue, CONNECTION, HOST};
use axum::http::{HeaderMap, Request, Response, Uri};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::admission::Decision;
use crate::config::schema::{BackendConfig, TimeoutConfig};
use crate::observability::TelemetryObserver;
use crate::proxy::error::{DispatchError, DispatchSetupError};

pub const X_RISK_SCORE: HeaderName = HeaderName::from_static("x-risk-score");
pub const X_RISK_FLAGGED: HeaderName = HeaderName::from_static("x-risk-flagged");
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Connection-scoped headers that must not cross the proxy.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Remove hop-by-hop headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(*name);
    }
}

/// Per-request forwarding metadata.
#[derive(Debug, Clone)]
pub struct ForwardMeta {
    /// Resolved client origin, appended to `X-Forwarded-For`.
    pub client_ip: String,
    /// Admission verdict for gated routes; `None` on public routes.
    pub decision: Option<Decision>,
}

/// Forwards admitted requests to the configured backend.
#[derive(Clone)]
pub struct Dispatcher {
    client: Client<HttpConnector, Body>,
    scheme: String,
    authority: String,
    base_path: String,
    change_origin: bool,
    upstream_timeout: Duration,
    telemetry: Arc<dyn TelemetryObserver>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &format!("{}://{}{}", self.scheme, self.authority, self.base_path))
            .field("change_origin", &self.change_origin)
            .field("upstream_timeout", &self.upstream_timeout)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(
        backend: &BackendConfig,
        timeouts: &TimeoutConfig,
        telemetry: Arc<dyn TelemetryObserver>,
    ) -> Result<Self, DispatchSetupError> {
        let invalid = |reason: &str| DispatchSetupError::InvalidBackend {
            url: backend.base_url.clone(),
            reason: reason.to_string(),
        };
        let uri: Uri = backend
            .base_url
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| invalid(&e.to_string()))?;
        let scheme = uri.scheme_str().ok_or_else(|| invalid("missing scheme"))?.to_string();
        let authority = uri
            .authority()
            .ok_or_else(|| invalid("missing host"))?
            .to_string();
        let base_path = uri.path().trim_end_matches('/').to_string();

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
        connector.set_nodelay(true);
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            client,
            scheme,
            authority,
            base_path,
            change_origin: backend.change_origin,
            upstream_timeout: Duration::from_secs(timeouts.upstream_secs),
            telemetry,
        })
    }

    /// Backend URI for an already prefix-stripped path and optional query.
    pub fn upstream_uri(&self, path: &str, query: Option<&str>) -> Result<Uri, axum::http::Error> {
        let mut path_and_query = format!("{}{}", self.base_path, path);
        if let Some(query) = query {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }
        Uri::builder()
            .scheme(self.scheme.as_str())
            .authority(self.authority.as_str())
            .path_and_query(path_and_query)
            .build()
    }

    /// Forward `request` to `path` on the backend and relay the response.
    pub async fn forward(
        &self,
        request: Request<Body>,
        path: &str,
        meta: &ForwardMeta,
    ) -> Result<Response<Body>, DispatchError> {
        let started = Instant::now();
        let result = self.send(request, path, meta).await;
        let elapsed = started.elapsed();

        match &result {
            Ok(response) => {
                tracing::debug!(
                    status = response.status().as_u16(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Upstream responded"
                );
                self.telemetry.upstream_responded(response.status(), elapsed);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    kind = e.kind().as_str(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Upstream request failed"
                );
                self.telemetry.upstream_failed(e.kind(), elapsed);
            }
        }
        result
    }

    async fn send(
        &self,
        request: Request<Body>,
        path: &str,
        meta: &ForwardMeta,
    ) -> Result<Response<Body>, DispatchError> {
        let (parts, body) = request.into_parts();
        let uri = self.upstream_uri(path, parts.uri.query())?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        self.apply_forwarding_headers(&mut headers, meta);

        let mut builder = Request::builder().method(parts.method).uri(uri);
        if let Some(target) = builder.headers_mut() {
            *target = headers;
        }
        let upstream = builder.body(body)?;

        tracing::debug!(
            method = %upstream.method(),
            uri = %upstream.uri(),
            "Forwarding request"
        );

        let pending = tokio::time::timeout(self.upstream_timeout, self.client.request(upstream));
        let response: Response<hyper::body::Incoming> = match pending.await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(DispatchError::Unavailable(e)),
            Err(_) => return Err(DispatchError::Timeout(self.upstream_timeout)),
        };

        let (mut parts, body) = response.into_parts();
        strip_hop_by_hop(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }

    fn apply_forwarding_headers(&self, headers: &mut HeaderMap, meta: &ForwardMeta) {
        let original_host = headers.get(HOST).cloned();

        let forwarded_for = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(existing) if !existing.trim().is_empty() => {
                format!("{}, {}", existing.trim(), meta.client_ip)
            }
            _ => meta.client_ip.clone(),
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
            headers.insert(X_FORWARDED_FOR, value);
        }
        if let Some(host) = original_host {
            headers.insert(X_FORWARDED_HOST, host);
        }
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));

        if self.change_origin {
            if let Ok(value) = HeaderValue::from_str(&self.authority) {
                headers.insert(HOST, value);
            }
        }

        // Gateway-owned headers are never trusted from the client.
        headers.remove(&X_RISK_SCORE);
        headers.remove(&X_RISK_FLAGGED);
        if let Some(decision) = &meta.decision {
            headers.insert(X_RISK_SCORE, HeaderValue::from(u16::from(decision.score())));
            if matches!(decision, Decision::AllowFlagged { .. }) {
                headers.insert(X_RISK_FLAGGED, HeaderValue::from_static("true"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::NoopTelemetry;

    fn dispatcher(base_url: &str, change_origin: bool) -> Dispatcher {
        let backend = BackendConfig {
            base_url: base_url.to_string(),
            change_origin,
        };
        Dispatcher::new(&backend, &TimeoutConfig::default(), Arc::new(NoopTelemetry)).unwrap()
    }

    #[test]
    fn test_upstream_uri_keeps_query_and_base_path() {
        let d = dispatcher("http://backend:5000", true);
        assert_eq!(
            d.upstream_uri("/secure/tasks", Some("page=2")).unwrap().to_string(),
            "http://backend:5000/secure/tasks?page=2"
        );

        let d = dispatcher("http://backend:5000/v1/", true);
        assert_eq!(
            d.upstream_uri("/profile", None).unwrap().to_string(),
            "http://backend:5000/v1/profile"
        );
    }

    #[test]
    fn test_invalid_backend_is_rejected() {
        let backend = BackendConfig {
            base_url: "/relative".to_string(),
            change_origin: true,
        };
        assert!(Dispatcher::new(&backend, &TimeoutConfig::default(), Arc::new(NoopTelemetry)).is_err());
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive, x-session-hint"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert("x-session-hint", HeaderValue::from_static("abc"));
        headers.insert("transfer-encoding", HeaderValue::from_static("chunked"));
        headers.insert("upgrade", HeaderValue::from_static("websocket"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));

        strip_hop_by_hop(&mut headers);

        assert!(headers.get(CONNECTION).is_none());
        assert!(headers.get("keep-alive").is_none());
        assert!(headers.get("x-session-hint").is_none());
        assert!(headers.get("transfer-encoding").is_none());
        assert!(headers.get("upgrade").is_none());
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("authorization").unwrap(), "Bearer t");
    }

    #[test]
    fn test_forwarding_headers_for_flagged_request() {
        let d = dispatcher("http://backend:5000", true);
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("gateway.example.com"));
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("198.51.100.1"));
        headers.insert(X_RISK_SCORE, HeaderValue::from_static("0"));

        let meta = ForwardMeta {
            client_ip: "203.0.113.5".to_string(),
            decision: Some(Decision::AllowFlagged { score: 45, threshold: 30 }),
        };
        d.apply_forwarding_headers(&mut headers, &meta);

        assert_eq!(headers.get(HOST).unwrap(), "backend:5000");
        assert_eq!(headers.get(&X_FORWARDED_HOST).unwrap(), "gateway.example.com");
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "198.51.100.1, 203.0.113.5");
        assert_eq!(headers.get(&X_RISK_SCORE).unwrap(), "45");
        assert_eq!(headers.get(&X_RISK_FLAGGED).unwrap(), "true");
    }

    #[test]
    fn test_public_route_carries_no_risk_headers() {
        let d = dispatcher("http://backend:5000", false);
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("gateway.example.com"));
        headers.insert(X_RISK_FLAGGED, HeaderValue::from_static("true"));

        let meta = ForwardMeta {
            client_ip: "10.0.0.7".to_string(),
            decision: None,
        };
        d.apply_forwarding_headers(&mut headers, &meta);

        assert_eq!(headers.get(HOST).unwrap(), "gateway.example.com");
        assert_eq!(headers.get(&X_FORWARDED_FOR).unwrap(), "10.0.0.7");
        assert!(headers.get(&X_RISK_SCORE).is_none());
        assert!(headers.get(&X_RISK_FLAGGED).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unavailable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let d = dispatcher(&format!("http://{}", addr), true);
        let meta = ForwardMeta {
            client_ip: "127.0.0.1".to_string(),
            decision: None,
        };
        let request = Request::builder().uri("/api/data").body(Body::empty()).unwrap();
        let err = d.forward(request, "/data", &meta).await.unwrap_err();
        assert!(matches!(err, DispatchError::Unavailable(_)));
    }
}
