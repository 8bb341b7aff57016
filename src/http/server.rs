//! HTTP server setup and the gated request pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with the operational endpoints and the gateway fallback
//! - Wire up middleware (tracing, timeout, request ID, CORS)
//! - Canonicalize the path, then classify, authenticate, validate, score,
//!   admit and dispatch on that canonical form
//! - Serve until a shutdown signal arrives
//!
//! # Design Decisions
//! - All collaborators are built once at startup and shared read-only
//! - Telemetry is injected so the pipeline can run without a live registry
//! - Every path ends in a well-formed response; no panics on request paths

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::CONTENT_TYPE, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admission::{AdmissionController, Decision};
use crate::auth::{bearer_token, AuthSetupError, Authenticator};
use crate::config::{GatewayConfig, SecurityConfig};
use crate::http::request::{
    buffer_body, build_context, client_origin, matching_rule, request_timestamp, validate_body,
    UuidRequestId, X_REQUEST_ID,
};
use crate::http::response::{denial, json_error, not_found, with_risk_headers, InputRejection};
use crate::lifecycle::signals::shutdown_signal;
use crate::observability::{GatewayTelemetry, TelemetryObserver};
use crate::proxy::{DispatchSetupError, Dispatcher, ForwardMeta};
use crate::risk::geo::normalize_origin;
use crate::risk::{GeoDatabaseError, RiskAssessment, RiskEngine};
use crate::routing::{canonical_path, RouteClass, RouteTable};

/// Failure to assemble the gateway from a validated config.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Auth(#[from] AuthSetupError),

    #[error(transparent)]
    GeoDatabase(#[from] GeoDatabaseError),

    #[error(transparent)]
    Backend(#[from] DispatchSetupError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub authenticator: Arc<Authenticator>,
    pub engine: Arc<RiskEngine>,
    pub admission: AdmissionController,
    pub dispatcher: Dispatcher,
    pub telemetry: Arc<dyn TelemetryObserver>,
    pub security: Arc<SecurityConfig>,
    pub utc_offset_minutes: Option<i32>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: Arc<GatewayConfig>,
}

impl HttpServer {
    /// Create a server with the default Prometheus-backed telemetry.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        Self::with_telemetry(config, Arc::new(GatewayTelemetry::new()))
    }

    /// Create a server reporting to the given observer.
    pub fn with_telemetry(
        config: GatewayConfig,
        telemetry: Arc<dyn TelemetryObserver>,
    ) -> Result<Self, StartupError> {
        let engine = RiskEngine::from_config(&config.risk)?;
        let authenticator = Authenticator::new(&config.auth)?;
        let dispatcher = Dispatcher::new(&config.backend, &config.timeouts, telemetry.clone())?;

        let state = AppState {
            routes: Arc::new(RouteTable::from_config(&config.routing)),
            authenticator: Arc::new(authenticator),
            engine: Arc::new(engine),
            admission: AdmissionController::new(config.admission),
            dispatcher,
            telemetry,
            security: Arc::new(config.security.clone()),
            utc_offset_minutes: config.risk.utc_offset_minutes,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config: Arc::new(config),
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route(&config.routing.health_path, get(health_handler))
            .route(&config.routing.metrics_path, get(metrics_handler))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId));

        if config.security.permissive_cors {
            router = router.layer(CorsLayer::permissive());
        }
        router
    }

    /// Run the server until Ctrl-C, SIGTERM or a broadcast shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backend = %self.config.backend.base_url,
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = shutdown_signal() => {}
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown requested");
                    }
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The router, for driving the pipeline without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "message": "gateway accepted your request." }))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.telemetry.render(),
    )
}

fn peer_ip(request: &Request<Body>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Fallback handler: everything that is not an operational endpoint.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let path = match canonical_path(request.uri().path()) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(
                method = %request.method(),
                path = %request.uri().path(),
                error = %e,
                "Request path rejected"
            );
            return json_error(StatusCode::BAD_REQUEST, "Invalid request path");
        }
    };

    match state.routes.classify(&path) {
        RouteClass::Public => forward_public(&state, request, &path).await,
        RouteClass::Protected => gate(&state, request, &path).await,
        RouteClass::Health | RouteClass::Metrics | RouteClass::NotFound => {
            tracing::warn!(method = %request.method(), path = %path, "Route not found");
            not_found()
        }
    }
}

async fn forward_public(state: &AppState, request: Request<Body>, path: &str) -> Response {
    let origin = client_origin(request.headers(), peer_ip(&request), &state.security.trusted_proxies);
    tracing::debug!(origin = %origin, path = %path, "Public route, skipping risk check");

    let meta = ForwardMeta {
        client_ip: normalize_origin(&origin),
        decision: None,
    };
    let upstream_path = state.routes.upstream_path(path).to_string();
    match state.dispatcher.forward(request, &upstream_path, &meta).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

/// Authenticate, validate, score, admit and dispatch one protected request.
async fn gate(state: &AppState, request: Request<Body>, path: &str) -> Response {
    state.telemetry.request_gated();
    let origin = client_origin(request.headers(), peer_ip(&request), &state.security.trusted_proxies);

    let auth = state.authenticator.authenticate(bearer_token(request.headers()));
    if let Err(failure) = &auth {
        state.telemetry.auth_failed(*failure);
        tracing::warn!(origin = %origin, path = %path, reason = failure.as_str(), "Authentication failed");
    }

    let request = if auth.is_ok() {
        match validate_request(&state.security, request, path).await {
            Ok(request) => request,
            Err(rejection) => {
                tracing::warn!(origin = %origin, path = %path, rejection = ?rejection, "Request body rejected");
                return rejection.into_response();
            }
        }
    } else {
        request
    };

    let ctx = build_context(
        &origin,
        request.headers(),
        request.method(),
        path,
        request_timestamp(state.utc_offset_minutes),
    );
    let assessment = state.engine.score(&ctx);
    let decision = state.admission.decide(&assessment, Some(&auth));
    state.telemetry.scored(&assessment, &decision);
    log_decision(&assessment, &decision, ctx.method().as_str(), path);

    if let Some(response) = denial(&decision) {
        return response;
    }

    let meta = ForwardMeta {
        client_ip: ctx.origin().to_string(),
        decision: Some(decision),
    };
    let upstream_path = state.routes.upstream_path(path).to_string();
    let response = match state.dispatcher.forward(request, &upstream_path, &meta).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };
    with_risk_headers(response, &decision)
}

async fn validate_request(
    security: &SecurityConfig,
    request: Request<Body>,
    path: &str,
) -> Result<Request<Body>, InputRejection> {
    let Some(rule) = matching_rule(&security.validation_rules, request.method(), path) else {
        return Ok(request);
    };

    let (parts, body) = request.into_parts();
    let bytes = buffer_body(body, security.max_validated_body_bytes).await?;
    validate_body(rule, &bytes)?;
    Ok(Request::from_parts(parts, Body::from(bytes)))
}

fn log_decision(assessment: &RiskAssessment, decision: &Decision, method: &str, path: &str) {
    let origin = assessment.origin();
    let score = assessment.score();
    match decision {
        Decision::Allow { .. } => {
            tracing::debug!(origin = %origin, score, method, path, "Low risk, request allowed");
        }
        Decision::AllowFlagged { threshold, .. } => {
            tracing::warn!(
                origin = %origin,
                score,
                threshold,
                method,
                path,
                assessment = %assessment,
                "Medium risk, request flagged"
            );
            for factor in assessment.factors() {
                tracing::debug!(factor = %factor.kind, weight = factor.weight, rationale = %factor.rationale, "Risk factor");
            }
        }
        Decision::Deny { reason, .. } => {
            tracing::warn!(
                origin = %origin,
                score,
                reason = ?reason,
                method,
                path,
                assessment = %assessment,
                "Request denied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::NoopTelemetry;
    use tower::ServiceExt;

    fn config() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.secret = Some("server-unit-test-secret".to_string());
        config.backend.base_url = "http://127.0.0.1:9".to_string();
        config
    }

    fn server() -> HttpServer {
        HttpServer::with_telemetry(config(), Arc::new(NoopTelemetry)).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = server()
            .router()
            .oneshot(Request::get("/check").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_REQUEST_ID));
    }

    #[tokio::test]
    async fn test_unknown_route_is_json_404() {
        let response = server()
            .router()
            .oneshot(Request::get("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Route not found");
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_401_with_score() {
        let response = server()
            .router()
            .oneshot(Request::get("/api/data").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-risk-score"));
        assert_eq!(response.headers()["x-risk-decision"], "deny");
    }

    #[tokio::test]
    async fn test_missing_secret_fails_startup() {
        let mut config = config();
        config.auth.secret = None;
        assert!(matches!(
            HttpServer::with_telemetry(config, Arc::new(NoopTelemetry)),
            Err(StartupError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_geo_file_fails_startup() {
        let mut config = config();
        config.risk.geo_database = Some("/nonexistent/geo.toml".into());
        assert!(matches!(
            HttpServer::with_telemetry(config, Arc::new(NoopTelemetry)),
            Err(StartupError::GeoDatabase(_))
        ));
    }
}
