//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define the telemetry observer seam used by the request pipeline
//! - Count requests by outcome and track the last score per origin
//! - Render Prometheus exposition text for the metrics endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): gated requests
//! - `risk_score{ip}` (gauge): last score observed per origin
//! - `high_risk_requests_total` / `medium_risk_requests_total` /
//!   `low_risk_requests_total` (counter): admission outcome by score band
//! - `auth_failures_total{reason}` (counter)
//! - `upstream_responses_total{status}` (counter)
//! - `upstream_failures_total{kind}` (counter)
//! - `upstream_request_duration_seconds` (histogram)
//!
//! # Design Decisions
//! - The recorder is owned by the telemetry instance, not installed globally,
//!   so several gateways (and tests) can live in one process
//! - Counters are atomics; the score map is a `DashMap`; no request-level locks
//! - Observers never influence decisions

use axum::http::StatusCode;
use dashmap::DashMap;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::admission::{Decision, DenyReason};
use crate::auth::AuthFailure;
use crate::risk::RiskAssessment;

/// Upstream failure classes reported to telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamFailure {
    Connect,
    Timeout,
    Request,
}

impl UpstreamFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamFailure::Connect => "connect",
            UpstreamFailure::Timeout => "timeout",
            UpstreamFailure::Request => "request",
        }
    }
}

/// Observer of pipeline events. Implementations must be cheap and non-blocking.
pub trait TelemetryObserver: Send + Sync {
    /// A request entered the gated pipeline.
    fn request_gated(&self);

    /// A request was scored and decided.
    fn scored(&self, assessment: &RiskAssessment, decision: &Decision);

    fn auth_failed(&self, failure: AuthFailure);

    fn upstream_responded(&self, status: StatusCode, elapsed: Duration);

    fn upstream_failed(&self, failure: UpstreamFailure, elapsed: Duration);

    /// Exposition text for the metrics endpoint.
    fn render(&self) -> String;
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricSnapshot {
    pub requests: u64,
    pub high_risk: u64,
    pub medium_risk: u64,
    pub low_risk: u64,
    pub auth_failures: u64,
    pub upstream_failures: u64,
    pub last_scores: BTreeMap<String, u8>,
}

/// Default observer backed by atomics and a local Prometheus recorder.
pub struct GatewayTelemetry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    requests: AtomicU64,
    high_risk: AtomicU64,
    medium_risk: AtomicU64,
    low_risk: AtomicU64,
    auth_failures: AtomicU64,
    upstream_failures: AtomicU64,
    last_scores: DashMap<String, u8>,
}

impl GatewayTelemetry {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        Self {
            recorder,
            handle,
            requests: AtomicU64::new(0),
            high_risk: AtomicU64::new(0),
            medium_risk: AtomicU64::new(0),
            low_risk: AtomicU64::new(0),
            auth_failures: AtomicU64::new(0),
            upstream_failures: AtomicU64::new(0),
            last_scores: DashMap::new(),
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            high_risk: self.high_risk.load(Ordering::Relaxed),
            medium_risk: self.medium_risk.load(Ordering::Relaxed),
            low_risk: self.low_risk.load(Ordering::Relaxed),
            auth_failures: self.auth_failures.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures.load(Ordering::Relaxed),
            last_scores: self
                .last_scores
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }

    fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        metrics::with_local_recorder(&self.recorder, f)
    }
}

impl Default for GatewayTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GatewayTelemetry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayTelemetry")
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

impl TelemetryObserver for GatewayTelemetry {
    fn request_gated(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.record(|| metrics::counter!("http_requests_total").increment(1));
    }

    fn scored(&self, assessment: &RiskAssessment, decision: &Decision) {
        let origin = assessment.origin().to_string();
        let score = assessment.score();
        self.last_scores.insert(origin.clone(), score);

        let band = match decision {
            Decision::Allow { .. } => Some((&self.low_risk, "low_risk_requests_total")),
            Decision::AllowFlagged { .. } => Some((&self.medium_risk, "medium_risk_requests_total")),
            Decision::Deny {
                reason: DenyReason::RiskThreshold { .. },
                ..
            } => Some((&self.high_risk, "high_risk_requests_total")),
            Decision::Deny {
                reason: DenyReason::Authentication { .. },
                ..
            } => None,
        };
        if let Some((counter, _)) = band {
            counter.fetch_add(1, Ordering::Relaxed);
        }

        self.record(|| {
            metrics::gauge!("risk_score", "ip" => origin).set(f64::from(score));
            if let Some((_, name)) = band {
                metrics::counter!(name).increment(1);
            }
        });
    }

    fn auth_failed(&self, failure: AuthFailure) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
        self.record(|| {
            metrics::counter!("auth_failures_total", "reason" => failure.as_str()).increment(1)
        });
    }

    fn upstream_responded(&self, status: StatusCode, elapsed: Duration) {
        self.record(|| {
            metrics::counter!("upstream_responses_total", "status" => status.as_u16().to_string())
                .increment(1);
            metrics::histogram!("upstream_request_duration_seconds").record(elapsed.as_secs_f64());
        });
    }

    fn upstream_failed(&self, failure: UpstreamFailure, elapsed: Duration) {
        self.upstream_failures.fetch_add(1, Ordering::Relaxed);
        self.record(|| {
            metrics::counter!("upstream_failures_total", "kind" => failure.as_str()).increment(1);
            metrics::histogram!("upstream_request_duration_seconds").record(elapsed.as_secs_f64());
        });
    }

    fn render(&self) -> String {
        self.handle.run_upkeep();
        self.handle.render()
    }
}

/// Observer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTelemetry;

impl TelemetryObserver for NoopTelemetry {
    fn request_gated(&self) {}
    fn scored(&self, _: &RiskAssessment, _: &Decision) {}
    fn auth_failed(&self, _: AuthFailure) {}
    fn upstream_responded(&self, _: StatusCode, _: Duration) {}
    fn upstream_failed(&self, _: UpstreamFailure, _: Duration) {}

    fn render(&self) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{FactorKind, RiskFactor};

    fn assessment(origin: &str, score: u32) -> RiskAssessment {
        RiskAssessment::from_factors(
            origin,
            vec![RiskFactor::new(FactorKind::UnknownGeo, score, "test")],
        )
    }

    #[test]
    fn counts_outcomes_by_band() {
        let telemetry = GatewayTelemetry::new();
        telemetry.request_gated();
        telemetry.request_gated();
        telemetry.request_gated();
        telemetry.scored(&assessment("10.0.0.1", 10), &Decision::Allow { score: 10 });
        telemetry.scored(
            &assessment("10.0.0.2", 40),
            &Decision::AllowFlagged { score: 40, threshold: 30 },
        );
        telemetry.scored(
            &assessment("10.0.0.3", 70),
            &Decision::Deny {
                score: 70,
                reason: DenyReason::RiskThreshold { threshold: 60 },
            },
        );

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.requests, 3);
        assert_eq!(snapshot.low_risk, 1);
        assert_eq!(snapshot.medium_risk, 1);
        assert_eq!(snapshot.high_risk, 1);
        assert_eq!(snapshot.last_scores.get("10.0.0.3"), Some(&70));
    }

    #[test]
    fn authentication_denials_are_not_risk_bands() {
        let telemetry = GatewayTelemetry::new();
        telemetry.auth_failed(AuthFailure::Expired);
        telemetry.scored(
            &assessment("10.0.0.1", 0),
            &Decision::Deny {
                score: 0,
                reason: DenyReason::Authentication {
                    failure: AuthFailure::Expired,
                },
            },
        );
        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.auth_failures, 1);
        assert_eq!(snapshot.high_risk + snapshot.medium_risk + snapshot.low_risk, 0);
    }

    #[test]
    fn last_score_is_overwritten() {
        let telemetry = GatewayTelemetry::new();
        telemetry.scored(&assessment("10.0.0.1", 50), &Decision::Allow { score: 50 });
        telemetry.scored(&assessment("10.0.0.1", 5), &Decision::Allow { score: 5 });
        assert_eq!(telemetry.snapshot().last_scores.get("10.0.0.1"), Some(&5));
    }

    #[test]
    fn renders_prometheus_text() {
        let telemetry = GatewayTelemetry::new();
        telemetry.request_gated();
        telemetry.scored(&assessment("203.0.113.5", 45), &Decision::AllowFlagged { score: 45, threshold: 30 });
        telemetry.auth_failed(AuthFailure::NoToken);
        telemetry.upstream_responded(StatusCode::OK, Duration::from_millis(12));
        telemetry.upstream_failed(UpstreamFailure::Connect, Duration::from_millis(3));

        let text = telemetry.render();
        assert!(text.contains("http_requests_total 1"));
        assert!(text.contains("medium_risk_requests_total 1"));
        assert!(text.contains("risk_score{ip=\"203.0.113.5\"} 45"));
        assert!(text.contains("auth_failures_total{reason=\"no_token\"} 1"));
        assert!(text.contains("upstream_responses_total{status=\"200\"} 1"));
        assert!(text.contains("upstream_failures_total{kind=\"connect\"} 1"));
        assert!(text.contains("upstream_request_duration_seconds"));
    }

    #[test]
    fn instances_are_isolated() {
        let a = GatewayTelemetry::new();
        let b = GatewayTelemetry::new();
        a.request_gated();
        assert!(a.render().contains("http_requests_total 1"));
        assert!(!b.render().contains("http_requests_total"));
    }
}
