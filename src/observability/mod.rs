//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline produces:
//!     → logging.rs (structured log events, request ID in the trace span)
//!     → metrics.rs (TelemetryObserver: counters, last score per origin)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Scoring returns factors; only the pipeline formats them into logs
//! - Telemetry is injected, never a module-level global
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{GatewayTelemetry, MetricSnapshot, NoopTelemetry, TelemetryObserver, UpstreamFailure};
