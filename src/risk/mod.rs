//! Risk scoring subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request
//!     → context.rs (origin, descriptor, method, path, timestamp)
//!     → geo.rs (location trust, private range check)
//!     → fingerprint.rs (device class, browser engine, scripted client)
//!     → engine.rs (weighted factors, clamped score)
//!     → RiskAssessment
//! ```
//!
//! # Design Decisions
//! - Scoring is a pure function of the context and the loaded tables
//! - The engine never denies; admission is a separate step
//! - Geo data is optional; missing data raises risk instead of failing

pub mod context;
pub mod engine;
pub mod fingerprint;
pub mod geo;

pub use context::{FactorKind, RequestContext, RiskAssessment, RiskFactor, MAX_SCORE};
pub use engine::RiskEngine;
pub use fingerprint::{ClientFingerprint, Descriptor, DeviceClass, FingerprintAnalyzer};
pub use geo::{GeoDatabase, GeoDatabaseError, GeoRecord, NetworkClassifier, TrustClass};
