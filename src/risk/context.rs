//! Per-request inputs and outputs of the scoring engine.

use axum::http::Method;
use chrono::{DateTime, FixedOffset, Timelike};
use serde::Serialize;
use std::fmt;

use crate::risk::geo::normalize_origin;

/// Immutable snapshot of the request signals used for scoring.
///
/// Created once at request entry; never retained past the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    origin: String,
    descriptor: Option<String>,
    method: Method,
    path: String,
    timestamp: DateTime<FixedOffset>,
}

impl RequestContext {
    /// Build a context. The origin is normalized (IPv4-mapped prefix stripped).
    pub fn new(
        origin: &str,
        descriptor: Option<String>,
        method: Method,
        path: impl Into<String>,
        timestamp: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            origin: normalize_origin(origin),
            descriptor,
            method,
            path: path.into(),
            timestamp,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Client descriptor (user agent), if one was supplied.
    pub fn descriptor(&self) -> Option<&str> {
        self.descriptor.as_deref()
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Hour of day in the timestamp's own offset.
    pub fn local_hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Kind of signal that contributed to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    RiskyCountry,
    UnknownGeo,
    ExternalAddress,
    SensitiveOperation,
    AnomalousPath,
    NonStandardDevice,
    ScriptedClient,
    NonBrowserClient,
    MissingDescriptor,
    OutsideBusinessHours,
}

impl FactorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::RiskyCountry => "risky_country",
            FactorKind::UnknownGeo => "unknown_geo",
            FactorKind::ExternalAddress => "external_address",
            FactorKind::SensitiveOperation => "sensitive_operation",
            FactorKind::AnomalousPath => "anomalous_path",
            FactorKind::NonStandardDevice => "non_standard_device",
            FactorKind::ScriptedClient => "scripted_client",
            FactorKind::NonBrowserClient => "non_browser_client",
            FactorKind::MissingDescriptor => "missing_descriptor",
            FactorKind::OutsideBusinessHours => "outside_business_hours",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, weighted contribution to a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskFactor {
    pub kind: FactorKind,
    pub weight: u32,
    pub rationale: String,
}

impl RiskFactor {
    pub fn new(kind: FactorKind, weight: u32, rationale: impl Into<String>) -> Self {
        Self {
            kind,
            weight,
            rationale: rationale.into(),
        }
    }
}

impl fmt::Display for RiskFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(+{})", self.kind, self.weight)
    }
}

/// Upper bound of every score.
pub const MAX_SCORE: u8 = 100;

/// Result of scoring one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    score: u8,
    factors: Vec<RiskFactor>,
    origin: String,
}

impl RiskAssessment {
    /// Sum the factor weights, clamped to `0..=MAX_SCORE`.
    pub fn from_factors(origin: impl Into<String>, factors: Vec<RiskFactor>) -> Self {
        let total = factors
            .iter()
            .fold(0u32, |acc, factor| acc.saturating_add(factor.weight));
        let score = total.min(MAX_SCORE as u32) as u8;
        Self {
            score,
            factors,
            origin: origin.into(),
        }
    }

    pub fn score(&self) -> u8 {
        self.score
    }

    /// Factors in evaluation order.
    pub fn factors(&self) -> &[RiskFactor] {
        &self.factors
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn has(&self, kind: FactorKind) -> bool {
        self.factors.iter().any(|f| f.kind == kind)
    }
}

impl fmt::Display for RiskAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score={} factors=[", self.score)?;
        for (i, factor) in self.factors.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", factor)?;
        }
        write!(f, "]")
    }
}
