//! Risk scoring.
//!
//! # Responsibilities
//! - Combine network and descriptor classification with request metadata
//! - Apply the configured weight table
//! - Produce a clamped score plus the factors that produced it
//!
//! # Design Decisions
//! - Pure: no I/O, no clock reads, no logging; callers format the factors
//! - Every factor is evaluated independently and weights are additive
//! - Factor order is the evaluation order (diagnostics only)

use crate::config::schema::{BusinessHours, RiskConfig, WeightTable};
use crate::risk::context::{FactorKind, RequestContext, RiskAssessment, RiskFactor};
use crate::risk::fingerprint::{Descriptor, FingerprintAnalyzer};
use crate::risk::geo::{GeoDatabase, GeoDatabaseError, NetworkClassifier};

/// Scores requests against a fixed weight table.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    classifier: NetworkClassifier,
    fingerprints: FingerprintAnalyzer,
    weights: WeightTable,
    sensitive_segments: Vec<String>,
    sensitive_methods: Vec<String>,
    anomalous_segments: Vec<String>,
    business_hours: BusinessHours,
}

impl RiskEngine {
    /// Build an engine with an already loaded geo database.
    pub fn new(config: &RiskConfig, database: GeoDatabase) -> Self {
        Self {
            classifier: NetworkClassifier::new(
                database,
                &config.high_risk_regions,
                config.private_ranges.clone(),
            ),
            fingerprints: FingerprintAnalyzer::new(&config.scripted_signatures),
            weights: config.weights.clone(),
            sensitive_segments: config.sensitive_segments.clone(),
            sensitive_methods: config.sensitive_methods.clone(),
            anomalous_segments: config.anomalous_segments.clone(),
            business_hours: config.business_hours,
        }
    }

    /// Build an engine, loading the geo database named in the config.
    pub fn from_config(config: &RiskConfig) -> Result<Self, GeoDatabaseError> {
        let database = match &config.geo_database {
            Some(path) => GeoDatabase::load(path)?,
            None => {
                tracing::warn!("No geo database configured; every public origin scores as unknown");
                GeoDatabase::empty()
            }
        };
        Ok(Self::new(config, database))
    }

    /// Score one request.
    pub fn score(&self, ctx: &RequestContext) -> RiskAssessment {
        let w = &self.weights;
        let mut factors = Vec::new();

        // Location trust
        let trust = self.classifier.classify(ctx.origin());
        if trust.known_location {
            if trust.high_risk_region {
                factors.push(RiskFactor::new(
                    FactorKind::RiskyCountry,
                    w.risky_region,
                    format!(
                        "origin resolves to high-risk region {}",
                        trust.region.as_deref().unwrap_or("?")
                    ),
                ));
            }
        } else {
            factors.push(RiskFactor::new(
                FactorKind::UnknownGeo,
                w.unknown_geo,
                "origin not found in geo database",
            ));
        }

        if !trust.is_private_range {
            factors.push(RiskFactor::new(
                FactorKind::ExternalAddress,
                w.external_address,
                "origin outside private ranges",
            ));
        }

        // Requested operation
        let path = ctx.path();
        let method = ctx.method().as_str();
        let destructive_method = self
            .sensitive_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(method));
        if destructive_method || contains_segment(path, &self.sensitive_segments) {
            factors.push(RiskFactor::new(
                FactorKind::SensitiveOperation,
                w.sensitive_operation,
                format!("destructive operation {} {}", method, path),
            ));
        }
        if contains_segment(path, &self.anomalous_segments) {
            factors.push(RiskFactor::new(
                FactorKind::AnomalousPath,
                w.anomalous_path,
                format!("path {} targets a restricted area", path),
            ));
        }

        // Device posture
        match self.fingerprints.analyze(ctx.descriptor()) {
            Descriptor::Present(fp) => {
                if !fp.device.is_standard() {
                    factors.push(RiskFactor::new(
                        FactorKind::NonStandardDevice,
                        w.non_standard_device,
                        format!("device class {}", fp.device.as_str()),
                    ));
                }
                if fp.scripted {
                    factors.push(RiskFactor::new(
                        FactorKind::ScriptedClient,
                        w.scripted_client,
                        "descriptor matches an automation signature",
                    ));
                } else if !fp.browser_engine {
                    factors.push(RiskFactor::new(
                        FactorKind::NonBrowserClient,
                        w.non_browser_client,
                        "descriptor names no known browser engine",
                    ));
                }
            }
            Descriptor::Missing => {
                factors.push(RiskFactor::new(
                    FactorKind::MissingDescriptor,
                    w.missing_descriptor,
                    "no client descriptor supplied",
                ));
            }
        }

        // Time sensitivity
        let hour = ctx.local_hour();
        if self.business_hours.is_outside(hour) {
            factors.push(RiskFactor::new(
                FactorKind::OutsideBusinessHours,
                w.outside_business_hours,
                format!("access at hour {:02} outside business hours", hour),
            ));
        }

        RiskAssessment::from_factors(ctx.origin(), factors)
    }
}

fn contains_segment(path: &str, segments: &[String]) -> bool {
    segments.iter().any(|segment| path.contains(segment.as_str()))
}
