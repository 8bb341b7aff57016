//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Protected backend the gateway forwards to.
    pub backend: BackendConfig,

    /// Route classification (public vs. protected paths).
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Bearer token verification.
    pub auth: AuthConfig,

    /// Risk scoring inputs and weights.
    pub risk: RiskConfig,

    /// Admission thresholds.
    pub admission: AdmissionConfig,

    /// Client origin trust and body validation.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend base URL (e.g., "http://127.0.0.1:5000").
    pub base_url: String,

    /// Rewrite the `Host` header to the backend authority.
    pub change_origin: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            change_origin: true,
        }
    }
}

/// Route classification.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Prefix of all gated routes. Stripped before forwarding.
    pub api_prefix: String,

    /// Paths under the API prefix that bypass authentication and risk gating.
    pub public_paths: Vec<String>,

    /// Liveness endpoint.
    pub health_path: String,

    /// Metrics exposition endpoint.
    pub metrics_path: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            public_paths: vec!["/api/login".to_string(), "/api/register".to_string()],
            health_path: "/check".to_string(),
            metrics_path: "/metrics".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Backend connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time to wait for the backend's response head in seconds.
    pub upstream_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 25,
            request_secs: 30,
        }
    }
}

/// HMAC algorithms accepted for bearer tokens.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub enum JwtAlgorithm {
    #[default]
    HS256,
    HS384,
    HS512,
}

/// Bearer token verification settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    pub algorithm: JwtAlgorithm,

    /// Shared verification secret. Never serialized back out.
    #[serde(skip_serializing)]
    pub secret: Option<String>,

    /// Environment variable consulted when `secret` is not set in the file.
    pub secret_env: String,

    /// Clock skew tolerance for `exp`, in seconds.
    pub leeway_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            algorithm: JwtAlgorithm::HS256,
            secret: None,
            secret_env: "GATEWAY_JWT_SECRET".to_string(),
            leeway_secs: 0,
        }
    }
}

/// Weight contributed by each risk factor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeightTable {
    pub risky_region: u32,
    pub unknown_geo: u32,
    pub external_address: u32,
    pub sensitive_operation: u32,
    pub anomalous_path: u32,
    pub scripted_client: u32,
    pub non_browser_client: u32,
    pub missing_descriptor: u32,
    pub outside_business_hours: u32,
    pub non_standard_device: u32,
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            risky_region: 30,
            unknown_geo: 20,
            external_address: 10,
            sensitive_operation: 20,
            anomalous_path: 15,
            scripted_client: 20,
            non_browser_client: 20,
            missing_descriptor: 15,
            outside_business_hours: 20,
            non_standard_device: 10,
        }
    }
}

/// Inclusive window of local hours considered normal business hours.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 6,
            end_hour: 22,
        }
    }
}

impl BusinessHours {
    /// Returns true if `hour` falls outside the window.
    pub fn is_outside(&self, hour: u32) -> bool {
        hour < self.start_hour || hour > self.end_hour
    }
}

/// Risk scoring configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    pub weights: WeightTable,

    /// Region (country) codes treated as high risk.
    pub high_risk_regions: Vec<String>,

    /// Address ranges classified as private (trusted network).
    pub private_ranges: Vec<IpNet>,

    /// Path segments marking a destructive operation.
    pub sensitive_segments: Vec<String>,

    /// Methods marking a destructive operation.
    pub sensitive_methods: Vec<String>,

    /// Path segments targeting administrative or secure areas.
    pub anomalous_segments: Vec<String>,

    /// Scripted-client signatures added to the built-in table.
    pub scripted_signatures: Vec<String>,

    pub business_hours: BusinessHours,

    /// Fixed offset used to compute the local hour. Server local time when unset.
    pub utc_offset_minutes: Option<i32>,

    /// TOML file of geo ranges. Empty database when unset.
    pub geo_database: Option<PathBuf>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: WeightTable::default(),
            high_risk_regions: ["RU", "CN", "KP", "IR"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            private_ranges: default_private_ranges(),
            sensitive_segments: vec!["/delete".to_string()],
            sensitive_methods: vec!["DELETE".to_string()],
            anomalous_segments: vec!["/admin".to_string(), "/secure".to_string()],
            scripted_signatures: Vec::new(),
            business_hours: BusinessHours::default(),
            utc_offset_minutes: None,
            geo_database: None,
        }
    }
}

/// RFC1918 ranges plus the loopback addresses.
pub fn default_private_ranges() -> Vec<IpNet> {
    ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16", "127.0.0.1/32", "::1/128"]
        .iter()
        .filter_map(|cidr| cidr.parse().ok())
        .collect()
}

/// Admission thresholds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Scores at or above this value are forwarded but flagged.
    pub flag_at: u8,

    /// Scores at or above this value are denied.
    pub deny_at: u8,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            flag_at: 30,
            deny_at: 60,
        }
    }
}

/// A required field in a validated JSON body.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,

    /// Minimum length after trimming whitespace.
    #[serde(default = "default_min_len")]
    pub min_len: usize,
}

fn default_min_len() -> usize {
    1
}

/// Structural validation applied to matching requests before risk scoring.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ValidationRule {
    pub method: String,

    /// Exact request path (including the API prefix).
    pub path: String,

    pub fields: Vec<FieldRule>,
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Peers whose `X-Forwarded-For` header is honored.
    pub trusted_proxies: Vec<IpNet>,

    /// Maximum body size buffered for structural validation.
    pub max_validated_body_bytes: usize,

    pub validation_rules: Vec<ValidationRule>,

    /// Answer CORS preflights for any origin (browser front ends).
    pub permissive_cors: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: ["127.0.0.1/32", "::1/128"]
                .iter()
                .filter_map(|cidr| cidr.parse().ok())
                .collect(),
            max_validated_body_bytes: 1024 * 1024, // 1MB
            validation_rules: vec![ValidationRule {
                method: "POST".to_string(),
                path: "/api/secure/tasks".to_string(),
                fields: vec![FieldRule {
                    name: "title".to_string(),
                    min_len: 1,
                }],
            }],
            permissive_cors: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}
