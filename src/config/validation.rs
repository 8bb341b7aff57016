//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds, hours, offsets, timeout ordering)
//! - Check the backend URL and bind address are usable
//! - Require externally supplied secret material
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("backend.base_url `{url}` is invalid: {reason}")]
    BackendUrl { url: String, reason: String },

    #[error("routing.{field} `{value}` must start with '/'")]
    RoutePath { field: &'static str, value: String },

    #[error("routing.health_path and routing.metrics_path are both `{0}`")]
    DuplicateRoute(String),

    #[error("auth secret missing: set auth.secret or the {0} environment variable")]
    MissingSecret(String),

    #[error("admission threshold {name} = {value} exceeds 100")]
    ThresholdRange { name: &'static str, value: u8 },

    #[error("admission.flag_at ({flag_at}) must not exceed admission.deny_at ({deny_at})")]
    ThresholdOrder { flag_at: u8, deny_at: u8 },

    #[error("risk.business_hours {start}..={end} is not a valid hour window")]
    BusinessHours { start: u32, end: u32 },

    #[error("risk.utc_offset_minutes {0} is out of range")]
    UtcOffset(i32),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("timeouts.upstream_secs ({upstream}) must be less than timeouts.request_secs ({request})")]
    TimeoutOrder { upstream: u64, request: u64 },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if let Err(reason) = check_backend_url(&config.backend.base_url) {
        errors.push(ValidationError::BackendUrl {
            url: config.backend.base_url.clone(),
            reason,
        });
    }

    let routing = &config.routing;
    let paths = [
        ("api_prefix", &routing.api_prefix),
        ("health_path", &routing.health_path),
        ("metrics_path", &routing.metrics_path),
    ];
    for (field, value) in paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                field,
                value: value.clone(),
            });
        }
    }
    if routing.health_path == routing.metrics_path {
        errors.push(ValidationError::DuplicateRoute(routing.health_path.clone()));
    }
    for value in &routing.public_paths {
        if !value.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                field: "public_paths",
                value: value.clone(),
            });
        }
    }

    let secret_present = config
        .auth
        .secret
        .as_deref()
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    if !secret_present {
        errors.push(ValidationError::MissingSecret(config.auth.secret_env.clone()));
    }

    let admission = &config.admission;
    for (name, value) in [("flag_at", admission.flag_at), ("deny_at", admission.deny_at)] {
        if value > 100 {
            errors.push(ValidationError::ThresholdRange { name, value });
        }
    }
    if admission.flag_at > admission.deny_at {
        errors.push(ValidationError::ThresholdOrder {
            flag_at: admission.flag_at,
            deny_at: admission.deny_at,
        });
    }

    let hours = config.risk.business_hours;
    if hours.start_hour > 23 || hours.end_hour > 23 || hours.start_hour > hours.end_hour {
        errors.push(ValidationError::BusinessHours {
            start: hours.start_hour,
            end: hours.end_hour,
        });
    }

    if let Some(offset) = config.risk.utc_offset_minutes {
        if offset.abs() >= 24 * 60 {
            errors.push(ValidationError::UtcOffset(offset));
        }
    }

    let timeouts = &config.timeouts;
    for (name, value) in [
        ("connect_secs", timeouts.connect_secs),
        ("upstream_secs", timeouts.upstream_secs),
        ("request_secs", timeouts.request_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }
    // The request deadline must leave room for the upstream 504 to be sent.
    if timeouts.upstream_secs >= timeouts.request_secs {
        errors.push(ValidationError::TimeoutOrder {
            upstream: timeouts.upstream_secs,
            request: timeouts.request_secs,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_backend_url(raw: &str) -> Result<(), String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;
    if url.scheme() != "http" {
        return Err(format!("unsupported scheme `{}`", url.scheme()));
    }
    if url.host_str().is_none() {
        return Err("missing host".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.auth.secret = Some("test-secret".into());
        config
    }

    #[test]
    fn default_with_secret_is_valid() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn missing_secret_is_rejected() {
        let config = GatewayConfig::default();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::MissingSecret("GATEWAY_JWT_SECRET".into())]
        );
    }

    #[test]
    fn reports_every_error() {
        let mut config = valid();
        config.admission.flag_at = 70;
        config.admission.deny_at = 101;
        config.backend.base_url = "https://backend:5000".into();
        config.risk.business_hours.start_hour = 23;
        config.risk.business_hours.end_hour = 6;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors.contains(&ValidationError::ThresholdRange {
            name: "deny_at",
            value: 101
        }));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::BackendUrl { .. })));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::BusinessHours { .. })));
    }

    #[test]
    fn flag_above_deny_is_rejected() {
        let mut config = valid();
        config.admission.flag_at = 61;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ThresholdOrder {
                flag_at: 61,
                deny_at: 60
            }]
        );
    }

    #[test]
    fn relative_or_duplicate_routes_are_rejected() {
        let mut config = valid();
        config.routing.metrics_path = "/check".into();
        config.routing.public_paths.push("api/login".into());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateRoute("/check".into())));
        assert!(errors.contains(&ValidationError::RoutePath {
            field: "public_paths",
            value: "api/login".into()
        }));
    }

    #[test]
    fn upstream_timeout_must_fit_inside_request_timeout() {
        let mut config = valid();
        config.timeouts.upstream_secs = 30;
        config.timeouts.request_secs = 30;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::TimeoutOrder {
                upstream: 30,
                request: 30
            }]
        );

        config.timeouts.upstream_secs = 29;
        assert!(validate_config(&config).is_ok());
    }
}
