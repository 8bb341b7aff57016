//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Select pretty or JSON output
//! - Apply the configured log level
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` overrides the configured level when set

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init(),
    }
}

fn default_filter(config: &ObservabilityConfig) -> EnvFilter {
    let level = config.log_level.trim();
    EnvFilter::try_new(format!("risk_gateway={level},tower_http={level}"))
        .unwrap_or_else(|_| EnvFilter::new("risk_gateway=info,tower_http=info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = ObservabilityConfig {
            log_level: "not a level!".to_string(),
            ..ObservabilityConfig::default()
        };
        let rendered = default_filter(&config).to_string();
        assert!(rendered.contains("risk_gateway=info"));
        assert!(rendered.contains("tower_http=info"));
    }

    #[test]
    fn configured_level_applies_to_crate_and_tower_http() {
        let config = ObservabilityConfig {
            log_level: "debug".to_string(),
            ..ObservabilityConfig::default()
        };
        let rendered = default_filter(&config).to_string();
        assert!(rendered.contains("risk_gateway=debug"));
        assert!(rendered.contains("tower_http=debug"));
    }
}
