//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(
        "Validation failed: {}",
        .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    Validation(Vec<ValidationError>),
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
///
/// The verification secret is taken from the environment variable named by
/// `auth.secret_env` when the file does not carry one.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let mut config: GatewayConfig = toml::from_str(content)?;
    resolve_secret(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn resolve_secret(config: &mut GatewayConfig) {
    let configured = config
        .auth
        .secret
        .as_deref()
        .map(|s| !s.is_empty())
        .unwrap_or(false);
    if configured {
        return;
    }

    if let Ok(secret) = std::env::var(&config.auth.secret_env) {
        if !secret.is_empty() {
            tracing::debug!(env = %config.auth.secret_env, "Verification secret loaded from environment");
            config.auth.secret = Some(secret);
        }
    }
}
