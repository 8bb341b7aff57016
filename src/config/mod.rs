//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, resolve secret from env)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Secret material has no compiled-in default
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdmissionConfig, AuthConfig, BackendConfig, BusinessHours, FieldRule, GatewayConfig,
    JwtAlgorithm, ListenerConfig, LogFormat, ObservabilityConfig, RiskConfig, RoutingConfig,
    SecurityConfig, TimeoutConfig, ValidationRule, WeightTable,
};
