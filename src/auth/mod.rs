//! Credential authentication.
//!
//! # Responsibilities
//! - Extract bearer tokens from the `Authorization` header
//! - Verify signature and expiry against the configured secret
//! - Map verification errors onto a small failure taxonomy
//!
//! # Design Decisions
//! - Stateless: the decoding key is built once and shared read-only
//! - Token values are never logged
//! - Public routes never reach this module

pub mod authenticator;

pub use authenticator::{
    bearer_token, AuthFailure, AuthResult, AuthSetupError, Authenticator, Identity, SubjectId,
};
