//! Bearer token verification.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::schema::{AuthConfig, JwtAlgorithm};

/// Why a credential was rejected. Callers treat every variant as
/// "deny, re-authenticate"; the distinction is advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailure {
    #[error("no token provided")]
    NoToken,

    #[error("invalid token")]
    InvalidSignature,

    #[error("token expired")]
    Expired,
}

impl AuthFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailure::NoToken => "no_token",
            AuthFailure::InvalidSignature => "invalid_signature",
            AuthFailure::Expired => "expired",
        }
    }
}

/// Outcome of authenticating one request.
pub type AuthResult = Result<Identity, AuthFailure>;

/// User id as issued by the backend: numeric or opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SubjectId {
    Number(u64),
    Text(String),
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubjectId::Number(n) => write!(f, "{}", n),
            SubjectId::Text(s) => f.write_str(s),
        }
    }
}

/// Verified identity claims. Opaque to risk scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: SubjectId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Claims {
    id: Option<SubjectId>,
    sub: Option<String>,
    email: Option<String>,
    name: Option<String>,
    exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthSetupError {
    #[error("verification secret is not configured")]
    MissingSecret,
}

/// Verifies HMAC-signed bearer tokens against a process-wide secret.
#[derive(Clone)]
pub struct Authenticator {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl Authenticator {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthSetupError> {
        let secret = config
            .secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthSetupError::MissingSecret)?;

        let algorithm = match config.algorithm {
            JwtAlgorithm::HS256 => Algorithm::HS256,
            JwtAlgorithm::HS384 => Algorithm::HS384,
            JwtAlgorithm::HS512 => Algorithm::HS512,
        };
        let mut validation = Validation::new(algorithm);
        validation.algorithms = vec![algorithm];
        validation.leeway = config.leeway_secs;

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verify a raw token (without the `Bearer ` scheme).
    pub fn authenticate(&self, token: Option<&str>) -> AuthResult {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthFailure::NoToken),
        };

        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "Token rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthFailure::Expired,
                _ => AuthFailure::InvalidSignature,
            }
        })?;
        let claims = data.claims;

        let id = claims
            .id
            .or(claims.sub.map(SubjectId::Text))
            .ok_or(AuthFailure::InvalidSignature)?;
        let expires_at =
            DateTime::<Utc>::from_timestamp(claims.exp, 0).ok_or(AuthFailure::InvalidSignature)?;

        Ok(Identity {
            id,
            email: claims.email,
            name: claims.name,
            expires_at,
        })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
/// The scheme is matched case-insensitively; other schemes yield `None`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
