//! Threshold policy over risk assessments.

use serde::Serialize;

use crate::auth::{AuthFailure, AuthResult};
use crate::config::schema::AdmissionConfig;
use crate::risk::RiskAssessment;

/// Why a request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// Score reached the deny threshold.
    RiskThreshold { threshold: u8 },
    /// Credential missing or rejected on a protected route.
    Authentication { failure: AuthFailure },
}

/// Admission verdict. Every variant carries the score it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    Allow { score: u8 },
    AllowFlagged { score: u8, threshold: u8 },
    Deny { score: u8, reason: DenyReason },
}

impl Decision {
    pub fn score(&self) -> u8 {
        match self {
            Decision::Allow { score }
            | Decision::AllowFlagged { score, .. }
            | Decision::Deny { score, .. } => *score,
        }
    }

    pub fn is_admitted(&self) -> bool {
        !matches!(self, Decision::Deny { .. })
    }

    /// Value of the `x-risk-decision` response header.
    pub fn label(&self) -> &'static str {
        match self {
            Decision::Allow { .. } => "allow",
            Decision::AllowFlagged { .. } => "flagged",
            Decision::Deny { .. } => "deny",
        }
    }
}

/// Applies flag/deny thresholds.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionController {
    flag_at: u8,
    deny_at: u8,
}

impl AdmissionController {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            flag_at: config.flag_at,
            deny_at: config.deny_at,
        }
    }

    /// Decide on a scored request.
    ///
    /// `auth` is `None` for routes that do not require authentication. A
    /// failed authentication denies regardless of the score.
    pub fn decide(&self, assessment: &RiskAssessment, auth: Option<&AuthResult>) -> Decision {
        let score = assessment.score();

        if let Some(Err(failure)) = auth {
            return Decision::Deny {
                score,
                reason: DenyReason::Authentication {
                    failure: *failure,
                },
            };
        }

        if score >= self.deny_at {
            Decision::Deny {
                score,
                reason: DenyReason::RiskThreshold {
                    threshold: self.deny_at,
                },
            }
        } else if score >= self.flag_at {
            Decision::AllowFlagged {
                score,
                threshold: self.flag_at,
            }
        } else {
            Decision::Allow { score }
        }
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AdmissionConfig::default())
    }
}
