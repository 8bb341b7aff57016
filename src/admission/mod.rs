//! Admission decisions.
//!
//! Turns a risk assessment (and, on protected routes, an authentication
//! result) into allow, allow-flagged or deny. Holds no state beyond the
//! configured thresholds.

pub mod controller;

pub use controller::{AdmissionController, Decision, DenyReason};
