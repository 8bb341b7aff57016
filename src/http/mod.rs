//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route classification)
//!     → request.rs (request ID, client origin, scoring context, body checks)
//!     → [auth → risk → admission] (protected routes only)
//!     → [proxy dispatcher forwards to backend]
//!     → response.rs (risk headers, JSON errors)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use response::X_RISK_DECISION;
pub use server::{AppState, HttpServer, StartupError};
