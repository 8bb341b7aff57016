//! Backend forwarding.
//!
//! # Data Flow
//! ```text
//! admitted request (Allow / AllowFlagged, or public route)
//!     → dispatcher.rs (URI rewrite, header hygiene, streaming send)
//!     → backend response relayed unchanged (minus hop-by-hop headers)
//!     → or error.rs (502 / 504 / 500 JSON)
//! ```

pub mod dispatcher;
pub mod error;

pub use dispatcher::{strip_hop_by_hop, Dispatcher, ForwardMeta, X_RISK_FLAGGED, X_RISK_SCORE};
pub use error::{DispatchError, DispatchSetupError};
