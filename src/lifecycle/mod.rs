//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Init logging → Build gateway → Bind listener
//!
//! Shutdown (shutdown.rs):
//!     Trigger received → Stop accepting → Drain in-flight requests → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then logging, then collaborators, then listener
//! - No reload: configuration changes require a restart

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
