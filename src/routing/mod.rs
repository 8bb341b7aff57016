//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → path.rs (canonical form, traversal rejected)
//!     → router.rs (route table lookup)
//!     → matcher.rs (exact / segment-prefix conditions)
//!     → Return: RouteClass (Health, Metrics, Public, Protected, NotFound)
//!
//! Route Compilation (at startup):
//!     RoutingConfig
//!     → Compile matchers in evaluation order
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins

pub mod matcher;
pub mod path;
pub mod router;

pub use path::{canonical_path, PathError};
pub use router::{RouteClass, RouteTable};
