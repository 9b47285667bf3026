//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header)
//!     → matcher.rs (extract host, strip port)
//!     → router.rs (domain lookup)
//!     → Return: matched Backend or NoMatch
//!
//! Table Construction (at startup):
//!     (domain, url)[]
//!     → backend.rs (parse origin, fail fast)
//!     → Freeze as immutable RoutingTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact, case-sensitive domain match
//! - Deterministic: same input always matches same route

pub mod backend;
pub mod matcher;
pub mod router;

pub use backend::{Backend, BackendError};
pub use matcher::{domain_of, request_host};
pub use router::{RouteError, RoutingTable};
