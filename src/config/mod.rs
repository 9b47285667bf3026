//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → routing table built from the [proxy] section
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload path
//! - Required sections are `Option` so absence is a validation error
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::ServerConfig;
pub use schema::TimeoutConfig;
