//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! optional config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → read once at startup by the server and the binary
//! ```
//!
//! # Design Decisions
//! - All fields have defaults; no file is needed
//! - The listener address is not configurable: always 127.0.0.1:0
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{ObservabilityConfig, ProxyConfig, UpstreamConfig};
