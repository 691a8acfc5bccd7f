//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     listener.rs (bind 127.0.0.1:0)
//!     → registry.rs (publish port, wake URL issuance)
//!
//! Per request:
//!     connection.rs (RelayGuard held until the relay body is dropped)
//! ```
//!
//! # Design Decisions
//! - Loopback only, ephemeral port, bound once per process
//! - The port is the only cross-request state, read-only after publication

pub mod connection;
pub mod listener;
pub mod registry;

pub use connection::{RelayGuard, RelayTracker};
pub use listener::LoopbackListener;
pub use registry::{PortPublisher, PortRegistry};
