//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Bind 127.0.0.1:0 → Publish port → Spawn server → ProxyHandle
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C / ProxyHandle::shutdown → Stop accepting → Drain relays
//! ```

pub mod shutdown;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{start, ProxyHandle};
