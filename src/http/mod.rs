//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound connection (127.0.0.1:<port>)
//!     → server.rs (Axum setup, request ID, trace spans)
//!     → routing::target (decode path into UpstreamTarget)
//!     → upstream::client (GET with headers.rs outbound table)
//!     → response.rs (status + headers.rs inbound set + streamed body)
//!     → Send to caller
//! ```

pub mod headers;
pub mod response;
pub mod server;

pub use server::ProxyServer;
