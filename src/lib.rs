//! Loopback forwarding proxy for cross-origin playlist playback.
//!
//! A request for `http://127.0.0.1:<port>/<percent-encoded-url>` is re-issued
//! to the decoded URL with a fixed browser-like header set, and the upstream
//! response is streamed back with permissive CORS headers and a content type
//! inferred for `.m3u8` manifests and `.ts` segments.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::ProxyServer;
pub use lifecycle::{start, ProxyHandle, Shutdown};
pub use net::{PortPublisher, PortRegistry};
