//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamTarget
//!     → client.rs (URL parse, scheme/transport check)
//!     → plain (HttpConnector) or encrypted (hyper-rustls) client
//!     → Response<Incoming> | Upstream error | Timeout
//!
//! Direct playlist fetch:
//!     url (as given) → client.rs (own header table) → text | UpstreamStatus
//! ```

pub mod client;

pub use client::{Deadline, UpstreamClient};
