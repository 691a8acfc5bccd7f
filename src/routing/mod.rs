//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound path-and-query ("/http%3A%2F%2Fhost%2Fa.m3u8")
//!     → target.rs (strip "/", percent-decode once)
//!     → target.rs (raw "https" prefix selects transport)
//!     → Return: UpstreamTarget or MalformedTarget
//! ```
//!
//! # Design Decisions
//! - There is no route table: the path itself is the destination
//! - Resolution is pure and performs no I/O

pub mod target;

pub use target::{resolve, Transport, UpstreamTarget};
