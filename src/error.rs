//! Error taxonomy for the forwarding proxy.
//!
//! Every per-request failure maps onto exactly one inbound response; see
//! [`ProxyError::status`] and [`ProxyError::body`]. `Bind`,
//! `ProxyUnavailable` and `UpstreamStatus` never reach a client: they are
//! startup, URL-issuance and direct-fetch failures reported to the embedding
//! application.

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors that can occur while serving a proxied request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The inbound path is not a valid percent-encoded string.
    #[error("malformed target {raw:?}: {reason}")]
    MalformedTarget { raw: String, reason: &'static str },

    /// The decoded target cannot be dispatched (not an absolute URL, or a
    /// scheme the selected transport does not carry).
    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidTarget { url: String, reason: String },

    /// Connect, DNS, TLS or reset failure before response headers arrived.
    #[error("upstream request failed: {0}")]
    Upstream(#[source] hyper_util::client::legacy::Error),

    /// A direct playlist fetch was answered with a non-success status.
    #[error("HTTP错误 ({status}): {reason}")]
    UpstreamStatus { status: u16, reason: String },

    /// The upstream body failed before any byte was relayed.
    #[error("upstream body failed: {0}")]
    Body(#[source] hyper::Error),

    /// The upstream did not produce a response within the deadline.
    #[error("upstream did not respond within {0:?}")]
    Timeout(Duration),

    /// The loopback listener could not be bound.
    #[error("failed to bind proxy listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The listener never published its port.
    #[error("proxy port was never published")]
    ProxyUnavailable,
}

impl ProxyError {
    /// Status code written to the inbound connection.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed body text written to the inbound connection.
    pub fn body(&self) -> &'static str {
        match self {
            ProxyError::MalformedTarget { .. } | ProxyError::InvalidTarget { .. } => "Server Error",
            ProxyError::Upstream(_) | ProxyError::UpstreamStatus { .. } => "Proxy Error",
            ProxyError::Body(_) => "Response Error",
            ProxyError::Timeout(_) => "Request Timeout",
            ProxyError::Bind { .. } | ProxyError::ProxyUnavailable => "Server Error",
        }
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::MalformedTarget { .. } => "malformed_target",
            ProxyError::InvalidTarget { .. } => "invalid_target",
            ProxyError::Upstream(_) => "upstream_error",
            ProxyError::UpstreamStatus { .. } => "upstream_status",
            ProxyError::Body(_) => "response_error",
            ProxyError::Timeout(_) => "timeout",
            ProxyError::Bind { .. } => "bind",
            ProxyError::ProxyUnavailable => "unavailable",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.body()).into_response()
    }
}
