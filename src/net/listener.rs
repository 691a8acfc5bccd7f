//! Loopback listener.
//!
//! # Responsibilities
//! - Bind an OS-assigned ephemeral port on 127.0.0.1
//! - Publish the assigned port before any proxy URL can be issued
//!
//! # Design Decisions
//! - Never binds a non-loopback address
//! - No connection limit beyond the kernel backlog

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::error::ProxyError;
use crate::net::registry::{PortPublisher, LOOPBACK};

/// A bound loopback listener whose port has been published.
#[derive(Debug)]
pub struct LoopbackListener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl LoopbackListener {
    /// Bind `127.0.0.1:0` and publish the assigned port.
    ///
    /// On failure the publisher is dropped unpublished, which wakes URL
    /// issuance waiters with an error.
    pub async fn bind(publisher: PortPublisher) -> Result<Self, ProxyError> {
        let addr = SocketAddr::from((LOOPBACK, 0));

        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let local_addr = inner
            .local_addr()
            .map_err(|source| ProxyError::Bind { addr, source })?;

        publisher.publish(local_addr.port());

        tracing::info!(address = %local_addr, "Proxy listener bound");

        Ok(Self { inner, local_addr })
    }

    /// The bound address; its port is the published proxy port.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn into_inner(self) -> TcpListener {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::registry::PortRegistry;

    #[tokio::test]
    async fn binds_ephemeral_loopback_port_and_publishes_it() {
        let (publisher, registry) = PortRegistry::new();
        let listener = LoopbackListener::bind(publisher).await.unwrap();

        let addr = listener.local_addr();
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert_eq!(registry.port(), Some(addr.port()));
    }
}
