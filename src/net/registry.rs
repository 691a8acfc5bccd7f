//! Port registry: the write-once home of the proxy's bound port.
//!
//! # Responsibilities
//! - Hold the port assigned to the loopback listener
//! - Let URL issuance wait until the port is known
//! - Build proxy URLs for the GUI/IPC boundary
//!
//! # Design Decisions
//! - Write-once by construction: [`PortPublisher::publish`] consumes the
//!   publisher, so the port cannot be rebound or mutated afterwards
//! - Readers are cheap clones sharing one watch channel
//! - A publisher dropped without publishing (bind failure) wakes every waiter
//!   with [`ProxyError::ProxyUnavailable`]

use std::net::Ipv4Addr;

use tokio::sync::watch;

use crate::error::ProxyError;

/// Address every proxy URL points at.
pub const LOOPBACK: Ipv4Addr = Ipv4Addr::LOCALHOST;

/// The single writer of the proxy port. Owned by the listener.
#[derive(Debug)]
pub struct PortPublisher {
    tx: watch::Sender<Option<u16>>,
}

impl PortPublisher {
    /// Publish the bound port. Consumes the publisher.
    pub fn publish(self, port: u16) {
        self.tx.send_replace(Some(port));
        tracing::debug!(port, "Proxy port published");
    }
}

/// Read side of the proxy port, injected into URL issuance.
#[derive(Debug, Clone)]
pub struct PortRegistry {
    rx: watch::Receiver<Option<u16>>,
}

impl PortRegistry {
    /// Create an unpublished registry and its publisher.
    pub fn new() -> (PortPublisher, PortRegistry) {
        let (tx, rx) = watch::channel(None);
        (PortPublisher { tx }, PortRegistry { rx })
    }

    /// The published port, if any. Never blocks.
    pub fn port(&self) -> Option<u16> {
        *self.rx.borrow()
    }

    /// Wait until the port is published.
    pub async fn wait(&self) -> Result<u16, ProxyError> {
        let mut rx = self.rx.clone();
        let port = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ProxyError::ProxyUnavailable)?;
        (*port).ok_or(ProxyError::ProxyUnavailable)
    }

    /// Proxy URL for `original`, waiting for the port if necessary.
    ///
    /// `original` is embedded as-is; callers encode characters that are
    /// unsafe in a URL path.
    pub async fn issue_proxy_url(&self, original: &str) -> Result<String, ProxyError> {
        let port = self.wait().await?;
        Ok(proxy_url(port, original))
    }

    /// Proxy URL for `original`, or `None` while the port is unpublished.
    pub fn try_issue_proxy_url(&self, original: &str) -> Option<String> {
        self.port().map(|port| proxy_url(port, original))
    }
}

fn proxy_url(port: u16, original: &str) -> String {
    format!("http://{LOOPBACK}:{port}/{original}")
}
