//! Startup orchestration.
//!
//! # Responsibilities
//! - Bind the loopback listener and publish its port
//! - Build the server and spawn its accept loop
//! - Hand back a [`ProxyHandle`] for diagnostics and shutdown
//!
//! # Design Decisions
//! - Bind failure is returned, never panics: the embedding application keeps
//!   running without proxied playback
//! - The caller owns the [`PortRegistry`]; the publisher is injected here so
//!   URL issuance can be wired up before the listener exists

use std::net::SocketAddr;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::ProxyServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{LoopbackListener, PortPublisher, RelayTracker};

/// A running proxy. Dropping the handle also stops accepting connections.
#[derive(Debug)]
pub struct ProxyHandle {
    local_addr: SocketAddr,
    relays: RelayTracker,
    shutdown: Shutdown,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ProxyHandle {
    /// Address the proxy is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Requests accepted but not yet fully relayed.
    pub fn active_relays(&self) -> u64 {
        self.relays.active()
    }

    /// Stop accepting connections and wait up to `grace` for in-flight relays.
    ///
    /// Returns `true` if the server drained within `grace`.
    pub async fn shutdown(self, grace: Duration) -> bool {
        self.shutdown.trigger();
        match tokio::time::timeout(grace, self.task).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                tracing::error!(error = %e, "Proxy server exited with error");
                true
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Proxy server task failed");
                true
            }
            Err(_) => {
                tracing::warn!(
                    active_relays = self.relays.active(),
                    "Relays still in flight after shutdown grace period"
                );
                false
            }
        }
    }
}

/// Bind, publish and start serving.
pub async fn start(config: &ProxyConfig, publisher: PortPublisher) -> Result<ProxyHandle, ProxyError> {
    let listener = match LoopbackListener::bind(publisher).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, "Proxy listener unavailable, proxied playback disabled");
            return Err(e);
        }
    };
    let local_addr = listener.local_addr();

    let server = ProxyServer::new(config);
    let relays = server.relays();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let task = tokio::spawn(async move { server.run(listener.into_inner(), server_shutdown).await });

    tracing::info!(
        address = %local_addr,
        timeout_ms = config.upstream.timeout_ms,
        "Proxy started"
    );

    Ok(ProxyHandle {
        local_addr,
        relays,
        shutdown,
        task,
    })
}
