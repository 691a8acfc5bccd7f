//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with the single proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Drive each request through resolve → fetch → relay
//! - Map every failure to its fixed status and body
//!
//! # Request States
//! ```text
//! ACCEPTED → RESOLVING → DISPATCHED → RELAYING → DONE
//!                │            │           │
//!                └────────────┴───────────┴──→ FAILED (500 / 504 / aborted)
//! ```

use std::time::Instant;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::headers::preflight_headers;
use crate::http::response;
use crate::net::{RelayGuard, RelayTracker};
use crate::observability::metrics;
use crate::routing::target;
use crate::upstream::UpstreamClient;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: UpstreamClient,
    pub relays: RelayTracker,
}

/// HTTP server for the forwarding proxy.
pub struct ProxyServer {
    router: Router,
    relays: RelayTracker,
}

impl ProxyServer {
    /// Create a new server with the given configuration.
    pub fn new(config: &ProxyConfig) -> Self {
        let relays = RelayTracker::new();
        let state = AppState {
            client: UpstreamClient::new(&config.upstream),
            relays: relays.clone(),
        };

        Self {
            router: Self::build_router(state),
            relays,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*target}", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Tracker of in-flight relays served by this server.
    pub fn relays(&self) -> RelayTracker {
        self.relays.clone()
    }

    /// Serve connections until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining relays");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Proxy handler. Every method except OPTIONS is relayed as an upstream GET.
async fn proxy_handler(State(state): State<AppState>, method: Method, uri: Uri) -> Response {
    if method == Method::OPTIONS {
        return (StatusCode::NO_CONTENT, preflight_headers()).into_response();
    }

    let start = Instant::now();
    let guard = state.relays.track();
    let relay_id = guard.id();
    let raw = target::strip_separator(uri.path_and_query().map_or("/", |pq| pq.as_str()));

    tracing::debug!(relay_id = %relay_id, method = %method, raw_target = %raw, "Proxying request");

    match forward(&state, raw, guard).await {
        Ok(response) => {
            metrics::record_request(response.status().as_u16(), "relayed", start);
            response
        }
        Err(e) => {
            match &e {
                ProxyError::Timeout(budget) => tracing::error!(
                    relay_id = %relay_id,
                    raw_target = %raw,
                    timeout_ms = budget.as_millis() as u64,
                    "Request timeout"
                ),
                _ => tracing::error!(
                    relay_id = %relay_id,
                    raw_target = %raw,
                    error = ?e,
                    "{}",
                    e.body()
                ),
            }
            metrics::record_request(e.status().as_u16(), e.kind(), start);
            e.into_response()
        }
    }
}

/// RESOLVING → DISPATCHED → RELAYING.
async fn forward(
    state: &AppState,
    raw: &str,
    guard: RelayGuard,
) -> Result<Response, ProxyError> {
    let upstream_target = target::resolve(raw)?;

    let deadline = state.client.deadline();
    let upstream = state.client.fetch_until(&upstream_target, deadline).await?;

    tracing::debug!(
        relay_id = %guard.id(),
        target_url = %upstream_target.url(),
        transport = %upstream_target.transport(),
        status = upstream.status().as_u16(),
        "Upstream responded"
    );

    response::relay(upstream, &upstream_target, deadline, guard).await
}
