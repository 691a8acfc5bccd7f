//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Parse the decoded target into a dispatchable URI
//! - Issue a single GET with the fixed outbound header table
//! - Fetch playlist text directly, with its own smaller header table
//! - Pick the plain or TLS client stack by the resolved transport
//! - Enforce the request deadline
//!
//! # Design Decisions
//! - No retries, no caching
//! - The deadline runs from request start to the first body frame; the relay
//!   shares it through [`Deadline`]
//! - Expiry drops the in-flight future, which aborts the upstream connection

use std::future::Future;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::time::Instant;
use url::Url;

use crate::config::UpstreamConfig;
use crate::error::ProxyError;
use crate::http::headers::{outbound_headers, playlist_fetch_headers};
use crate::routing::{Transport, UpstreamTarget};

/// Point in time by which the upstream must have answered.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Run `fut` until the deadline; expiry drops it and yields `Timeout`.
    pub async fn run<F: Future>(self, fut: F) -> Result<F::Output, ProxyError> {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| ProxyError::Timeout(self.budget))
    }
}

/// Client for both transports, cheap to clone.
#[derive(Clone)]
pub struct UpstreamClient {
    plain: Client<HttpConnector, Body>,
    encrypted: Client<HttpsConnector<HttpConnector>, Body>,
    timeout: Duration,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Self {
        let plain = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_only()
            .enable_http1()
            .build();
        let encrypted = Client::builder(TokioExecutor::new()).build(https_connector);

        Self {
            plain,
            encrypted,
            timeout: config.timeout(),
        }
    }

    /// A fresh deadline for one request.
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.timeout)
    }

    /// Fetch `target`, waiting at most the configured timeout for headers.
    pub async fn fetch(&self, target: &UpstreamTarget) -> Result<Response<Incoming>, ProxyError> {
        self.fetch_until(target, self.deadline()).await
    }

    /// Fetch `target`, waiting for headers until `deadline`.
    pub async fn fetch_until(
        &self,
        target: &UpstreamTarget,
        deadline: Deadline,
    ) -> Result<Response<Incoming>, ProxyError> {
        let request = build_request(target, outbound_headers())?;
        deadline.run(self.dispatch(target, request)).await?
    }

    /// Fetch the text of the playlist at `url`, which is used as given.
    ///
    /// The deadline covers the whole exchange, body included. A non-2xx
    /// status is an error carrying the status code and reason phrase.
    pub async fn fetch_playlist(&self, url: &str) -> Result<String, ProxyError> {
        let target = UpstreamTarget::direct(url);
        let request = build_request(&target, playlist_fetch_headers())?;

        let result = self
            .deadline()
            .run(self.read_playlist(&target, request))
            .await
            .and_then(std::convert::identity);

        if let Err(e) = &result {
            tracing::warn!(target_url = %url, error = %e, "Playlist fetch failed");
        }
        result
    }

    async fn read_playlist(
        &self,
        target: &UpstreamTarget,
        request: Request<Body>,
    ) -> Result<String, ProxyError> {
        let response = self.dispatch(target, request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus {
                status: status.as_u16(),
                reason: reason_phrase(&response),
            });
        }

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(ProxyError::Body)?
            .to_bytes();
        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    async fn dispatch(
        &self,
        target: &UpstreamTarget,
        request: Request<Body>,
    ) -> Result<Response<Incoming>, ProxyError> {
        let pending = match target.transport() {
            Transport::Plain => self.plain.request(request),
            Transport::Encrypted => self.encrypted.request(request),
        };
        pending.await.map_err(ProxyError::Upstream)
    }
}

/// The reason phrase as sent, or the canonical one for the status.
fn reason_phrase(response: &Response<Incoming>) -> String {
    match response.extensions().get::<hyper::ext::ReasonPhrase>() {
        Some(reason) => String::from_utf8_lossy(reason.as_bytes()).into_owned(),
        None => response
            .status()
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Build the outbound GET for `target`, carrying exactly `headers`.
pub fn build_request(
    target: &UpstreamTarget,
    headers: HeaderMap,
) -> Result<Request<Body>, ProxyError> {
    let invalid = |reason: String| ProxyError::InvalidTarget {
        url: target.url().to_string(),
        reason,
    };

    let mut url = Url::parse(target.url()).map_err(|e| invalid(e.to_string()))?;
    let transport = target.transport();
    if url.scheme() != transport.scheme() {
        return Err(invalid(format!(
            "scheme {:?} is not carried by the {transport} transport",
            url.scheme()
        )));
    }
    url.set_fragment(None);

    let uri = Uri::try_from(url.as_str()).map_err(|e| invalid(e.to_string()))?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .map_err(|e| invalid(e.to_string()))?;
    *request.headers_mut() = headers;

    Ok(request)
}
