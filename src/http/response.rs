//! Response relay.
//!
//! # Responsibilities
//! - Forward the upstream status unchanged
//! - Replace upstream headers with the inbound header set
//! - Stream the upstream body frame by frame to the caller
//!
//! # Design Decisions
//! - The first body frame is awaited (under the request deadline) before
//!   headers are committed, so a body that fails immediately still gets a
//!   proper 500
//! - Once headers are out, an upstream error is handed to hyper, which aborts
//!   the inbound connection; no second status line is ever written
//! - hyper polls [`RelayBody`] only when the inbound socket accepts more
//!   bytes, so the upstream is never read faster than the caller drains it
//! - Dropping the body (caller went away) drops the upstream `Incoming`,
//!   closing the outbound connection

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use axum::body::{Body, Bytes};
use axum::http::Response;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use hyper::body::Incoming;

use crate::error::ProxyError;
use crate::http::headers::inbound_headers;
use crate::net::RelayGuard;
use crate::observability::metrics;
use crate::routing::UpstreamTarget;
use crate::upstream::Deadline;

/// Turn an upstream response into the response for the caller.
pub async fn relay(
    upstream: Response<Incoming>,
    target: &UpstreamTarget,
    deadline: Deadline,
    guard: RelayGuard,
) -> Result<Response<Body>, ProxyError> {
    let (parts, mut body) = upstream.into_parts();

    let first = match deadline.run(body.frame()).await? {
        Some(Ok(frame)) => Some(frame),
        Some(Err(e)) => return Err(ProxyError::Body(e)),
        None => None,
    };
    let finished = first.is_none();

    let relay_body = RelayBody {
        pending: first,
        upstream: body,
        finished,
        target_url: target.url().to_string(),
        guard,
    };

    let mut response = Response::new(Body::new(relay_body));
    *response.status_mut() = parts.status;
    *response.headers_mut() = inbound_headers(&parts.headers, target);

    Ok(response)
}

/// Upstream body with its first frame already read.
pub struct RelayBody {
    pending: Option<Frame<Bytes>>,
    upstream: Incoming,
    finished: bool,
    target_url: String,
    guard: RelayGuard,
}

impl HttpBody for RelayBody {
    type Data = Bytes;
    type Error = hyper::Error;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = &mut *self;

        if let Some(frame) = this.pending.take() {
            return Poll::Ready(Some(Ok(frame)));
        }
        if this.finished {
            return Poll::Ready(None);
        }

        match ready!(Pin::new(&mut this.upstream).poll_frame(cx)) {
            Some(Ok(frame)) => Poll::Ready(Some(Ok(frame))),
            Some(Err(e)) => {
                this.finished = true;
                tracing::warn!(
                    relay_id = %this.guard.id(),
                    target_url = %this.target_url,
                    error = %e,
                    "Upstream body failed mid-relay, aborting inbound connection"
                );
                metrics::record_relay_abort();
                Poll::Ready(Some(Err(e)))
            }
            None => {
                this.finished = true;
                tracing::debug!(
                    relay_id = %this.guard.id(),
                    target_url = %this.target_url,
                    "Relay complete"
                );
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.pending.is_none() && (self.finished || self.upstream.is_end_stream())
    }

    fn size_hint(&self) -> SizeHint {
        let buffered = self
            .pending
            .as_ref()
            .and_then(Frame::data_ref)
            .map_or(0, |data| data.len() as u64);
        if self.finished {
            return SizeHint::with_exact(buffered);
        }
        match self.upstream.size_hint().exact() {
            Some(rest) => SizeHint::with_exact(rest + buffered),
            None => SizeHint::default(),
        }
    }
}
