//! Header policy for both directions of the relay.
//!
//! # Responsibilities
//! - Provide the fixed outbound header table sent to every upstream
//! - Provide the smaller table used when a playlist is fetched directly
//! - Build the inbound header set: CORS triad, content type, content length
//! - Derive a content type from the target's file extension
//!
//! # Design Decisions
//! - Outbound headers fully replace the caller's; Origin/Referer from the
//!   sandboxed renderer never reach the upstream
//! - Inbound headers are built from scratch; only `content-type` and
//!   `content-length` are taken from the upstream, so upstream CORS values
//!   can never override ours
//! - Pure functions, no I/O

use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};

use crate::routing::UpstreamTarget;

pub const MPEGURL: &str = "application/vnd.apple.mpegurl";
pub const MP2T: &str = "video/mp2t";
pub const OCTET_STREAM: &str = "application/octet-stream";

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, OPTIONS";
pub const ALLOW_HEADERS: &str = "*";

static OUTBOUND: [(HeaderName, &str); 9] = [
    (
        header::USER_AGENT,
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    ),
    (header::ACCEPT, "*/*"),
    (header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9"),
    (header::ACCEPT_ENCODING, "gzip, deflate, br"),
    (header::ORIGIN, "https://www.example.com"),
    (header::REFERER, "https://www.example.com"),
    (header::CONNECTION, "keep-alive"),
    (header::PRAGMA, "no-cache"),
    (header::CACHE_CONTROL, "no-cache"),
];

/// Headers sent on every upstream request.
pub fn outbound_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(OUTBOUND.len());
    for (name, value) in OUTBOUND.iter() {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }
    headers
}

static PLAYLIST_FETCH: [(HeaderName, &str); 4] = [
    (
        header::USER_AGENT,
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    ),
    (header::ACCEPT, "*/*"),
    (header::CACHE_CONTROL, "no-cache"),
    (header::PRAGMA, "no-cache"),
];

/// Headers sent when playlist text is fetched directly, outside the relay.
pub fn playlist_fetch_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(PLAYLIST_FETCH.len());
    for (name, value) in PLAYLIST_FETCH.iter() {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }
    headers
}

/// The CORS triad, as sent on every inbound response.
pub fn preflight_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(5);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers
}

/// Headers written to the caller for a relayed upstream response.
pub fn inbound_headers(upstream: &HeaderMap, target: &UpstreamTarget) -> HeaderMap {
    let mut headers = preflight_headers();

    // An empty upstream value counts as absent.
    let content_type = upstream
        .get(header::CONTENT_TYPE)
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(content_type_for(target.url())));
    headers.insert(header::CONTENT_TYPE, content_type);

    if let Some(length) = upstream.get(header::CONTENT_LENGTH) {
        headers.insert(header::CONTENT_LENGTH, length.clone());
    }

    headers
}

/// Fallback content type from the extension of the URL path.
pub fn content_type_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    if path.ends_with(".m3u8") {
        MPEGURL
    } else if path.ends_with(".ts") {
        MP2T
    } else {
        OCTET_STREAM
    }
}
