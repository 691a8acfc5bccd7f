//! Target resolution.
//!
//! # Responsibilities
//! - Strip the leading separator from the inbound path-and-query
//! - Percent-decode the remainder exactly once
//! - Select the outbound transport from the raw (undecoded) prefix
//!
//! # Design Decisions
//! - Transport selection reads the raw input, not the decoded URL. An input
//!   such as `%68ttps%3A%2F%2F...` decodes to an `https` URL but selects the
//!   plain transport; dispatch then rejects the mismatch.
//! - No URL validation happens here; the upstream client parses at dispatch.

use std::fmt;

use percent_encoding::percent_decode_str;

use crate::error::ProxyError;

/// Raw prefix that selects the encrypted transport.
pub const ENCRYPTED_PREFIX: &str = "https";

/// Client stack used for the outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    /// Plain TCP (`http`).
    Plain,
    /// TLS (`https`).
    Encrypted,
}

impl Transport {
    /// URL scheme this transport is able to carry.
    pub fn scheme(self) -> &'static str {
        match self {
            Transport::Plain => "http",
            Transport::Encrypted => "https",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Plain => f.write_str("plain"),
            Transport::Encrypted => f.write_str("encrypted"),
        }
    }
}

/// A decoded upstream URL and the transport chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    url: String,
    transport: Transport,
}

impl UpstreamTarget {
    /// A target for a URL that is already in its final form, with no
    /// percent-decoding applied.
    pub fn direct(url: impl Into<String>) -> Self {
        let url = url.into();
        let transport = transport_for(&url);
        Self { url, transport }
    }

    /// The decoded upstream URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }
}

/// Strip the single leading `/` of an inbound path-and-query.
pub fn strip_separator(path_and_query: &str) -> &str {
    path_and_query.strip_prefix('/').unwrap_or(path_and_query)
}

/// Resolve a raw target (leading separator already stripped).
pub fn resolve(raw: &str) -> Result<UpstreamTarget, ProxyError> {
    check_escapes(raw)?;

    let url = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| ProxyError::MalformedTarget {
            raw: raw.to_string(),
            reason: "decoded target is not valid UTF-8",
        })?
        .into_owned();

    Ok(UpstreamTarget {
        url,
        transport: transport_for(raw),
    })
}

fn transport_for(prefix_source: &str) -> Transport {
    if prefix_source.starts_with(ENCRYPTED_PREFIX) {
        Transport::Encrypted
    } else {
        Transport::Plain
    }
}

/// Every `%` must introduce exactly two hex digits.
fn check_escapes(raw: &str) -> Result<(), ProxyError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            return Err(ProxyError::MalformedTarget {
                raw: raw.to_string(),
                reason: "invalid percent escape",
            });
        }
        i += 3;
    }
    Ok(())
}
