//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use playlist_proxy::{start, PortRegistry, ProxyConfig, ProxyHandle};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A stub upstream on an ephemeral loopback port.
pub struct Backend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Backend {
    /// `http://<addr><path>`
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request heads received so far, lowercased.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Start a programmable backend. `f` receives the request head and owns the
/// socket for the rest of the exchange.
pub async fn start_programmable_backend<F, Fut>(f: F) -> Backend
where
    F: Fn(String, TcpStream) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let seen = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let seen = seen.clone();
                    tokio::spawn(async move {
                        let Some(head) = read_head(&mut socket).await else {
                            return;
                        };
                        seen.lock().unwrap().push(head.to_ascii_lowercase());
                        f(head, socket).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    Backend { addr, requests }
}

/// Start a backend that answers every request with the same raw response.
pub async fn start_mock_backend(response: String) -> Backend {
    start_programmable_backend(move |_, mut socket| {
        let response = response.clone();
        async move {
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    })
    .await
}

/// A complete HTTP/1.1 response with a content length.
pub fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n{}",
        body.len(),
        body
    ));
    response
}

async fn read_head(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}

/// Start the proxy with the given upstream timeout.
pub async fn start_proxy(timeout: Duration) -> (ProxyHandle, PortRegistry) {
    let mut config = ProxyConfig::default();
    config.upstream.timeout_ms = timeout.as_millis() as u64;

    let (publisher, registry) = PortRegistry::new();
    let handle = start(&config, publisher).await.unwrap();
    (handle, registry)
}

/// Proxy URL carrying `upstream` fully percent-encoded.
pub fn encoded_url(handle: &ProxyHandle, upstream: &str) -> String {
    format!(
        "http://{}/{}",
        handle.local_addr(),
        utf8_percent_encode(upstream, NON_ALPHANUMERIC)
    )
}

/// Proxy URL carrying `raw` verbatim in the path.
pub fn raw_url(handle: &ProxyHandle, raw: &str) -> String {
    format!("http://{}/{}", handle.local_addr(), raw)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Poll `check` every 20ms until it holds or `within` elapses.
pub async fn eventually<F: Fn() -> bool>(within: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
