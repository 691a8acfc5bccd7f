//! End-to-end relay behaviour against stub upstreams.

use std::time::Duration;

use playlist_proxy::config::UpstreamConfig;
use playlist_proxy::upstream::UpstreamClient;
use playlist_proxy::ProxyError;
use reqwest::{header, Method, StatusCode};

mod common;

const PLAYLIST: &str = "#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:10.0,\nseg-001.ts\n";

fn assert_cors(response: &reqwest::Response) {
    let headers = response.headers();
    let origins: Vec<_> = headers
        .get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .iter()
        .collect();
    assert_eq!(origins, vec!["*"]);
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, HEAD, OPTIONS"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "*");
}

#[tokio::test]
async fn test_relays_playlist_with_inferred_content_type() {
    let backend =
        common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .get(common::encoded_url(&handle, &backend.url("/stream.m3u8")))
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::OK);
    assert_cors(&res);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert_eq!(
        res.headers()[header::CONTENT_LENGTH],
        PLAYLIST.len().to_string().as_str()
    );
    assert_eq!(res.bytes().await.unwrap(), PLAYLIST.as_bytes());

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with("get /stream.m3u8 http/1.1\r\n"));
}

#[tokio::test]
async fn test_content_type_fallback_by_extension() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], "bytes")).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;
    let client = common::client();

    for (path, expected) in [
        ("/live/seg-001.ts", "video/mp2t"),
        ("/live/key.bin", "application/octet-stream"),
        ("/live/index.m3u8", "application/vnd.apple.mpegurl"),
    ] {
        let res = client
            .get(common::encoded_url(&handle, &backend.url(path)))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], expected, "{path}");
    }
}

#[tokio::test]
async fn test_upstream_content_type_is_kept() {
    let backend = common::start_mock_backend(common::http_response(
        "200 OK",
        &[("Content-Type", "audio/x-mpegurl")],
        PLAYLIST,
    ))
    .await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .get(common::encoded_url(&handle, &backend.url("/list.m3u8")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.headers()[header::CONTENT_TYPE], "audio/x-mpegurl");
}

#[tokio::test]
async fn test_upstream_cors_is_replaced() {
    let backend = common::start_mock_backend(common::http_response(
        "200 OK",
        &[
            ("Access-Control-Allow-Origin", "https://only-me.example"),
            ("Access-Control-Allow-Methods", "POST"),
            ("Access-Control-Allow-Headers", "x-secret"),
            ("Set-Cookie", "session=1"),
        ],
        "ok",
    ))
    .await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .get(common::encoded_url(&handle, &backend.url("/a.ts")))
        .send()
        .await
        .unwrap();

    assert_cors(&res);
    assert!(res.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_not_found_is_forwarded_verbatim() {
    let backend =
        common::start_mock_backend(common::http_response("404 Not Found", &[], "not found")).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .get(common::encoded_url(&handle, &backend.url("/missing.m3u8")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_cors(&res);
    assert_eq!(res.text().await.unwrap(), "not found");
}

#[tokio::test]
async fn test_caller_headers_never_reach_upstream() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], "ok")).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .get(common::encoded_url(&handle, &backend.url("/a.m3u8")))
        .header(header::ORIGIN, "app://renderer.local")
        .header(header::REFERER, "app://renderer.local/player")
        .header(header::COOKIE, "token=secret")
        .header(header::USER_AGENT, "sandboxed-renderer")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let head = &backend.requests()[0];
    assert!(head.contains("origin: https://www.example.com\r\n"));
    assert!(head.contains("referer: https://www.example.com\r\n"));
    assert!(head.contains(
        "user-agent: mozilla/5.0 (macintosh; intel mac os x 10_15_7) applewebkit/537.36\r\n"
    ));
    assert!(head.contains("accept-language: zh-cn,zh;q=0.9\r\n"));
    assert!(head.contains("pragma: no-cache\r\n"));
    assert!(!head.contains("renderer.local"));
    assert!(!head.contains("cookie"));
    assert!(!head.contains("sandboxed-renderer"));
}

#[tokio::test]
async fn test_unencoded_target_keeps_its_query() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let upstream = backend.url("/live.m3u8?token=abc&exp=99");
    let res = common::client()
        .get(common::raw_url(&handle, &upstream))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert!(backend.requests()[0].starts_with("get /live.m3u8?token=abc&exp=99 http/1.1\r\n"));
}

#[tokio::test]
async fn test_issued_proxy_url_is_servable() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let (handle, registry) = common::start_proxy(Duration::from_secs(30)).await;

    let proxy_url = registry.issue_proxy_url(&backend.url("/index.m3u8")).await.unwrap();
    assert_eq!(
        proxy_url,
        format!(
            "http://127.0.0.1:{}/{}",
            handle.local_addr().port(),
            backend.url("/index.m3u8")
        )
    );

    let res = common::client().get(&proxy_url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), PLAYLIST);
}

#[tokio::test]
async fn test_options_is_answered_locally() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], "ok")).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .request(
            Method::OPTIONS,
            common::encoded_url(&handle, &backend.url("/a.m3u8")),
        )
        .header("Access-Control-Request-Method", "GET")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_cors(&res);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn test_head_relays_headers_only() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;

    let res = common::client()
        .head(common::encoded_url(&handle, &backend.url("/a.m3u8")))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_cors(&res);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "application/vnd.apple.mpegurl"
    );
    assert!(res.bytes().await.unwrap().is_empty());
    assert!(backend.requests()[0].starts_with("get /a.m3u8 "));
}

#[tokio::test]
async fn test_relays_are_released_after_completion() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let (handle, _registry) = common::start_proxy(Duration::from_secs(30)).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client
            .get(common::encoded_url(&handle, &backend.url("/a.m3u8")))
            .send()
            .await
            .unwrap();
        assert_eq!(res.bytes().await.unwrap(), PLAYLIST.as_bytes());
    }

    assert!(common::eventually(Duration::from_secs(2), || handle.active_relays() == 0).await);
}

#[tokio::test]
async fn test_fetch_playlist_returns_text_with_its_own_headers() {
    let backend = common::start_mock_backend(common::http_response("200 OK", &[], PLAYLIST)).await;
    let client = UpstreamClient::new(&UpstreamConfig::default());

    let text = client
        .fetch_playlist(&backend.url("/index.m3u8"))
        .await
        .unwrap();
    assert_eq!(text, PLAYLIST);

    let head = &backend.requests()[0];
    assert!(head.starts_with("get /index.m3u8 http/1.1\r\n"));
    assert!(head.contains("user-agent: mozilla/5.0 (windows nt 10.0; win64; x64) applewebkit/537.36\r\n"));
    assert!(head.contains("accept: */*\r\n"));
    assert!(head.contains("cache-control: no-cache\r\n"));
    assert!(head.contains("pragma: no-cache\r\n"));
    assert!(!head.contains("origin:"));
    assert!(!head.contains("referer:"));
}

#[tokio::test]
async fn test_fetch_playlist_reports_not_found() {
    let backend =
        common::start_mock_backend(common::http_response("404 Not Found", &[], "missing")).await;
    let client = UpstreamClient::new(&UpstreamConfig::default());

    let err = client
        .fetch_playlist(&backend.url("/gone.m3u8"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::UpstreamStatus { status: 404, .. }));
    assert_eq!(err.to_string(), "HTTP错误 (404): Not Found");
}
