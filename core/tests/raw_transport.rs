/*
 * raw_transport.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration tests for the raw HTTP/1.x transport: single sends,
 * byte-exact malformed requests on the wire, pipelined framing,
 * keep-alive pooling, CONNECT tunneling, timing, and timeouts. All
 * against loopback listeners; no external network.
 *
 * Run with:
 *   cargo test -p grimaldello_core --test raw_transport
 */

use grimaldello_core::http::h1::RawClient;
use grimaldello_core::http::options::{
    Origin, ProxyAuth, ProxyConfig, ProxyProtocol, Scheme, SendOptions,
};
use grimaldello_core::http::recipes;
use grimaldello_core::http::request::{LineEnding, Malformation, RequestPlan};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

async fn read_request(stream: &mut TcpStream) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = stream.read(&mut tmp).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    buf
}

/// One-connection server: captures the request, writes `response`, closes.
async fn canned_server(response: &'static [u8]) -> (u16, tokio::sync::oneshot::Receiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let request = read_request(&mut stream).await;
        let _ = tx.send(request);
        stream.write_all(response).await.unwrap();
        stream.shutdown().await.unwrap();
    });
    (port, rx)
}

#[tokio::test]
async fn single_send_parses_response() {
    let (port, _rx) =
        canned_server(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nHello")
            .await;
    let client = RawClient::new();
    let plan = RequestPlan::new()
        .host("127.0.0.1")
        .port(port)
        .header("Host", "127.0.0.1");
    let response = client
        .send_plan(&plan, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, b"Hello");
    assert_eq!(response.get_first_header("content-type"), Some("text/plain"));
    assert!(response.is_success());
}

#[tokio::test]
async fn malformed_bytes_hit_the_wire_unmodified() {
    let (port, rx) = canned_server(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
    let client = RawClient::new();
    let plan = RequestPlan::new()
        .host("127.0.0.1")
        .port(port)
        .separator("\t")
        .line_ending(LineEnding::Crlf)
        .header("Host", "127.0.0.1")
        .malformed_header(Malformation::NullByte, "X-Odd", "v")
        .raw_header(&b"Bare-Raw : exact"[..]);
    let expected = plan.build();
    let response = client
        .send_plan(&plan, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(response.status_code, 400);
    let seen = rx.await.unwrap();
    assert_eq!(seen, expected);
    let needle: &[u8] = b"X-Odd: v\0injected";
    assert!(seen.windows(needle.len()).any(|w| w == needle));
    assert!(seen.starts_with(b"GET\t/\tHTTP/1.1\r\n"));
}

#[tokio::test]
async fn pipelined_split_returns_one_response_per_request() {
    let reply: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nfirst\
HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n6\r\nsecond\r\n0\r\n\r\n\
HTTP/1.1 304 Not Modified\r\nETag: z\r\n\r\n";
    let (port, _rx) = canned_server(reply).await;
    let client = RawClient::new();
    let plans = recipes::pipelined_probe("127.0.0.1", &["/a", "/b", "/c"]);
    let origin = Origin::http("127.0.0.1", port);
    let responses = client
        .send_pipelined_plans(&plans, &origin, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0].body, b"first");
    assert_eq!(responses[1].body, b"6\r\nsecond\r\n0\r\n\r\n");
    assert_eq!(responses[2].status_code, 304);
}

#[tokio::test]
async fn keep_alive_reuses_pooled_connection() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        for _ in 0..2 {
            let _ = read_request(&mut stream).await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok")
                .await
                .unwrap();
        }
    });

    let client = RawClient::new();
    let opts = SendOptions {
        keep_alive: true,
        ..SendOptions::default()
    };
    let plan = RequestPlan::new()
        .host("127.0.0.1")
        .port(port)
        .header("Host", "127.0.0.1")
        .ensure_connection_header(true);
    let first = client.send_plan(&plan, &opts).await.unwrap();
    assert_eq!(first.body, b"ok");
    let second = client.send_plan(&plan, &opts).await.unwrap();
    assert_eq!(second.body, b"ok");
    // both sends went through the single pooled socket
    let stats = client.pool().stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.idle, 1);
}

#[tokio::test]
async fn timeout_message_is_stable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (_stream, _) = listener.accept().await.unwrap();
        // hold the socket open without answering
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
    });
    let client = RawClient::new();
    let opts = SendOptions {
        timeout_ms: 200,
        ..SendOptions::default()
    };
    let err = client
        .send(b"GET / HTTP/1.1\r\n\r\n", &Origin::http("127.0.0.1", port), &opts)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Connection timeout after 200ms");
}

#[tokio::test]
async fn collect_timing_populates_marks() {
    let (port, _rx) = canned_server(b"HTTP/1.1 204 No Content\r\n\r\n").await;
    let client = RawClient::new();
    let opts = SendOptions {
        collect_timing: true,
        ..SendOptions::default()
    };
    let response = client
        .send(b"GET / HTTP/1.1\r\n\r\n", &Origin::http("127.0.0.1", port), &opts)
        .await
        .unwrap();
    let timing = response.timing.expect("timing requested");
    assert!(timing.ttfb <= timing.total);
    assert!(timing.connection <= timing.total);
    assert!(timing.end >= timing.start);
}

/// CONNECT proxy that grants the tunnel and then answers the tunneled
/// request itself.
async fn connect_proxy(grant: &'static [u8], tunneled: Option<&'static [u8]>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let connect_req = read_request(&mut stream).await;
        assert!(connect_req.starts_with(b"CONNECT "));
        stream.write_all(grant).await.unwrap();
        if let Some(reply) = tunneled {
            let _ = read_request(&mut stream).await;
            stream.write_all(reply).await.unwrap();
        }
        stream.shutdown().await.unwrap();
    });
    port
}

fn proxy_opts(port: u16, auth: Option<ProxyAuth>) -> SendOptions {
    SendOptions {
        proxy: Some(ProxyConfig {
            host: "127.0.0.1".to_string(),
            port,
            protocol: ProxyProtocol::Http,
            auth,
        }),
        ..SendOptions::default()
    }
}

#[tokio::test]
async fn connect_tunnel_forwards_request() {
    let proxy_port = connect_proxy(
        b"HTTP/1.1 200 Connection Established\r\n\r\n",
        Some(b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\ntunneled"),
    )
    .await;
    let client = RawClient::new();
    let response = client
        .send(
            b"GET / HTTP/1.1\r\nHost: upstream.example\r\n\r\n",
            &Origin::http("upstream.example", 8080),
            &proxy_opts(proxy_port, None),
        )
        .await
        .unwrap();
    assert_eq!(response.body, b"tunneled");
}

#[tokio::test]
async fn https_through_proxy_not_supported() {
    let proxy_port = connect_proxy(b"HTTP/1.1 200 Connection Established\r\n\r\n", None).await;
    let client = RawClient::new();
    let err = client
        .send(
            b"GET / HTTP/1.1\r\n\r\n",
            &Origin::https("upstream.example", 443),
            &proxy_opts(proxy_port, None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "HTTPS through an HTTP proxy is not supported");
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[tokio::test]
async fn proxy_auth_required_error() {
    let proxy_port = connect_proxy(b"HTTP/1.1 407 Proxy Authentication Required\r\n\r\n", None).await;
    let client = RawClient::new();
    let err = client
        .send(
            b"GET / HTTP/1.1\r\n\r\n",
            &Origin::http("upstream.example", 80),
            &proxy_opts(proxy_port, None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Proxy authentication required");
}

#[tokio::test]
async fn proxy_connect_refused_reports_first_line() {
    let proxy_port = connect_proxy(b"HTTP/1.1 403 Forbidden\r\n\r\n", None).await;
    let client = RawClient::new();
    let err = client
        .send(
            b"GET / HTTP/1.1\r\n\r\n",
            &Origin::http("upstream.example", 80),
            &proxy_opts(proxy_port, None),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Proxy CONNECT failed: HTTP/1.1 403 Forbidden");
}

#[tokio::test]
async fn proxy_authorization_header_sent() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let connect_req = read_request(&mut stream).await;
        let _ = tx.send(connect_req);
        stream
            .write_all(b"HTTP/1.1 200 Connection Established\r\n\r\n")
            .await
            .unwrap();
        let _ = read_request(&mut stream).await;
        stream
            .write_all(b"HTTP/1.1 204 No Content\r\n\r\n")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
    });
    let client = RawClient::new();
    let auth = ProxyAuth {
        username: "user".to_string(),
        password: "pass".to_string(),
    };
    client
        .send(
            b"GET / HTTP/1.1\r\n\r\n",
            &Origin::http("upstream.example", 80),
            &proxy_opts(port, Some(auth)),
        )
        .await
        .unwrap();
    let connect_req = String::from_utf8(rx.await.unwrap()).unwrap();
    // base64("user:pass")
    assert!(connect_req.contains("Proxy-Authorization: Basic dXNlcjpwYXNz"));
    assert!(connect_req.contains("CONNECT upstream.example:80 HTTP/1.1"));
}

#[tokio::test]
async fn socks_proxy_rejected() {
    let client = RawClient::new();
    let opts = SendOptions {
        proxy: Some(ProxyConfig {
            host: "127.0.0.1".to_string(),
            port: 1080,
            protocol: ProxyProtocol::Socks5,
            auth: None,
        }),
        ..SendOptions::default()
    };
    let err = client
        .send(b"GET / HTTP/1.1\r\n\r\n", &Origin::http("x", 80), &opts)
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("SOCKS proxy support not yet implemented"));
    assert_eq!(err.kind(), std::io::ErrorKind::Unsupported);
}

#[tokio::test]
async fn raw_bytes_http09_style() {
    // HTTP/0.9 has no blank line, so read just the request line.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut tmp = [0u8; 256];
        while !buf.ends_with(b"\r\n") {
            let n = stream.read(&mut tmp).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&tmp[..n]);
        }
        let _ = tx.send(buf);
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        stream.shutdown().await.unwrap();
    });

    let client = RawClient::new();
    let bytes = recipes::http09_request("/legacy");
    let response = client
        .send_raw_bytes("127.0.0.1", port, Scheme::Http, &bytes, &SendOptions::default())
        .await
        .unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(rx.await.unwrap(), b"GET /legacy\r\n");
}
