/*
 * http2_integration.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * Integration test for the HTTP/2 client. Performs a real HTTPS GET to a
 * known h2-capable server and verifies the full cycle: ALPN, preface,
 * SETTINGS, HPACK, and stream-1 reassembly.
 *
 * Run with:
 *   cargo test -p grimaldello_core --test http2_integration -- --ignored --nocapture
 */

use grimaldello_core::http::h2;
use grimaldello_core::http::options::{Origin, Scheme, SendOptions};
use grimaldello_core::http::request::RequestPlan;

#[tokio::test]
#[ignore] // requires network
async fn get_over_h2() {
    let host = "cloudflare.com";
    let plan = RequestPlan::new()
        .method("GET")
        .path("/")
        .host(host)
        .port(443)
        .scheme(Scheme::Https)
        .header("user-agent", "grimaldello/0.1 (integration-test)")
        .header("accept", "*/*");
    let origin = Origin::https(host, 443);
    let opts = SendOptions {
        collect_timing: true,
        ..SendOptions::default()
    };

    println!("=== HTTP/2 Integration Test ===");
    println!("Connecting to {}:443...", host);

    let response = h2::send(&plan, &origin, &opts).await.expect("h2 request failed");

    println!("\n--- Response ---");
    println!("Status: {}", response.status_code);
    for (name, values) in &response.headers {
        for value in values {
            println!("{}: {}", name, value);
        }
    }
    println!("\nFrames: {}", response.frames.len());
    println!("Body length: {} bytes", response.body.len());
    if let Some(timing) = &response.timing {
        println!("ttfb: {}ms, total: {}ms", timing.ttfb, timing.total);
    }

    assert!(response.status_code > 0, "should decode :status");
    assert!(!response.frames.is_empty(), "should receive frames");
    assert!(!response.raw.is_empty());

    println!("\n=== PASS ===");
}

#[tokio::test]
#[ignore] // requires network
async fn raw_frames_preface_and_settings() {
    use bytes::BufMut;
    let host = "cloudflare.com";

    // Caller-crafted preface + empty SETTINGS frame, nothing else.
    let mut bytes = Vec::new();
    bytes.extend_from_slice(h2::PREFACE);
    bytes.put_u8(0);
    bytes.put_u8(0);
    bytes.put_u8(0); // length 0
    bytes.put_u8(0x4); // SETTINGS
    bytes.put_u8(0);
    bytes.put_u32(0);

    let opts = SendOptions {
        timeout_ms: 10_000,
        ..SendOptions::default()
    };
    let result = h2::send_raw_frames(host, 443, &bytes, &opts)
        .await
        .expect("raw frame exchange failed");
    println!("received {} frames", result.frames.len());
    // the peer answers the preface with its own SETTINGS
    assert!(result
        .frames
        .iter()
        .any(|f| f.frame_type == 0x4));
}
