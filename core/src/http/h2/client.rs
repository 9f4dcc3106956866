/*
 * client.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Grimaldello, a raw HTTP security-testing toolkit.
 *
 * Grimaldello is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Grimaldello is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Grimaldello.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP/2 client over TLS (ALPN `h2`): preface, SETTINGS, a HEADERS
//! frame on stream 1 with an HPACK block built from the request plan,
//! an optional DATA frame, then reassembly of the stream-1 response
//! from inbound frames. A raw mode writes caller frame bytes verbatim,
//! caller-crafted preface included.

use bytes::BytesMut;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::h2::frame::*;
use crate::http::h2::parser::{decode_data_payload, decode_headers_payload, parse_frame};
use crate::http::h2::writer::FrameWriter;
use crate::http::hpack::{Decoder, Encoder};
use crate::http::options::{Origin, SendOptions, Timing, TimingCapture};
use crate::http::request::RequestPlan;
use crate::http::response::push_header;
use crate::net::{connect_tls, HttpStream};

const DEFAULT_MAX_CONCURRENT_STREAMS: u32 = 100;
const DEFAULT_INITIAL_WINDOW_SIZE: u32 = 65535;
const REQUEST_STREAM_ID: u32 = 1;

/// Reassembled response for one stream, plus every inbound frame in
/// arrival order and the raw buffer for forensic inspection.
#[derive(Debug, Clone)]
pub struct H2Response {
    pub stream_id: u32,
    pub status_code: u16,
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Vec<u8>,
    pub frames: Vec<Frame>,
    pub raw: Vec<u8>,
    pub timing: Option<Timing>,
}

/// Result of the raw frame mode: no stream reassembly, just frames.
#[derive(Debug, Clone)]
pub struct RawFrames {
    pub frames: Vec<Frame>,
    pub raw: Vec<u8>,
}

fn connection_error(e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("Connection error: {}", e))
}

fn socket_error(e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("Socket error: {}", e))
}

async fn deadline<T>(
    opts: &SendOptions,
    fut: impl std::future::Future<Output = io::Result<T>>,
) -> io::Result<T> {
    match timeout(Duration::from_millis(opts.timeout_ms), fut).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("Connection timeout after {}ms", opts.timeout_ms),
        )),
    }
}

/// Send the plan over HTTP/2 and reassemble the stream-1 response.
pub async fn send(
    plan: &RequestPlan,
    origin: &Origin,
    opts: &SendOptions,
) -> io::Result<H2Response> {
    deadline(opts, send_inner(plan, origin, opts)).await
}

/// Write caller frame bytes verbatim and return the parsed inbound
/// frames plus the raw buffer.
pub async fn send_raw_frames(
    host: &str,
    port: u16,
    frame_bytes: &[u8],
    opts: &SendOptions,
) -> io::Result<RawFrames> {
    deadline(opts, send_raw_inner(host, port, frame_bytes, opts)).await
}

fn build_header_block(plan: &RequestPlan) -> Vec<u8> {
    let mut entries = plan.pseudo_headers();
    entries.extend(plan.regular_headers());
    let refs: Vec<(&str, &str)> = entries
        .iter()
        .map(|(n, v)| (n.as_str(), v.as_str()))
        .collect();
    let mut block = BytesMut::new();
    Encoder::new().encode(&refs, &mut block);
    block.to_vec()
}

/// Read frames until EOF, END_STREAM on the request stream, or GOAWAY
/// (peers rarely close first).
async fn collect_frames(
    stream: &mut HttpStream,
    timing: &mut Option<TimingCapture>,
    stop_at_stream_end: bool,
) -> io::Result<(Vec<Frame>, Vec<u8>)> {
    let mut raw = Vec::new();
    let mut buf = BytesMut::new();
    let mut frames = Vec::new();
    let mut tmp = [0u8; 8192];
    'read: loop {
        let n = stream.read(&mut tmp).await.map_err(socket_error)?;
        if n == 0 {
            break;
        }
        if let Some(t) = timing.as_mut() {
            t.mark_first_byte();
        }
        raw.extend_from_slice(&tmp[..n]);
        buf.extend_from_slice(&tmp[..n]);
        while let Some(frame) = parse_frame(&mut buf) {
            let done = frame.frame_type == TYPE_GOAWAY
                || (stop_at_stream_end
                    && frame.stream_id == REQUEST_STREAM_ID
                    && frame.has_flag(FLAG_END_STREAM)
                    && (frame.frame_type == TYPE_DATA || frame.frame_type == TYPE_HEADERS));
            frames.push(frame);
            if done {
                break 'read;
            }
        }
    }
    Ok((frames, raw))
}

async fn send_inner(
    plan: &RequestPlan,
    origin: &Origin,
    opts: &SendOptions,
) -> io::Result<H2Response> {
    let mut timing = opts.collect_timing.then(TimingCapture::started);

    let mut stream = connect_tls(&origin.host, origin.port, &opts.tls, &[b"h2"])
        .await
        .map_err(connection_error)?;
    if let Some(t) = timing.as_mut() {
        t.mark_connect();
    }

    let mut writer = FrameWriter::new();
    writer.write_preface();
    writer.write_settings(&[
        (SETTINGS_MAX_CONCURRENT_STREAMS, DEFAULT_MAX_CONCURRENT_STREAMS),
        (SETTINGS_INITIAL_WINDOW_SIZE, DEFAULT_INITIAL_WINDOW_SIZE),
    ]);
    let block = build_header_block(plan);
    writer.write_headers(REQUEST_STREAM_ID, &block, plan.body.is_empty(), true);
    if !plan.body.is_empty() {
        writer.write_data(REQUEST_STREAM_ID, &plan.body, true, None);
    }
    let outbound = writer.take_buffer();
    stream.write_all(&outbound).await.map_err(socket_error)?;
    stream.flush().await.map_err(socket_error)?;

    let (frames, raw) = collect_frames(&mut stream, &mut timing, true).await?;
    let mut response = assemble_stream_response(REQUEST_STREAM_ID, frames, raw)?;
    response.timing = timing.map(TimingCapture::finish);
    Ok(response)
}

async fn send_raw_inner(
    host: &str,
    port: u16,
    frame_bytes: &[u8],
    opts: &SendOptions,
) -> io::Result<RawFrames> {
    let mut stream = connect_tls(host, port, &opts.tls, &[b"h2"])
        .await
        .map_err(connection_error)?;
    stream.write_all(frame_bytes).await.map_err(socket_error)?;
    stream.flush().await.map_err(socket_error)?;
    let mut timing = None;
    let (frames, raw) = collect_frames(&mut stream, &mut timing, false).await?;
    Ok(RawFrames { frames, raw })
}

/// Decode the HEADERS (+ CONTINUATION) block for the stream and
/// concatenate its DATA payloads. `:status` becomes the status code;
/// other pseudo-headers are dropped and regular entries keep arrival
/// order in the multimap.
fn assemble_stream_response(
    stream_id: u32,
    frames: Vec<Frame>,
    raw: Vec<u8>,
) -> io::Result<H2Response> {
    let mut header_block = BytesMut::new();
    let mut saw_headers = false;
    let mut body = Vec::new();
    for frame in frames.iter().filter(|f| f.stream_id == stream_id) {
        match frame.frame_type {
            TYPE_HEADERS => {
                saw_headers = true;
                let (_priority, block) = decode_headers_payload(frame)
                    .map_err(|_| parse_failure())?;
                header_block.extend_from_slice(&block);
            }
            TYPE_CONTINUATION => {
                header_block.extend_from_slice(&frame.payload);
            }
            TYPE_DATA => {
                let data = decode_data_payload(frame).map_err(|_| parse_failure())?;
                body.extend_from_slice(&data);
            }
            _ => {}
        }
    }
    if !saw_headers {
        return Err(parse_failure());
    }
    let decoded = Decoder::new(4096)
        .decode(&mut &header_block[..])
        .map_err(|_| parse_failure())?;

    let mut status_code = 0u16;
    let mut headers = Vec::new();
    for (name, value) in decoded {
        if name == ":status" {
            status_code = value.parse().unwrap_or(0);
        } else if !name.starts_with(':') {
            push_header(&mut headers, name, value);
        }
    }
    Ok(H2Response {
        stream_id,
        status_code,
        headers,
        body,
        frames,
        raw,
        timing: None,
    })
}

fn parse_failure() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "Failed to parse HTTP/2 response")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_frame(stream_id: u32, block: &[u8], end_stream: bool) -> Frame {
        Frame {
            length: block.len() as u32,
            frame_type: TYPE_HEADERS,
            flags: FLAG_END_HEADERS | if end_stream { FLAG_END_STREAM } else { 0 },
            stream_id,
            payload: bytes::Bytes::copy_from_slice(block),
        }
    }

    fn data_frame(stream_id: u32, data: &[u8]) -> Frame {
        Frame {
            length: data.len() as u32,
            frame_type: TYPE_DATA,
            flags: FLAG_END_STREAM,
            stream_id,
            payload: bytes::Bytes::copy_from_slice(data),
        }
    }

    #[test]
    fn assembles_status_headers_and_body() {
        // 0x88 = :status 200 indexed; then a literal server header
        let mut block = vec![0x88u8];
        block.extend_from_slice(&[0x40, 0x06]);
        block.extend_from_slice(b"server");
        block.extend_from_slice(&[0x05]);
        block.extend_from_slice(b"probe");
        let frames = vec![
            headers_frame(1, &block, false),
            data_frame(1, b"hello "),
            data_frame(1, b"world"),
        ];
        let response = assemble_stream_response(1, frames, Vec::new()).unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.headers, vec![("server".to_string(), vec!["probe".to_string()])]);
        assert_eq!(response.body, b"hello world");
        assert_eq!(response.frames.len(), 3);
    }

    #[test]
    fn other_streams_ignored() {
        let frames = vec![
            headers_frame(1, &[0x88], true),
            data_frame(3, b"not ours"),
        ];
        let response = assemble_stream_response(1, frames, Vec::new()).unwrap();
        assert!(response.body.is_empty());
    }

    #[test]
    fn missing_headers_is_parse_failure() {
        let frames = vec![data_frame(1, b"body only")];
        let err = assemble_stream_response(1, frames, Vec::new()).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse HTTP/2 response");
    }

    #[test]
    fn header_block_from_plan_decodes_to_pseudo_headers() {
        use crate::http::options::Scheme;
        let plan = RequestPlan::new()
            .method("GET")
            .path("/res")
            .host("target.example")
            .scheme(Scheme::Https)
            .port(443)
            .header("Host", "target.example")
            .header("X-Probe", "1");
        let block = build_header_block(&plan);
        let decoded = Decoder::new(4096).decode(&mut &block[..]).unwrap();
        assert_eq!(decoded[0], (":method".to_string(), "GET".to_string()));
        assert_eq!(decoded[1], (":path".to_string(), "/res".to_string()));
        assert_eq!(decoded[2], (":scheme".to_string(), "https".to_string()));
        assert_eq!(
            decoded[3],
            (":authority".to_string(), "target.example".to_string())
        );
        // host suppressed, regular header lowercased
        assert!(decoded.iter().all(|(n, _)| n != "host"));
        assert!(decoded.contains(&("x-probe".to_string(), "1".to_string())));
    }
}
