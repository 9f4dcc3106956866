/*
 * transport.rs
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

//! Raw HTTP/1.x transport: write caller bytes verbatim, accumulate the
//! response, parse leniently. Supports pipelining (N requests, one
//! write, framed split), HTTP CONNECT tunneling, keep-alive pooling,
//! and timing capture.
//!
//! One operation arms one timer; expiry resolves the operation exactly
//! once with the timeout error and drops the socket. The transport never
//! edits caller bytes; `RequestPlan::ensure_connection_header` is the
//! caller-facing helper for keep-alive headers.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::h1::split::{count_complete, frame_one, split_buffer};
use crate::http::options::{
    Origin, ProxyConfig, ProxyProtocol, Scheme, SendOptions, TimingCapture, TlsOptions,
};
use crate::http::pool::{ConnectionPool, PoolConfig};
use crate::http::request::RequestPlan;
use crate::http::response::{find, parse_response, ParsedResponse};
use crate::net::{connect_tcp, connect_tls, HttpStream};

fn connection_error(e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("Connection error: {}", e))
}

fn socket_error(e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("Socket error: {}", e))
}

fn proxy_socket_error(e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("Proxy socket error: {}", e))
}

struct Collected {
    bytes: Vec<u8>,
    eof: bool,
}

/// When to stop reading before EOF.
enum StopRule {
    /// Accumulate until the peer closes.
    Eof,
    /// Stop once one framed response is complete (keep-alive peers
    /// don't close).
    OneResponse,
    /// Stop once N framed responses are complete.
    Responses(usize),
}

impl StopRule {
    fn satisfied(&self, buf: &[u8]) -> bool {
        match self {
            StopRule::Eof => false,
            StopRule::OneResponse => frame_one(buf).is_some(),
            StopRule::Responses(n) => count_complete(buf) >= *n,
        }
    }
}

async fn write_and_collect(
    stream: &mut HttpStream,
    bytes: &[u8],
    timing: Option<&mut TimingCapture>,
    stop: StopRule,
) -> io::Result<Collected> {
    stream.write_all(bytes).await.map_err(socket_error)?;
    stream.flush().await.map_err(socket_error)?;

    let mut acc = Vec::new();
    let mut tmp = [0u8; 8192];
    let mut timing = timing;
    let eof = loop {
        let n = stream.read(&mut tmp).await.map_err(socket_error)?;
        if n == 0 {
            break true;
        }
        if let Some(t) = timing.as_deref_mut() {
            t.mark_first_byte();
        }
        acc.extend_from_slice(&tmp[..n]);
        if stop.satisfied(&acc) {
            break false;
        }
    };
    Ok(Collected { bytes: acc, eof })
}

async fn connect_origin(origin: &Origin, tls: &TlsOptions) -> io::Result<HttpStream> {
    match origin.scheme {
        Scheme::Https => connect_tls(&origin.host, origin.port, tls, &[])
            .await
            .map_err(connection_error),
        Scheme::Http => connect_tcp(&origin.host, origin.port)
            .await
            .map(HttpStream::Plain)
            .map_err(connection_error),
    }
}

/// Establish an HTTP CONNECT tunnel through the proxy. SOCKS is
/// rejected, and so is an https target: upgrading TLS over the
/// established tunnel socket would change what actually went on the
/// wire, so the failure is the contract.
async fn open_tunnel(proxy: &ProxyConfig, origin: &Origin) -> io::Result<HttpStream> {
    match proxy.protocol {
        ProxyProtocol::Socks4 | ProxyProtocol::Socks5 => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "SOCKS proxy support not yet implemented; use an HTTP proxy",
            ));
        }
        ProxyProtocol::Http => {}
    }
    let mut tcp = connect_tcp(&proxy.host, proxy.port)
        .await
        .map_err(|e| io::Error::new(e.kind(), format!("Proxy connection error: {}", e)))?;

    let target = format!("{}:{}", origin.host, origin.port);
    let mut connect = format!("CONNECT {} HTTP/1.1\r\nHost: {}\r\n", target, target);
    if let Some(auth) = &proxy.auth {
        let credentials = BASE64.encode(format!("{}:{}", auth.username, auth.password));
        connect.push_str(&format!("Proxy-Authorization: Basic {}\r\n", credentials));
    }
    connect.push_str("\r\n");
    tcp.write_all(connect.as_bytes())
        .await
        .map_err(proxy_socket_error)?;

    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    loop {
        let n = tcp.read(&mut tmp).await.map_err(proxy_socket_error)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Proxy connection error: closed before CONNECT response",
            ));
        }
        buf.extend_from_slice(&tmp[..n]);
        if find(&buf, b"\r\n\r\n").is_some() || buf.len() > 8192 {
            break;
        }
    }
    let text = String::from_utf8_lossy(&buf);
    let first_line = text.lines().next().unwrap_or("").trim().to_string();
    if first_line.contains("200") {
        match origin.scheme {
            Scheme::Https => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "HTTPS through an HTTP proxy is not supported",
            )),
            Scheme::Http => Ok(HttpStream::Plain(tcp)),
        }
    } else if first_line.contains("407") {
        Err(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "Proxy authentication required",
        ))
    } else {
        Err(io::Error::new(
            io::ErrorKind::ConnectionRefused,
            format!("Proxy CONNECT failed: {}", first_line),
        ))
    }
}

/// Raw HTTP/1.x client. Owns the keep-alive pool; everything else is
/// per-call. Requires a running tokio runtime.
pub struct RawClient {
    pool: ConnectionPool,
}

impl RawClient {
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        Self {
            pool: ConnectionPool::new(config),
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Build and send a plan to its own origin.
    pub async fn send_plan(
        &self,
        plan: &RequestPlan,
        opts: &SendOptions,
    ) -> io::Result<ParsedResponse> {
        self.send(&plan.build(), &plan.origin(), opts).await
    }

    /// Write `bytes` verbatim to the origin and parse whatever comes back.
    pub async fn send(
        &self,
        bytes: &[u8],
        origin: &Origin,
        opts: &SendOptions,
    ) -> io::Result<ParsedResponse> {
        self.deadline(opts, self.send_inner(bytes, origin, opts))
            .await
    }

    pub async fn send_raw_bytes(
        &self,
        host: &str,
        port: u16,
        scheme: Scheme,
        bytes: &[u8],
        opts: &SendOptions,
    ) -> io::Result<ParsedResponse> {
        self.send(bytes, &Origin::new(host, port, scheme), opts).await
    }

    /// Concatenate the serialized requests, write once, split the reply
    /// buffer into exactly `plans.len()` responses.
    pub async fn send_pipelined_plans(
        &self,
        plans: &[RequestPlan],
        origin: &Origin,
        opts: &SendOptions,
    ) -> io::Result<Vec<ParsedResponse>> {
        let requests: Vec<Vec<u8>> = plans.iter().map(RequestPlan::build).collect();
        self.send_pipelined(&requests, origin, opts).await
    }

    pub async fn send_pipelined(
        &self,
        requests: &[Vec<u8>],
        origin: &Origin,
        opts: &SendOptions,
    ) -> io::Result<Vec<ParsedResponse>> {
        self.deadline(opts, self.send_pipelined_inner(requests, origin, opts))
            .await
    }

    /// One timer per operation. On expiry the in-flight future is
    /// dropped, which closes (or un-pools) its socket.
    async fn deadline<T>(
        &self,
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

    async fn send_inner(
        &self,
        bytes: &[u8],
        origin: &Origin,
        opts: &SendOptions,
    ) -> io::Result<ParsedResponse> {
        let mut timing = opts.collect_timing.then(TimingCapture::started);

        if let Some(proxy) = &opts.proxy {
            let mut stream = open_tunnel(proxy, origin).await?;
            if let Some(t) = timing.as_mut() {
                t.mark_connect();
            }
            let collected =
                write_and_collect(&mut stream, bytes, timing.as_mut(), StopRule::Eof).await?;
            let mut response = parse_response(&collected.bytes);
            response.timing = timing.map(TimingCapture::finish);
            return Ok(response);
        }

        if opts.keep_alive {
            let mut socket = self.pool.acquire(origin, &opts.tls).await.map_err(connection_error)?;
            if let Some(t) = timing.as_mut() {
                t.mark_connect();
            }
            let collected = match write_and_collect(
                socket.stream_mut(),
                bytes,
                timing.as_mut(),
                StopRule::OneResponse,
            )
            .await
            {
                Ok(collected) => collected,
                Err(e) => {
                    drop(socket);
                    return Err(e);
                }
            };
            if collected.eof {
                drop(socket);
            } else {
                self.pool.release(socket);
            }
            let mut response = parse_response(&collected.bytes);
            response.timing = timing.map(TimingCapture::finish);
            return Ok(response);
        }

        let mut stream = connect_origin(origin, &opts.tls).await?;
        if let Some(t) = timing.as_mut() {
            t.mark_connect();
        }
        let collected = write_and_collect(&mut stream, bytes, timing.as_mut(), StopRule::Eof).await?;
        let mut response = parse_response(&collected.bytes);
        response.timing = timing.map(TimingCapture::finish);
        Ok(response)
    }

    async fn send_pipelined_inner(
        &self,
        requests: &[Vec<u8>],
        origin: &Origin,
        opts: &SendOptions,
    ) -> io::Result<Vec<ParsedResponse>> {
        let mut timing = opts.collect_timing.then(TimingCapture::started);
        let concatenated: Vec<u8> = requests.concat();

        let mut stream = match &opts.proxy {
            Some(proxy) => open_tunnel(proxy, origin).await?,
            None => connect_origin(origin, &opts.tls).await?,
        };
        if let Some(t) = timing.as_mut() {
            t.mark_connect();
        }
        let collected = write_and_collect(
            &mut stream,
            &concatenated,
            timing.as_mut(),
            StopRule::Responses(requests.len()),
        )
        .await?;
        let timing = timing.map(TimingCapture::finish);
        let responses = split_buffer(&collected.bytes, requests.len())
            .iter()
            .map(|chunk| {
                let mut response = parse_response(chunk);
                response.timing = timing;
                response
            })
            .collect();
        Ok(responses)
    }
}

impl Default for RawClient {
    fn default() -> Self {
        Self::new()
    }
}
