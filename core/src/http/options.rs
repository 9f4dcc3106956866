/*
 * options.rs
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

//! Plain-data option records shared by the transports: target origin,
//! per-send options, TLS knobs, proxy configuration, timing capture.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Target scheme. Determines TLS and the default port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Connection identity: where the bytes go. Independent of any `Host:`
/// header the caller chooses to emit (or not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl Origin {
    pub fn new(host: impl Into<String>, port: u16, scheme: Scheme) -> Self {
        Self {
            host: host.into(),
            port,
            scheme,
        }
    }

    pub fn http(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Scheme::Http)
    }

    pub fn https(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, Scheme::Https)
    }

    /// Pool key: `scheme://host:port`.
    pub fn key(&self) -> String {
        format!("{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}

/// TLS protocol version bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

/// TLS knobs. Verification is off by default: this is a testing tool and
/// the targets are routinely self-signed or intercepted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TlsOptions {
    /// Verify the server certificate chain. Default false.
    #[serde(default)]
    pub reject_unauthorized: bool,
    /// SNI name. Defaults to the target host.
    #[serde(default)]
    pub servername: Option<String>,
    #[serde(default)]
    pub min_version: Option<TlsVersion>,
    #[serde(default)]
    pub max_version: Option<TlsVersion>,
    /// Cipher-suite pinning is not expressible through the rustls safe
    /// API; a non-empty list is rejected at connect time.
    #[serde(default)]
    pub ciphers: Vec<String>,
    /// Client certificate chain, DER.
    #[serde(default)]
    pub cert: Vec<Vec<u8>>,
    /// Client private key, DER (PKCS#8).
    #[serde(default)]
    pub key: Option<Vec<u8>>,
    /// Extra trust anchors, DER. Only consulted when verifying.
    #[serde(default)]
    pub ca: Vec<Vec<u8>>,
}

/// Proxy protocol. Only HTTP CONNECT is implemented; the SOCKS variants
/// are recognized so they can be rejected with a clear error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyProtocol {
    Http,
    Socks4,
    Socks5,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    pub protocol: ProxyProtocol,
    #[serde(default)]
    pub auth: Option<ProxyAuth>,
}

/// Per-send options for the raw and HTTP/2 transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendOptions {
    /// Overall timer for the whole operation, connect through last read.
    pub timeout_ms: u64,
    pub collect_timing: bool,
    #[serde(default)]
    pub tls: TlsOptions,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    /// Pool the socket instead of opening and closing one per send.
    #[serde(default)]
    pub keep_alive: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            collect_timing: false,
            tls: TlsOptions::default(),
            proxy: None,
            keep_alive: false,
        }
    }
}

/// Millisecond timing captured around one network operation.
/// Absolute fields are unix epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub start: u64,
    pub connect: u64,
    pub first_byte: u64,
    pub end: u64,
    /// `first_byte - start`
    pub ttfb: u64,
    /// `end - start`
    pub total: u64,
    /// `connect - start`
    pub connection: u64,
}

/// Mutable capture; `finish()` derives the computed fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingCapture {
    pub start: u64,
    pub connect: u64,
    pub first_byte: u64,
    pub end: u64,
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl TimingCapture {
    pub fn started() -> Self {
        Self {
            start: now_ms(),
            ..Self::default()
        }
    }

    pub fn mark_connect(&mut self) {
        self.connect = now_ms();
    }

    pub fn mark_first_byte(&mut self) {
        if self.first_byte == 0 {
            self.first_byte = now_ms();
        }
    }

    pub fn finish(mut self) -> Timing {
        self.end = now_ms();
        if self.first_byte == 0 {
            self.first_byte = self.end;
        }
        if self.connect == 0 {
            self.connect = self.start;
        }
        Timing {
            start: self.start,
            connect: self.connect,
            first_byte: self.first_byte,
            end: self.end,
            ttfb: self.first_byte.saturating_sub(self.start),
            total: self.end.saturating_sub(self.start),
            connection: self.connect.saturating_sub(self.start),
        }
    }
}
