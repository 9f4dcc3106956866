/*
 * request.rs
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

//! Request assembly without sanitization. The plan accumulates exactly
//! what the caller asks for: headers are never reordered, duplicates
//! never collapsed, characters never validated. Raw header entries land
//! in the output byte-exact at the position they were added.

use serde_json::Value;

use crate::http::options::{Origin, Scheme};

/// Line terminator policy for the emitted request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEnding {
    Crlf,
    Lf,
    Cr,
    Custom(String),
}

impl LineEnding {
    pub fn as_str(&self) -> &str {
        match self {
            LineEnding::Crlf => "\r\n",
            LineEnding::Lf => "\n",
            LineEnding::Cr => "\r",
            LineEnding::Custom(s) => s,
        }
    }
}

/// One header slot: a structured pair formatted as `name: value`, or a
/// raw line emitted verbatim (CR, LF, NUL, grammar violations included).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderEntry {
    Pair { name: String, value: String },
    Raw(Vec<u8>),
}

/// Recognized header malformations; each produces a raw line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Malformation {
    /// `NAME : VALUE`
    SpaceBeforeColon,
    /// `NAME:\tVALUE`
    TabSeparator,
    /// `NAME:VALUE`
    NoSpaceAfterColon,
    /// `NAME:  VALUE`
    DoubleSpace,
    /// `NAME: VALUE\r\nInjected: header`
    CrlfInjection,
    /// `NAME: VALUE\0injected`
    NullByte,
    /// `NAME: ` + 8192 `A`s + `VALUE`
    OversizedHeader,
    /// `: VALUE`
    EmptyHeaderName,
    /// `NAME: `
    EmptyHeaderValue,
}

/// An accumulated request: emits exact bytes via [`build`](Self::build).
///
/// The connection identity (`host`/`port`/`scheme`) lives on the plan
/// independently of any `Host:` header the caller emits, or doesn't.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: String,
    pub path: String,
    /// Version text placed on the request line, e.g. `HTTP/1.1`.
    pub version: String,
    pub headers: Vec<HeaderEntry>,
    pub body: Vec<u8>,
    pub line_ending: LineEnding,
    /// Separator between method, target, and version. Default one space.
    pub separator: String,
    pub host: String,
    pub port: u16,
    pub scheme: Scheme,
}

impl Default for RequestPlan {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Vec::new(),
            body: Vec::new(),
            line_ending: LineEnding::Crlf,
            separator: " ".to_string(),
            host: String::new(),
            port: 80,
            scheme: Scheme::Http,
        }
    }
}

impl RequestPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn line_ending(mut self, le: LineEnding) -> Self {
        self.line_ending = le;
        self
    }

    pub fn separator(mut self, sep: impl Into<String>) -> Self {
        self.separator = sep.into();
        self
    }

    /// Append a structured header. Duplicates are preserved in order.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderEntry::Pair {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a raw header line, bypassing all formatting.
    pub fn raw_header(mut self, line: impl Into<Vec<u8>>) -> Self {
        self.headers.push(HeaderEntry::Raw(line.into()));
        self
    }

    /// Append a malformed header line of the given kind.
    pub fn malformed_header(self, kind: Malformation, name: &str, value: &str) -> Self {
        self.raw_header(malformed_line(kind, name, value))
    }

    /// Serialize `value` as the body and append a
    /// `Content-Type: application/json` header. The append is
    /// unconditional; deduplication is the caller's choice.
    pub fn json_body(mut self, value: &Value) -> Self {
        self.body = serde_json::to_vec(value).unwrap_or_default();
        self.header("Content-Type", "application/json")
    }

    /// Emit `Connection: keep-alive` / `close` when no structured
    /// `Connection` header is present. The transport never touches the
    /// caller's bytes; callers opt in through this helper.
    pub fn ensure_connection_header(self, keep_alive: bool) -> Self {
        let present = self.headers.iter().any(|e| {
            matches!(e, HeaderEntry::Pair { name, .. } if name.eq_ignore_ascii_case("connection"))
        });
        if present {
            return self;
        }
        self.header("Connection", if keep_alive { "keep-alive" } else { "close" })
    }

    pub fn origin(&self) -> Origin {
        Origin::new(self.host.clone(), self.port, self.scheme)
    }

    /// Emit the exact request bytes: request line, header lines in
    /// insertion order, empty separator line, then the body with no
    /// further separator. Pure function of the accumulated state.
    pub fn build(&self) -> Vec<u8> {
        let le = self.line_ending.as_str().as_bytes();
        let mut out = Vec::new();
        out.extend_from_slice(self.method.as_bytes());
        out.extend_from_slice(self.separator.as_bytes());
        out.extend_from_slice(self.path.as_bytes());
        out.extend_from_slice(self.separator.as_bytes());
        out.extend_from_slice(self.version.as_bytes());
        out.extend_from_slice(le);
        for entry in &self.headers {
            match entry {
                HeaderEntry::Pair { name, value } => {
                    out.extend_from_slice(name.as_bytes());
                    out.extend_from_slice(b": ");
                    out.extend_from_slice(value.as_bytes());
                }
                HeaderEntry::Raw(line) => out.extend_from_slice(line),
            }
            out.extend_from_slice(le);
        }
        out.extend_from_slice(le);
        out.extend_from_slice(&self.body);
        out
    }

    /// Well-formed projection: structured pairs only, raw entries excluded.
    pub fn header_pairs(&self) -> Vec<(String, String)> {
        self.headers
            .iter()
            .filter_map(|e| match e {
                HeaderEntry::Pair { name, value } => Some((name.clone(), value.clone())),
                HeaderEntry::Raw(_) => None,
            })
            .collect()
    }

    /// Fetch-style projection: raw entries are parsed at the first `:`
    /// (text before it = name, remainder trimmed = value); entries with
    /// empty names are rejected.
    pub fn fetch_headers(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for entry in &self.headers {
            match entry {
                HeaderEntry::Pair { name, value } => {
                    if !name.is_empty() {
                        out.push((name.clone(), value.clone()));
                    }
                }
                HeaderEntry::Raw(line) => {
                    let text = String::from_utf8_lossy(line);
                    if let Some(colon) = text.find(':') {
                        let name = text[..colon].trim().to_string();
                        let value = text[colon + 1..].trim().to_string();
                        if !name.is_empty() {
                            out.push((name, value));
                        }
                    }
                }
            }
        }
        out
    }

    /// Canonical URL: scheme + host + port (elided for 80/443 defaults) + path.
    pub fn url(&self) -> String {
        if self.port == self.scheme.default_port() {
            format!("{}://{}{}", self.scheme.as_str(), self.host, self.path)
        } else {
            format!(
                "{}://{}:{}{}",
                self.scheme.as_str(),
                self.host,
                self.port,
                self.path
            )
        }
    }

    /// HTTP/2 pseudo-header set, `:authority` sourced from the host.
    pub fn pseudo_headers(&self) -> Vec<(String, String)> {
        vec![
            (":method".to_string(), self.method.clone()),
            (":path".to_string(), self.path.clone()),
            (":scheme".to_string(), self.scheme.as_str().to_string()),
            (":authority".to_string(), self.host.clone()),
        ]
    }

    /// Regular headers for HTTP/2: lowercased, `host` suppressed
    /// (carried by `:authority`), pseudo-headers preserved.
    pub fn regular_headers(&self) -> Vec<(String, String)> {
        self.fetch_headers()
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .filter(|(name, _)| name != "host")
            .collect()
    }
}

fn malformed_line(kind: Malformation, name: &str, value: &str) -> Vec<u8> {
    match kind {
        Malformation::SpaceBeforeColon => format!("{} : {}", name, value).into_bytes(),
        Malformation::TabSeparator => format!("{}:\t{}", name, value).into_bytes(),
        Malformation::NoSpaceAfterColon => format!("{}:{}", name, value).into_bytes(),
        Malformation::DoubleSpace => format!("{}:  {}", name, value).into_bytes(),
        Malformation::CrlfInjection => {
            format!("{}: {}\r\nInjected: header", name, value).into_bytes()
        }
        Malformation::NullByte => format!("{}: {}\0injected", name, value).into_bytes(),
        Malformation::OversizedHeader => {
            format!("{}: {}{}", name, "A".repeat(8192), value).into_bytes()
        }
        Malformation::EmptyHeaderName => format!(": {}", value).into_bytes(),
        Malformation::EmptyHeaderValue => format!("{}: ", name).into_bytes(),
    }
}
