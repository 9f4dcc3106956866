/*
 * response.rs
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

//! Lenient HTTP/1.x response parsing and analyzer predicates.
//!
//! Malformed input is never an error: a bad status line records
//! `parse_error` and leaves `status_code` 0, header lines that violate
//! the grammar are skipped, and the rest of the record stays intact for
//! forensic inspection.

use regex::Regex;
use std::sync::OnceLock;

use crate::http::options::Timing;

/// Counts of the two body-length headers; the interesting case for
/// request smuggling is both being present at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmugglingIndicators {
    pub content_length_count: usize,
    pub transfer_encoding_count: usize,
    pub both_present: bool,
}

/// A parsed HTTP/1.x response. Header names are lowercased for lookup;
/// duplicate values keep arrival order.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub raw: Vec<u8>,
    pub raw_string: String,
    /// Version text from the status line, e.g. `1.1`. Empty when the
    /// status line did not parse.
    pub http_version: String,
    /// 0 when the status line did not parse.
    pub status_code: u16,
    pub status_message: String,
    /// Multimap in first-arrival key order; values in arrival order.
    pub headers: Vec<(String, Vec<String>)>,
    pub body: Vec<u8>,
    pub parse_error: Option<String>,
    pub timing: Option<Timing>,
}

/// Structural equality: the parsed view, not the raw bytes or timing.
impl PartialEq for ParsedResponse {
    fn eq(&self, other: &Self) -> bool {
        self.http_version == other.http_version
            && self.status_code == other.status_code
            && self.status_message == other.status_message
            && self.headers == other.headers
            && self.body == other.body
    }
}

fn status_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^HTTP/(\d+\.?\d*)\s+(\d+)\s*(.*)$").unwrap())
}

/// Split raw bytes at the first `\r\n\r\n`, or `\n\n`, or treat the whole
/// buffer as the header section. Returns (header_text, body_bytes).
pub(crate) fn split_head_body(raw: &[u8]) -> (String, &[u8]) {
    if let Some(pos) = find(raw, b"\r\n\r\n") {
        (
            String::from_utf8_lossy(&raw[..pos]).into_owned(),
            &raw[pos + 4..],
        )
    } else if let Some(pos) = find(raw, b"\n\n") {
        (
            String::from_utf8_lossy(&raw[..pos]).into_owned(),
            &raw[pos + 2..],
        )
    } else {
        (String::from_utf8_lossy(raw).into_owned(), &[])
    }
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Parse possibly malformed response bytes. Never fails; see module docs.
pub fn parse_response(raw: &[u8]) -> ParsedResponse {
    let mut response = ParsedResponse {
        raw: raw.to_vec(),
        raw_string: String::from_utf8_lossy(raw).into_owned(),
        ..ParsedResponse::default()
    };

    let (head, body) = split_head_body(raw);
    response.body = body.to_vec();

    let mut lines = head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l));
    match lines.next() {
        Some(status_line) => match status_line_re().captures(status_line) {
            Some(caps) => {
                response.http_version = caps[1].to_string();
                response.status_code = caps[2].parse().unwrap_or(0);
                response.status_message = caps.get(3).map_or("", |m| m.as_str()).to_string();
            }
            None => {
                response.parse_error = Some(format!("malformed status line: {:?}", status_line));
            }
        },
        None => {
            response.parse_error = Some("empty response".to_string());
        }
    }

    for line in lines {
        match line.find(':') {
            Some(0) | None => continue,
            Some(colon) => {
                let name = line[..colon].trim().to_ascii_lowercase();
                let value = line[colon + 1..].trim().to_string();
                push_header(&mut response.headers, name, value);
            }
        }
    }
    response
}

pub(crate) fn push_header(headers: &mut Vec<(String, Vec<String>)>, name: String, value: String) {
    match headers.iter_mut().find(|(n, _)| *n == name) {
        Some((_, values)) => values.push(value),
        None => headers.push((name, vec![value])),
    }
}

impl ParsedResponse {
    /// Reassemble bytes from the parsed view. For a well-formed input,
    /// `parse_response(&r.serialize()) == r`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(
            format!(
                "HTTP/{} {} {}",
                self.http_version, self.status_code, self.status_message
            )
            .trim_end()
            .as_bytes(),
        );
        out.extend_from_slice(b"\r\n");
        for (name, values) in &self.headers {
            for value in values {
                out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
            }
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    pub fn is_redirect(&self) -> bool {
        (300..=399).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status_code)
    }

    pub fn has_status(&self, code: u16) -> bool {
        self.status_code == code
    }

    pub fn has_status_in_range(&self, low: u16, high: u16) -> bool {
        (low..=high).contains(&self.status_code)
    }

    pub fn body_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn body_contains(&self, needle: &str, case_sensitive: bool) -> bool {
        let body = self.body_string();
        if case_sensitive {
            body.contains(needle)
        } else {
            body.to_lowercase().contains(&needle.to_lowercase())
        }
    }

    pub fn body_matches(&self, pattern: &str) -> Result<bool, regex::Error> {
        Ok(Regex::new(pattern)?.is_match(&self.body_string()))
    }

    pub fn raw_contains(&self, needle: &str) -> bool {
        self.raw_string.contains(needle)
    }

    pub fn has_header(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.headers.iter().any(|(n, _)| *n == name)
    }

    /// All values for a header, arrival order.
    pub fn get_header(&self, name: &str) -> Vec<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, values)| values.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn get_first_header(&self, name: &str) -> Option<&str> {
        self.get_header(name).first().copied()
    }

    pub fn header_contains(&self, name: &str, needle: &str) -> bool {
        self.get_header(name).iter().any(|v| v.contains(needle))
    }

    pub fn content_length(&self) -> Option<u64> {
        self.get_first_header("content-length")
            .and_then(|v| v.trim().parse().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_first_header("content-type")
    }

    /// The stored `set-cookie` values, verbatim.
    pub fn cookies(&self) -> Vec<&str> {
        self.get_header("set-cookie")
    }

    pub fn smuggling_indicators(&self) -> SmugglingIndicators {
        let cl = self.get_header("content-length").len();
        let te = self.get_header("transfer-encoding").len();
        SmugglingIndicators {
            content_length_count: cl,
            transfer_encoding_count: te,
            both_present: cl > 0 && te > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_parse() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\n\r\nHello";
        let r = parse_response(raw);
        assert_eq!(r.status_code, 200);
        assert_eq!(r.http_version, "1.1");
        assert_eq!(r.status_message, "OK");
        assert_eq!(r.get_header("content-type"), vec!["text/plain"]);
        assert_eq!(r.body, b"Hello");
        assert!(r.parse_error.is_none());
        assert!(r.is_success());
    }

    #[test]
    fn duplicate_set_cookie_preserves_order() {
        let raw = b"HTTP/1.1 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nSet-Cookie: c=3\r\n\r\n";
        let r = parse_response(raw);
        assert_eq!(r.cookies(), vec!["a=1", "b=2", "c=3"]);
    }

    #[test]
    fn malformed_status_line() {
        let r = parse_response(b"not a valid http response");
        assert!(r.parse_error.is_some());
        assert_eq!(r.status_code, 0);
    }

    #[test]
    fn lf_only_separator() {
        let r = parse_response(b"HTTP/1.0 404 Not Found\nServer: x\n\nbody");
        assert_eq!(r.status_code, 404);
        assert_eq!(r.http_version, "1.0");
        assert_eq!(r.get_first_header("server"), Some("x"));
        assert_eq!(r.body, b"body");
        assert!(r.is_client_error());
    }

    #[test]
    fn headers_without_separator() {
        let r = parse_response(b"HTTP/1.1 204 No Content\r\nX-A: 1");
        assert_eq!(r.status_code, 204);
        assert_eq!(r.get_first_header("x-a"), Some("1"));
        assert!(r.body.is_empty());
    }

    #[test]
    fn grammar_violations_skipped() {
        let raw = b"HTTP/1.1 200 OK\r\nno-colon-line\r\n: leading colon\r\nGood: yes\r\n\r\n";
        let r = parse_response(raw);
        assert_eq!(r.headers.len(), 1);
        assert_eq!(r.get_first_header("good"), Some("yes"));
    }

    #[test]
    fn status_without_message() {
        let r = parse_response(b"HTTP/1.1 301\r\nLocation: /next\r\n\r\n");
        assert_eq!(r.status_code, 301);
        assert_eq!(r.status_message, "");
        assert!(r.is_redirect());
    }

    #[test]
    fn parse_serialize_idempotent() {
        let raw = b"HTTP/1.1 200 OK\r\ncontent-type: text/html\r\nset-cookie: a=1\r\nset-cookie: b=2\r\n\r\n<html>";
        let first = parse_response(raw);
        let second = parse_response(&first.serialize());
        assert_eq!(first, second);
    }

    #[test]
    fn smuggling_indicators() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nContent-Length: 6\r\nTransfer-Encoding: chunked\r\n\r\n";
        let ind = parse_response(raw).smuggling_indicators();
        assert_eq!(ind.content_length_count, 2);
        assert_eq!(ind.transfer_encoding_count, 1);
        assert!(ind.both_present);
    }

    #[test]
    fn analyzer_predicates() {
        let raw = b"HTTP/1.1 500 Internal Server Error\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
        let r = parse_response(raw);
        assert!(r.is_server_error());
        assert!(r.has_status(500));
        assert!(r.has_status_in_range(500, 599));
        assert!(r.body_contains("{", true));
        assert!(!r.body_contains("X", false));
        assert!(r.body_matches(r"^\{\}$").unwrap());
        assert!(r.raw_contains("Internal Server"));
        assert!(r.header_contains("content-type", "json"));
        assert_eq!(r.content_length(), Some(2));
        assert_eq!(r.content_type(), Some("application/json"));
    }
}
