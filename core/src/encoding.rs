/*
 * encoding.rs
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

//! Bypass payload encoders: URL, unicode, hex, octal, HTML entity,
//! base64, overlong UTF-8, mixed, and path traversal variants.
//!
//! Stateless; used freely by callers to build filter-evasion payloads.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::io;
use std::str::FromStr;

/// Everything except ALPHA / DIGIT / `-` `.` `_` `~` is percent-encoded:
/// the RFC 3986 reserved set plus `!'()*`.
const URL_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingKind {
    Url,
    DoubleUrl,
    /// Percent-encode every byte, even unreserved ones.
    UrlAll,
    Unicode,
    Hex,
    Octal,
    HtmlEntity,
    Base64,
    OverlongUtf8,
}

impl EncodingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingKind::Url => "url",
            EncodingKind::DoubleUrl => "double-url",
            EncodingKind::UrlAll => "url-all",
            EncodingKind::Unicode => "unicode",
            EncodingKind::Hex => "hex",
            EncodingKind::Octal => "octal",
            EncodingKind::HtmlEntity => "html-entity",
            EncodingKind::Base64 => "base64",
            EncodingKind::OverlongUtf8 => "overlong-utf8",
        }
    }
}

impl FromStr for EncodingKind {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "url" => Ok(EncodingKind::Url),
            "double-url" => Ok(EncodingKind::DoubleUrl),
            "url-all" => Ok(EncodingKind::UrlAll),
            "unicode" => Ok(EncodingKind::Unicode),
            "hex" => Ok(EncodingKind::Hex),
            "octal" => Ok(EncodingKind::Octal),
            "html-entity" => Ok(EncodingKind::HtmlEntity),
            "base64" => Ok(EncodingKind::Base64),
            "overlong-utf8" => Ok(EncodingKind::OverlongUtf8),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unknown encoding kind: {}", s),
            )),
        }
    }
}

pub fn encode(s: &str, kind: EncodingKind) -> String {
    match kind {
        EncodingKind::Url => url_encode(s),
        EncodingKind::DoubleUrl => url_encode(&url_encode(s)),
        EncodingKind::UrlAll => url_encode_all(s),
        EncodingKind::Unicode => unicode_encode(s),
        EncodingKind::Hex => hex_encode(s),
        EncodingKind::Octal => octal_encode(s),
        EncodingKind::HtmlEntity => html_entity_encode(s),
        EncodingKind::Base64 => BASE64.encode(s),
        EncodingKind::OverlongUtf8 => overlong_utf8_encode(s),
    }
}

pub fn decode(s: &str, kind: EncodingKind) -> io::Result<String> {
    match kind {
        EncodingKind::Url | EncodingKind::UrlAll => url_decode(s),
        EncodingKind::DoubleUrl => url_decode(&url_decode(s)?),
        EncodingKind::Unicode => unicode_decode(s),
        EncodingKind::Hex => Ok(hex_decode(s)),
        EncodingKind::Octal => Ok(octal_decode(s)),
        EncodingKind::HtmlEntity => html_entity_decode(s),
        EncodingKind::Base64 => {
            let bytes = BASE64
                .decode(s)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            String::from_utf8(bytes)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "base64 payload not UTF-8"))
        }
        EncodingKind::OverlongUtf8 => Ok(overlong_utf8_decode(s)),
    }
}

pub fn url_encode(s: &str) -> String {
    utf8_percent_encode(s, URL_SET).to_string()
}

fn url_decode(s: &str) -> io::Result<String> {
    percent_decode_str(s)
        .decode_utf8()
        .map(|c| c.into_owned())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "percent payload not UTF-8"))
}

/// `%XX` upper-hex for every byte, unreserved included.
pub fn url_encode_all(s: &str) -> String {
    s.bytes().map(|b| format!("%{:02X}", b)).collect()
}

/// `\uXXXX` per UTF-16 code unit.
fn unicode_encode(s: &str) -> String {
    s.encode_utf16().map(|u| format!("\\u{:04x}", u)).collect()
}

fn unicode_decode(s: &str) -> io::Result<String> {
    let mut units = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("\\u") {
            if stripped.len() >= 4 && stripped.is_char_boundary(4) {
                if let Ok(u) = u16::from_str_radix(&stripped[..4], 16) {
                    units.push(u);
                    rest = &stripped[4..];
                    continue;
                }
            }
        }
        let c = rest.chars().next().unwrap();
        let mut buf = [0u16; 2];
        units.extend_from_slice(c.encode_utf16(&mut buf));
        rest = &rest[c.len_utf8()..];
    }
    String::from_utf16(&units)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid UTF-16 sequence"))
}

/// `\xXX` per UTF-8 byte.
fn hex_encode(s: &str) -> String {
    s.bytes().map(|b| format!("\\x{:02x}", b)).collect()
}

fn hex_decode(s: &str) -> String {
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("\\x") {
            if stripped.len() >= 2 && stripped.is_char_boundary(2) {
                if let Ok(b) = u8::from_str_radix(&stripped[..2], 16) {
                    out.push(b);
                    rest = &stripped[2..];
                    continue;
                }
            }
        }
        let c = rest.chars().next().unwrap();
        let mut buf = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        rest = &rest[c.len_utf8()..];
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// `\OOO` three-digit octal per UTF-8 byte.
fn octal_encode(s: &str) -> String {
    s.bytes().map(|b| format!("\\{:03o}", b)).collect()
}

fn octal_decode(s: &str) -> String {
    let mut out = Vec::new();
    let mut rest = s;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix('\\') {
            if stripped.len() >= 3 && stripped.is_char_boundary(3) {
                if let Ok(b) = u8::from_str_radix(&stripped[..3], 8) {
                    out.push(b);
                    rest = &stripped[3..];
                    continue;
                }
            }
        }
        let c = rest.chars().next().unwrap();
        let mut buf = [0u8; 4];
        out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        rest = &rest[c.len_utf8()..];
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// `&#xHH;` per code point.
fn html_entity_encode(s: &str) -> String {
    s.chars().map(|c| format!("&#x{:x};", c as u32)).collect()
}

fn html_entity_decode(s: &str) -> io::Result<String> {
    let mut out = String::new();
    let mut rest = s;
    while !rest.is_empty() {
        if let Some(stripped) = rest.strip_prefix("&#") {
            if let Some(end) = stripped.find(';') {
                let body = &stripped[..end];
                let code = if let Some(hex) = body.strip_prefix('x').or(body.strip_prefix('X')) {
                    u32::from_str_radix(hex, 16).ok()
                } else {
                    body.parse::<u32>().ok()
                };
                if let Some(c) = code.and_then(char::from_u32) {
                    out.push(c);
                    rest = &stripped[end + 1..];
                    continue;
                }
            }
        }
        let c = rest.chars().next().unwrap();
        out.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Ok(out)
}

/// Two-byte overlong form for code points below 128:
/// `0xC0 | (c >> 6), 0x80 | (c & 0x3F)`. Byte values are carried as
/// chars, mirroring how the payload is spliced into a request string.
fn overlong_utf8_encode(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        let v = c as u32;
        if v < 128 {
            out.push(char::from_u32(0xC0 | (v >> 6)).unwrap());
            out.push(char::from_u32(0x80 | (v & 0x3F)).unwrap());
        } else {
            out.push(c);
        }
    }
    out
}

fn overlong_utf8_decode(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let hi = chars[i] as u32;
        if (0xC0..0xC2).contains(&hi) && i + 1 < chars.len() {
            let lo = chars[i + 1] as u32;
            if (0x80..0xC0).contains(&lo) {
                if let Some(c) = char::from_u32(((hi & 0x1F) << 6) | (lo & 0x3F)) {
                    out.push(c);
                    i += 2;
                    continue;
                }
            }
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

/// Per-character random pick among the given kinds.
pub fn mixed_encode(s: &str, kinds: &[EncodingKind]) -> String {
    if kinds.is_empty() {
        return s.to_string();
    }
    s.chars()
        .map(|c| {
            let kind = kinds[rand::random::<usize>() % kinds.len()];
            encode(&c.to_string(), kind)
        })
        .collect()
}

/// `"../"` repeated `depth` times, optionally encoded.
pub fn path_traversal(depth: usize, enc: Option<EncodingKind>) -> String {
    let base = "../".repeat(depth);
    match enc {
        Some(kind) => encode(&base, kind),
        None => base,
    }
}

/// The fixed variant list, in order: plain, backslash, url, double-url,
/// null-byte, double-encoded null-byte, encoded slash, double-encoded
/// slash, nested dots, semicolon, backslash-slash, overlong `%c0%af`,
/// overlong `%c1%9c`.
pub fn path_traversal_variants(depth: usize) -> Vec<String> {
    let base = "../".repeat(depth);
    vec![
        base.clone(),
        "..\\".repeat(depth),
        url_encode(&base),
        url_encode(&url_encode(&base)),
        base.replace("../", "..%00"),
        base.replace("../", "..%2500"),
        base.replace('/', "%2f"),
        base.replace('/', "%252f"),
        "....//".repeat(depth),
        "..;/".repeat(depth),
        "..\\/".repeat(depth),
        "..%c0%af".repeat(depth),
        "..%c1%9c".repeat(depth),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_hello() {
        assert_eq!(encode("hello", EncodingKind::Base64), "aGVsbG8=");
        assert_eq!(decode("aGVsbG8=", EncodingKind::Base64).unwrap(), "hello");
    }

    #[test]
    fn url_reserved_set() {
        assert_eq!(
            encode("../etc/passwd", EncodingKind::Url),
            "..%2Fetc%2Fpasswd"
        );
        // additionally-encoded characters beyond RFC 3986 reserved
        assert_eq!(encode("!'()*", EncodingKind::Url), "%21%27%28%29%2A");
    }

    #[test]
    fn url_encode_all_bytes() {
        assert_eq!(url_encode_all("abc"), "%61%62%63");
    }

    #[test]
    fn double_url_roundtrip() {
        let once = encode("a/b", EncodingKind::Url);
        assert_eq!(encode("a/b", EncodingKind::DoubleUrl), url_encode(&once));
        assert_eq!(
            decode(&encode("a/b", EncodingKind::DoubleUrl), EncodingKind::DoubleUrl).unwrap(),
            "a/b"
        );
    }

    #[test]
    fn unicode_code_units() {
        assert_eq!(encode("AB", EncodingKind::Unicode), "\\u0041\\u0042");
        assert_eq!(
            decode("\\u0041\\u0042", EncodingKind::Unicode).unwrap(),
            "AB"
        );
    }

    #[test]
    fn hex_and_octal() {
        assert_eq!(encode("A", EncodingKind::Hex), "\\x41");
        assert_eq!(decode("\\x41\\x42", EncodingKind::Hex).unwrap(), "AB");
        assert_eq!(encode("A", EncodingKind::Octal), "\\101");
        assert_eq!(decode("\\101", EncodingKind::Octal).unwrap(), "A");
    }

    #[test]
    fn html_entities() {
        assert_eq!(encode("A<", EncodingKind::HtmlEntity), "&#x41;&#x3c;");
        assert_eq!(
            decode("&#x41;&#60;", EncodingKind::HtmlEntity).unwrap(),
            "A<"
        );
    }

    #[test]
    fn overlong_ascii() {
        // '/' = 0x2F -> 0xC0 0xAF
        let enc = encode("/", EncodingKind::OverlongUtf8);
        let units: Vec<u32> = enc.chars().map(|c| c as u32).collect();
        assert_eq!(units, vec![0xC0, 0xAF]);
        assert_eq!(decode(&enc, EncodingKind::OverlongUtf8).unwrap(), "/");
    }

    #[test]
    fn mixed_encode_covers_all_chars() {
        let out = mixed_encode("abc", &[EncodingKind::Hex]);
        assert_eq!(out, "\\x61\\x62\\x63");
    }

    #[test]
    fn traversal_variants_depth_one() {
        let variants = path_traversal_variants(1);
        assert!(variants.len() >= 10);
        assert!(variants.contains(&"../".to_string()));
        assert!(variants.contains(&"..\\".to_string()));
        assert!(variants.contains(&"..%2F".to_string()));
        assert!(variants.contains(&"..%00".to_string()));
        assert!(variants.contains(&"..%c0%af".to_string()));
    }

    #[test]
    fn traversal_depth() {
        assert_eq!(path_traversal(3, None), "../../../");
        assert_eq!(
            path_traversal(2, Some(EncodingKind::Url)),
            "..%2F..%2F"
        );
    }

    #[test]
    fn kind_from_str() {
        assert_eq!(
            EncodingKind::from_str("base64").unwrap(),
            EncodingKind::Base64
        );
        assert!(EncodingKind::from_str("rot13").is_err());
    }
}
