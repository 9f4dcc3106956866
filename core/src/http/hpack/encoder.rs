/*
 * encoder.rs
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

//! HPACK encoder (RFC 7541). Emits indexed fields for exact static-table
//! matches and literal-with-incremental-indexing otherwise; strings are
//! always plain (`H=0`) so the header block bytes stay predictable for
//! testing. A literal-without-indexing mode is kept for probing how
//! peers treat the 4-bit representation.

use bytes::BufMut;

use super::static_table::STATIC_TABLE;

/// N-bit prefix integer (RFC 7541 §5.1): the value fits the prefix, or
/// the prefix saturates and the remainder follows in 7-bit groups,
/// least significant first, high bit marking continuation.
pub fn encode_integer(mut value: u64, nbits: u8, prefix: u8, out: &mut impl BufMut) {
    let max_prefix = (1u64 << nbits) - 1;
    if value < max_prefix {
        out.put_u8(prefix | value as u8);
        return;
    }
    out.put_u8(prefix | max_prefix as u8);
    value -= max_prefix;
    while value >= 128 {
        out.put_u8(0x80 | (value % 128) as u8);
        value /= 128;
    }
    out.put_u8(value as u8);
}

/// String literal with `H=0`: 7-bit length then raw bytes.
fn encode_string_plain(s: &[u8], out: &mut impl BufMut) {
    encode_integer(s.len() as u64, 7, 0x00, out);
    out.put_slice(s);
}

fn find_static_exact(name: &str, value: &str) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .position(|&(n, v)| n == name && v == Some(value))
}

fn find_static_name(name: &str) -> Option<usize> {
    STATIC_TABLE
        .iter()
        .skip(1)
        .position(|&(n, _)| n == name)
        .map(|i| i + 1)
}

/// Stateful encoder. The dynamic table mirrors what a decoder tracking
/// this stream inserts; it is never referenced when encoding (indexed
/// fields come from the static table only) and never evicted, which is
/// sound for the bounded header sets this tool emits.
#[derive(Default)]
pub struct Encoder {
    dynamic_table: Vec<(String, String)>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a header list into `out`, in order.
    pub fn encode(&mut self, headers: &[(&str, &str)], out: &mut impl BufMut) {
        for &(name, value) in headers {
            if let Some(index) = find_static_exact(name, value) {
                // Indexed header field (§6.1): 1-bit flag, 7-bit index.
                encode_integer(index as u64, 7, 0x80, out);
            } else if let Some(index) = find_static_name(name) {
                // Literal with incremental indexing, indexed name (§6.2.1).
                encode_integer(index as u64, 6, 0x40, out);
                encode_string_plain(value.as_bytes(), out);
                self.dynamic_table
                    .insert(0, (name.to_string(), value.to_string()));
            } else {
                // Literal with incremental indexing, new name.
                out.put_u8(0x40);
                encode_string_plain(name.as_bytes(), out);
                encode_string_plain(value.as_bytes(), out);
                self.dynamic_table
                    .insert(0, (name.to_string(), value.to_string()));
            }
        }
    }

    /// Literal-without-indexing for every field (§6.2.2, 4-bit prefix).
    /// Nothing enters the dynamic table on either side.
    pub fn encode_without_indexing(&mut self, headers: &[(&str, &str)], out: &mut impl BufMut) {
        for &(name, value) in headers {
            if let Some(index) = find_static_name(name) {
                encode_integer(index as u64, 4, 0x00, out);
            } else {
                out.put_u8(0x00);
                encode_string_plain(name.as_bytes(), out);
            }
            encode_string_plain(value.as_bytes(), out);
        }
    }

    /// Entries inserted so far, most recent first.
    pub fn dynamic_table(&self) -> &[(String, String)] {
        &self.dynamic_table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn static_exact_match_is_single_indexed_byte() {
        let mut buf = BytesMut::new();
        Encoder::new().encode(&[(":method", "GET")], &mut buf);
        assert_eq!(&buf[..], &[0x82]);
    }

    #[test]
    fn static_exact_matches() {
        for (header, byte) in [
            ((":method", "POST"), 0x83u8),
            ((":path", "/"), 0x84),
            ((":scheme", "https"), 0x87),
            ((":status", "200"), 0x88),
        ] {
            let mut buf = BytesMut::new();
            Encoder::new().encode(&[header], &mut buf);
            assert_eq!(&buf[..], &[byte]);
        }
    }

    #[test]
    fn name_match_uses_incremental_indexing() {
        let mut encoder = Encoder::new();
        let mut buf = BytesMut::new();
        encoder.encode(&[("accept", "text/html")], &mut buf);
        // accept is static index 19: 0x40 | 19, then plain 9-byte value
        assert_eq!(buf[0], 0x53);
        assert_eq!(buf[1], 9);
        assert_eq!(&buf[2..], b"text/html");
        assert_eq!(encoder.dynamic_table().len(), 1);
    }

    #[test]
    fn new_name_literal() {
        let mut encoder = Encoder::new();
        let mut buf = BytesMut::new();
        encoder.encode(&[("x-probe", "1")], &mut buf);
        assert_eq!(buf[0], 0x40);
        assert_eq!(buf[1], 7); // name length, H=0
        assert_eq!(&buf[2..9], b"x-probe");
        assert_eq!(buf[9], 1);
        assert_eq!(&buf[10..], b"1");
        assert_eq!(
            encoder.dynamic_table()[0],
            ("x-probe".to_string(), "1".to_string())
        );
    }

    #[test]
    fn without_indexing_uses_4bit_prefix() {
        let mut buf = BytesMut::new();
        Encoder::new().encode_without_indexing(&[("accept", "x")], &mut buf);
        // 4-bit prefix: 0x00 | 15 saturates at accept's index 19
        assert_eq!(buf[0], 0x0f);
        assert_eq!(buf[1], 4); // 19 - 15 continuation
        assert_eq!(buf[2], 1);
        assert_eq!(&buf[3..], b"x");
    }

    #[test]
    fn integer_prefix_boundaries() {
        let mut buf = BytesMut::new();
        encode_integer(10, 7, 0x00, &mut buf);
        assert_eq!(&buf[..], &[10]);

        let mut buf = BytesMut::new();
        encode_integer(127, 7, 0x00, &mut buf);
        assert_eq!(&buf[..], &[0x7f, 0x00]);

        let mut buf = BytesMut::new();
        encode_integer(300, 7, 0x00, &mut buf);
        assert_eq!(&buf[..], &[0x7f, 173]);

        // RFC 7541 C.1.2: 1337 with 5-bit prefix
        let mut buf = BytesMut::new();
        encode_integer(1337, 5, 0x00, &mut buf);
        assert_eq!(&buf[..], &[0x1f, 0x9a, 0x0a]);
    }
}
