/*
 * decoder.rs
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

//! HPACK decoder (RFC 7541). Covers all four representations: indexed,
//! literal with incremental indexing, dynamic-table size update, and
//! literal without/never indexing. Indices 1..=61 resolve in the static
//! table, 62 and up in the dynamic table (most recent first).

use bytes::Buf;
use std::io;

use super::huffman;
use super::static_table::{STATIC_TABLE, STATIC_TABLE_ENTRIES};

pub struct Decoder {
    max_size: usize,
    /// MRU order: new entries are prepended.
    dynamic_table: Vec<(String, String)>,
}

impl Decoder {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            dynamic_table: Vec::new(),
        }
    }

    /// Decode one header block into an ordered (name, value) list.
    pub fn decode<B: Buf>(&mut self, buf: &mut B) -> io::Result<Vec<(String, String)>> {
        let mut headers = Vec::new();
        while buf.has_remaining() {
            let opcode = buf.get_u8();
            if (opcode & 0x80) != 0 {
                // Indexed header field (§6.1)
                let index = decode_integer(buf, opcode, 7)?;
                headers.push(self.get_table_entry(index)?);
            } else if (opcode & 0x40) != 0 {
                // Literal with incremental indexing (§6.2.1)
                let (name, value) = self.read_literal(buf, opcode, 6)?;
                self.insert(name.clone(), value.clone());
                headers.push((name, value));
            } else if (opcode & 0x20) != 0 {
                // Dynamic table size update (§6.3)
                let size = decode_integer(buf, opcode, 5)? as usize;
                if size == 0 {
                    self.dynamic_table.clear();
                }
                self.max_size = size;
                self.evict_to(size);
            } else {
                // Literal without indexing / never indexed (§6.2.2, §6.2.3)
                let (name, value) = self.read_literal(buf, opcode, 4)?;
                headers.push((name, value));
            }
        }
        Ok(headers)
    }

    /// Resolve an index: 1..=61 static, >=62 dynamic at `index - 62`.
    pub fn get_table_entry(&self, index: u64) -> io::Result<(String, String)> {
        if index == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "HPACK indexed header index 0",
            ));
        }
        if index <= STATIC_TABLE_ENTRIES as u64 {
            let (name, value) = STATIC_TABLE[index as usize];
            return Ok((name.to_string(), value.unwrap_or("").to_string()));
        }
        let dyn_index = (index - 62) as usize;
        self.dynamic_table
            .get(dyn_index)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "HPACK index out of range"))
    }

    fn read_literal<B: Buf>(
        &self,
        buf: &mut B,
        opcode: u8,
        nbits: u8,
    ) -> io::Result<(String, String)> {
        let index = decode_integer(buf, opcode, nbits)?;
        let name = if index == 0 {
            decode_string(buf)?
        } else {
            self.get_table_entry(index)?.0
        };
        let value = decode_string(buf)?;
        Ok((name, value))
    }

    fn insert(&mut self, name: String, value: String) {
        let entry_size = name.len() + value.len() + 32;
        while self.size() + entry_size > self.max_size && !self.dynamic_table.is_empty() {
            self.dynamic_table.pop();
        }
        if self.size() + entry_size <= self.max_size {
            self.dynamic_table.insert(0, (name, value));
        }
    }

    fn size(&self) -> usize {
        self.dynamic_table
            .iter()
            .map(|(n, v)| n.len() + v.len() + 32)
            .sum()
    }

    fn evict_to(&mut self, max: usize) {
        while self.size() > max && !self.dynamic_table.is_empty() {
            self.dynamic_table.pop();
        }
    }
}

fn decode_integer<B: Buf>(buf: &mut B, opcode: u8, nbits: u8) -> io::Result<u64> {
    let nmask = (1u64 << nbits) - 1;
    let mut value = (opcode as u64) & nmask;
    if value < nmask {
        return Ok(value);
    }
    let mut shift = 0u32;
    loop {
        if !buf.has_remaining() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "HPACK integer truncated",
            ));
        }
        let b = buf.get_u8();
        value += ((b & 0x7f) as u64) << shift;
        if (b & 0x80) == 0 {
            break;
        }
        shift += 7;
        if shift > 63 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "HPACK integer too large",
            ));
        }
    }
    Ok(value)
}

/// String literal: H flag in bit 7, 7-bit length, raw bytes. Huffman
/// strings decode through the full Appendix B decoder.
fn decode_string<B: Buf>(buf: &mut B) -> io::Result<String> {
    if !buf.has_remaining() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "HPACK string length missing",
        ));
    }
    let b = buf.get_u8();
    let huffman_coded = (b & 0x80) != 0;
    let len = decode_integer(buf, b, 7)? as usize;
    if buf.remaining() < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "HPACK string truncated",
        ));
    }
    let mut bytes = vec![0u8; len];
    buf.copy_to_slice(&mut bytes);
    let bytes = if huffman_coded {
        huffman::decode(&bytes)?
    } else {
        bytes
    };
    String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "HPACK string not UTF-8"))
}

#[cfg(test)]
mod tests {
    use super::super::encoder::Encoder;
    use super::*;
    use bytes::BytesMut;

    fn decode_all(data: &[u8]) -> Vec<(String, String)> {
        Decoder::new(4096).decode(&mut &data[..]).unwrap()
    }

    #[test]
    fn indexed_static() {
        let headers = decode_all(&[0x82]);
        assert_eq!(headers, vec![(":method".to_string(), "GET".to_string())]);
    }

    #[test]
    fn multiple_indexed() {
        let headers = decode_all(&[0x82, 0x87, 0x84]);
        assert_eq!(headers[0].1, "GET");
        assert_eq!(headers[1].1, "https");
        assert_eq!(headers[2].1, "/");
    }

    #[test]
    fn literal_without_indexing_plain() {
        let headers = decode_all(&[
            0x00, // literal, new name
            0x03, b'f', b'o', b'o',
            0x03, b'b', b'a', b'r',
        ]);
        assert_eq!(headers, vec![("foo".to_string(), "bar".to_string())]);
    }

    #[test]
    fn literal_with_indexing_enters_dynamic_table() {
        let mut decoder = Decoder::new(4096);
        let block: &[u8] = &[
            0x40, // literal with incremental indexing, new name
            0x04, b't', b'e', b's', b't',
            0x05, b'v', b'a', b'l', b'u', b'e',
        ];
        let headers = decoder.decode(&mut &block[..]).unwrap();
        assert_eq!(headers, vec![("test".to_string(), "value".to_string())]);
        // index 62 now refers to the inserted entry
        let again = decoder.decode(&mut &[0xbe][..]).unwrap();
        assert_eq!(again, vec![("test".to_string(), "value".to_string())]);
    }

    #[test]
    fn size_update_zero_clears_table() {
        let mut decoder = Decoder::new(4096);
        let block: &[u8] = &[0x40, 0x01, b'a', 0x01, b'b'];
        decoder.decode(&mut &block[..]).unwrap();
        assert!(decoder.get_table_entry(62).is_ok());
        decoder.decode(&mut &[0x20][..]).unwrap();
        assert!(decoder.get_table_entry(62).is_err());
    }

    #[test]
    fn huffman_string_literal() {
        // name "x" plain, value "abc" Huffman ([0x1c, 0x64])
        let headers = decode_all(&[0x00, 0x01, b'x', 0x82, 0x1c, 0x64]);
        assert_eq!(headers, vec![("x".to_string(), "abc".to_string())]);
    }

    #[test]
    fn index_zero_rejected() {
        assert!(Decoder::new(4096).decode(&mut &[0x80][..]).is_err());
    }

    #[test]
    fn truncated_string_rejected() {
        assert!(Decoder::new(4096).decode(&mut &[0x00, 0x05, b'a'][..]).is_err());
    }

    #[test]
    fn roundtrip_incremental_and_indexed() {
        let input: &[(&str, &str)] = &[
            (":method", "GET"),
            (":scheme", "https"),
            (":authority", "target.example"),
            (":path", "/probe"),
            ("accept", "text/html"),
            ("x-custom", "weird value"),
            ("x-custom", "weird value"),
        ];
        let mut buf = BytesMut::new();
        Encoder::new().encode(input, &mut buf);
        let decoded = Decoder::new(4096).decode(&mut &buf[..]).unwrap();
        let expected: Vec<(String, String)> = input
            .iter()
            .map(|&(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn roundtrip_without_indexing() {
        let input: &[(&str, &str)] = &[("accept", "x"), ("x-probe", "1")];
        let mut buf = BytesMut::new();
        Encoder::new().encode_without_indexing(input, &mut buf);
        let decoded = Decoder::new(4096).decode(&mut &buf[..]).unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0], ("accept".to_string(), "x".to_string()));
        assert_eq!(decoded[1], ("x-probe".to_string(), "1".to_string()));
    }
}
