/*
 * split.rs
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

//! Pipelined response framing: split one accumulation buffer into N
//! responses. Per response, in order: locate the header/body separator;
//! honor `Content-Length`; else scan for the chunked terminator
//! `0\r\n\r\n`; else the response has no body. A buffer that runs out
//! mid-response yields whatever remains as the final response.

use crate::http::response::find;

/// Body-length indicators pulled from a header section, leniently.
fn body_indicators(head: &str) -> (Option<usize>, bool) {
    let mut content_length = None;
    let mut chunked = false;
    for line in head.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)).skip(1) {
        let Some(colon) = line.find(':') else { continue };
        if colon == 0 {
            continue;
        }
        let name = line[..colon].trim().to_ascii_lowercase();
        let value = line[colon + 1..].trim();
        if name == "content-length" && content_length.is_none() {
            content_length = value.parse::<usize>().ok();
        } else if name == "transfer-encoding" && value.to_ascii_lowercase().contains("chunked") {
            chunked = true;
        }
    }
    (content_length, chunked)
}

/// Byte length of the first complete response in `buf`, or `None` while
/// it is still incomplete.
pub fn frame_one(buf: &[u8]) -> Option<usize> {
    let (sep_end, head_len) = if let Some(pos) = find(buf, b"\r\n\r\n") {
        (pos + 4, pos)
    } else if let Some(pos) = find(buf, b"\n\n") {
        (pos + 2, pos)
    } else {
        return None;
    };
    let head = String::from_utf8_lossy(&buf[..head_len]);
    let (content_length, chunked) = body_indicators(&head);
    if let Some(n) = content_length {
        let total = sep_end.checked_add(n)?;
        (buf.len() >= total).then_some(total)
    } else if chunked {
        find(&buf[sep_end..], b"0\r\n\r\n").map(|rel| sep_end + rel + 5)
    } else {
        Some(sep_end)
    }
}

/// Number of complete responses at the head of `buf`.
pub fn count_complete(buf: &[u8]) -> usize {
    let mut rest = buf;
    let mut count = 0;
    while let Some(len) = frame_one(rest) {
        count += 1;
        rest = &rest[len..];
        if rest.is_empty() {
            break;
        }
    }
    count
}

/// Split `buf` into exactly `n` response byte chunks. Trailing entries
/// are empty when the buffer is exhausted; an incomplete final response
/// is returned as-is for lenient parsing.
pub fn split_buffer(buf: &[u8], n: usize) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(n);
    let mut rest = buf;
    for _ in 0..n {
        if rest.is_empty() {
            out.push(Vec::new());
            continue;
        }
        match frame_one(rest) {
            Some(len) => {
                out.push(rest[..len].to_vec());
                rest = &rest[len..];
            }
            None => {
                out.push(rest.to_vec());
                rest = &[];
            }
        }
    }
    out
}
