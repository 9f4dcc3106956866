/*
 * writer.rs
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

//! HTTP/2 frame serialization into a buffer. No validation beyond the
//! wire format itself: a testing tool is allowed to build frames a
//! compliant client would refuse to send (zero stream ids, odd
//! lengths). Reserved bits are emitted as zero.

use bytes::{BufMut, Bytes, BytesMut};

use super::frame::*;

/// Accumulates frames; the caller takes the buffer and writes it to the
/// stream in one shot.
#[derive(Default)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    fn frame_header(&mut self, length: usize, frame_type: u8, flags: u8, stream_id: u32) {
        self.buf.put_u8((length >> 16) as u8);
        self.buf.put_u8((length >> 8) as u8);
        self.buf.put_u8(length as u8);
        self.buf.put_u8(frame_type);
        self.buf.put_u8(flags);
        self.buf.put_u32(stream_id & 0x7fff_ffff);
    }

    /// Raw bytes spliced between frames (caller-crafted prefaces,
    /// deliberately broken frames).
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_preface(&mut self) {
        self.buf.extend_from_slice(PREFACE);
    }

    /// DATA frame; `padding` appends a pad-length prefix and that many
    /// zero bytes with the PADDED flag.
    pub fn write_data(&mut self, stream_id: u32, data: &[u8], end_stream: bool, padding: Option<u8>) {
        let mut flags = 0u8;
        if end_stream {
            flags |= FLAG_END_STREAM;
        }
        match padding {
            Some(pad) => {
                flags |= FLAG_PADDED;
                self.frame_header(1 + data.len() + pad as usize, TYPE_DATA, flags, stream_id);
                self.buf.put_u8(pad);
                self.buf.extend_from_slice(data);
                self.buf.put_bytes(0, pad as usize);
            }
            None => {
                self.frame_header(data.len(), TYPE_DATA, flags, stream_id);
                self.buf.extend_from_slice(data);
            }
        }
    }

    /// HEADERS frame carrying an HPACK header block. Priority and
    /// padding are not emitted here; inbound frames with either still
    /// parse.
    pub fn write_headers(
        &mut self,
        stream_id: u32,
        header_block: &[u8],
        end_stream: bool,
        end_headers: bool,
    ) {
        let mut flags = 0u8;
        if end_stream {
            flags |= FLAG_END_STREAM;
        }
        if end_headers {
            flags |= FLAG_END_HEADERS;
        }
        self.frame_header(header_block.len(), TYPE_HEADERS, flags, stream_id);
        self.buf.extend_from_slice(header_block);
    }

    pub fn write_headers_with_priority(
        &mut self,
        stream_id: u32,
        header_block: &[u8],
        end_stream: bool,
        end_headers: bool,
        priority: Priority,
    ) {
        let mut flags = FLAG_PRIORITY;
        if end_stream {
            flags |= FLAG_END_STREAM;
        }
        if end_headers {
            flags |= FLAG_END_HEADERS;
        }
        self.frame_header(5 + header_block.len(), TYPE_HEADERS, flags, stream_id);
        self.put_priority(priority);
        self.buf.extend_from_slice(header_block);
    }

    fn put_priority(&mut self, priority: Priority) {
        let mut dependency = priority.dependency & 0x7fff_ffff;
        if priority.exclusive {
            dependency |= 0x8000_0000;
        }
        self.buf.put_u32(dependency);
        self.buf
            .put_u8((priority.weight.clamp(1, 256) - 1) as u8);
    }

    /// SETTINGS payload of 6-byte (id, value) entries on stream 0.
    pub fn write_settings(&mut self, settings: &[(u16, u32)]) {
        self.frame_header(settings.len() * 6, TYPE_SETTINGS, 0, 0);
        for &(id, value) in settings {
            self.buf.put_u16(id);
            self.buf.put_u32(value);
        }
    }

    pub fn write_settings_ack(&mut self) {
        self.frame_header(0, TYPE_SETTINGS, FLAG_ACK, 0);
    }

    /// WINDOW_UPDATE; the increment's high bit is cleared on emit.
    pub fn write_window_update(&mut self, stream_id: u32, increment: u32) {
        self.frame_header(4, TYPE_WINDOW_UPDATE, 0, stream_id);
        self.buf.put_u32(increment & 0x7fff_ffff);
    }

    pub fn write_ping(&mut self, opaque_data: u64, ack: bool) {
        self.frame_header(8, TYPE_PING, if ack { FLAG_ACK } else { 0 }, 0);
        self.buf.put_u64(opaque_data);
    }

    pub fn write_goaway(&mut self, last_stream_id: u32, error_code: u32, debug_data: &[u8]) {
        self.frame_header(8 + debug_data.len(), TYPE_GOAWAY, 0, 0);
        self.buf.put_u32(last_stream_id & 0x7fff_ffff);
        self.buf.put_u32(error_code);
        self.buf.extend_from_slice(debug_data);
    }

    pub fn write_rst_stream(&mut self, stream_id: u32, error_code: u32) {
        self.frame_header(4, TYPE_RST_STREAM, 0, stream_id);
        self.buf.put_u32(error_code);
    }

    pub fn write_priority(&mut self, stream_id: u32, priority: Priority) {
        self.frame_header(5, TYPE_PRIORITY, 0, stream_id);
        self.put_priority(priority);
    }

    /// Take the accumulated bytes; the writer stays usable.
    pub fn take_buffer(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
