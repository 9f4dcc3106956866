/*
 * parser.rs
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

//! HTTP/2 frame pull parser: consume one complete frame at a time from
//! an accumulation buffer. Returns `None` while fewer than 9 bytes, or
//! fewer than 9 + length bytes, are buffered; callers loop until `None`
//! to frame a byte stream. Payload decode helpers honor PADDED and
//! PRIORITY on inbound frames.

use bytes::{Buf, Bytes, BytesMut};
use std::io;

use super::frame::*;

/// Pop the next complete frame, or `None` while the buffer is short.
/// The reserved high bit of the stream id is ignored.
pub fn parse_frame(buf: &mut BytesMut) -> Option<Frame> {
    if buf.len() < FRAME_HEADER_LENGTH {
        return None;
    }
    let length = ((buf[0] as usize) << 16) | ((buf[1] as usize) << 8) | (buf[2] as usize);
    if buf.len() < FRAME_HEADER_LENGTH + length {
        return None;
    }
    let frame_type = buf[3];
    let flags = buf[4];
    let stream_id = (((buf[5] & 0x7f) as u32) << 24)
        | ((buf[6] as u32) << 16)
        | ((buf[7] as u32) << 8)
        | (buf[8] as u32);
    buf.advance(FRAME_HEADER_LENGTH);
    let payload = buf.split_to(length).freeze();
    Some(Frame {
        length: length as u32,
        frame_type,
        flags,
        stream_id,
        payload,
    })
}

/// Drain every complete frame from the buffer.
pub fn parse_all(buf: &mut BytesMut) -> Vec<Frame> {
    let mut frames = Vec::new();
    while let Some(frame) = parse_frame(buf) {
        frames.push(frame);
    }
    frames
}

/// DATA payload with PADDED stripped.
pub fn decode_data_payload(frame: &Frame) -> io::Result<Bytes> {
    let mut payload = frame.payload.clone();
    if !frame.has_flag(FLAG_PADDED) {
        return Ok(payload);
    }
    if payload.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "DATA frame PADDED but no pad length",
        ));
    }
    let pad_len = payload.get_u8() as usize;
    if payload.len() < pad_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "DATA frame padding exceeds payload",
        ));
    }
    let data_len = payload.len() - pad_len;
    Ok(payload.split_to(data_len))
}

/// HEADERS payload: optional pad length, optional priority fields, then
/// the header block with trailing padding removed.
pub fn decode_headers_payload(frame: &Frame) -> io::Result<(Option<Priority>, Bytes)> {
    let mut payload = frame.payload.clone();
    let pad_len = if frame.has_flag(FLAG_PADDED) {
        if payload.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "HEADERS frame PADDED but no pad length",
            ));
        }
        payload.get_u8() as usize
    } else {
        0
    };
    let priority = if frame.has_flag(FLAG_PRIORITY) {
        if payload.len() < 5 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "HEADERS frame PRIORITY fields truncated",
            ));
        }
        let b0 = payload.get_u8();
        let exclusive = (b0 & 0x80) != 0;
        let dependency = (((b0 & 0x7f) as u32) << 24)
            | ((payload.get_u8() as u32) << 16)
            | ((payload.get_u8() as u32) << 8)
            | (payload.get_u8() as u32);
        let weight = payload.get_u8() as u16 + 1;
        Some(Priority {
            exclusive,
            dependency,
            weight,
        })
    } else {
        None
    };
    if payload.len() < pad_len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "HEADERS frame padding exceeds payload",
        ));
    }
    let block_len = payload.len() - pad_len;
    Ok((priority, payload.split_to(block_len)))
}

/// SETTINGS payload: a sequence of (id, value) 6-byte entries.
pub fn decode_settings_payload(frame: &Frame) -> io::Result<Vec<(u16, u32)>> {
    if frame.payload.len() % 6 != 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "SETTINGS payload size must be a multiple of 6",
        ));
    }
    let mut payload = frame.payload.clone();
    let mut settings = Vec::with_capacity(payload.len() / 6);
    while payload.len() >= 6 {
        let id = payload.get_u16();
        let value = payload.get_u32();
        settings.push((id, value));
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::super::writer::FrameWriter;
    use super::*;

    fn frames_from(writer: &mut FrameWriter) -> Vec<Frame> {
        let mut buf = BytesMut::from(&writer.take_buffer()[..]);
        parse_all(&mut buf)
    }

    #[test]
    fn short_buffers_return_none() {
        let mut buf = BytesMut::from(&[0u8; 8][..]);
        assert!(parse_frame(&mut buf).is_none());
        // header claims 16 payload bytes, only 4 present
        let mut buf = BytesMut::from(&[0, 0, 16, 0, 0, 0, 0, 0, 1, 1, 2, 3, 4][..]);
        assert!(parse_frame(&mut buf).is_none());
        assert_eq!(buf.len(), 13); // untouched
    }

    #[test]
    fn roundtrip_every_frame_type() {
        let mut writer = FrameWriter::new();
        writer.write_data(1, b"payload", true, None);
        writer.write_headers(3, b"\x82", false, true);
        writer.write_settings(&[(SETTINGS_MAX_CONCURRENT_STREAMS, 100)]);
        writer.write_settings_ack();
        writer.write_window_update(0, 65535);
        writer.write_ping(0x0102_0304_0506_0708, false);
        writer.write_goaway(5, 2, b"bye");
        writer.write_rst_stream(7, 8);
        writer.write_priority(
            9,
            Priority {
                exclusive: true,
                dependency: 3,
                weight: 16,
            },
        );

        let frames = frames_from(&mut writer);
        assert_eq!(frames.len(), 9);

        assert_eq!(frames[0].frame_type, TYPE_DATA);
        assert_eq!(frames[0].stream_id, 1);
        assert!(frames[0].has_flag(FLAG_END_STREAM));
        assert_eq!(&frames[0].payload[..], b"payload");

        assert_eq!(frames[1].frame_type, TYPE_HEADERS);
        assert!(frames[1].has_flag(FLAG_END_HEADERS));
        assert!(!frames[1].has_flag(FLAG_END_STREAM));

        assert_eq!(frames[2].frame_type, TYPE_SETTINGS);
        assert_eq!(
            decode_settings_payload(&frames[2]).unwrap(),
            vec![(SETTINGS_MAX_CONCURRENT_STREAMS, 100)]
        );

        assert_eq!(frames[3].frame_type, TYPE_SETTINGS);
        assert!(frames[3].has_flag(FLAG_ACK));
        assert!(frames[3].payload.is_empty());

        assert_eq!(frames[4].frame_type, TYPE_WINDOW_UPDATE);
        assert_eq!(&frames[4].payload[..], &[0, 0, 0xff, 0xff]);

        assert_eq!(frames[5].frame_type, TYPE_PING);
        assert_eq!(frames[5].length, 8);

        assert_eq!(frames[6].frame_type, TYPE_GOAWAY);
        assert_eq!(&frames[6].payload[..4], &[0, 0, 0, 5]);
        assert_eq!(&frames[6].payload[8..], b"bye");

        assert_eq!(frames[7].frame_type, TYPE_RST_STREAM);
        assert_eq!(&frames[7].payload[..], &[0, 0, 0, 8]);

        assert_eq!(frames[8].frame_type, TYPE_PRIORITY);
        assert_eq!(frames[8].length, 5);
    }

    #[test]
    fn data_padding_roundtrip() {
        let mut writer = FrameWriter::new();
        writer.write_data(1, b"abc", false, Some(4));
        let frames = frames_from(&mut writer);
        assert!(frames[0].has_flag(FLAG_PADDED));
        assert_eq!(frames[0].length, 8); // 1 + 3 + 4
        assert_eq!(&decode_data_payload(&frames[0]).unwrap()[..], b"abc");
    }

    #[test]
    fn headers_priority_decoded_on_inbound() {
        let mut writer = FrameWriter::new();
        writer.write_headers_with_priority(
            1,
            b"\x82\x87",
            true,
            true,
            Priority {
                exclusive: true,
                dependency: 7,
                weight: 32,
            },
        );
        let frames = frames_from(&mut writer);
        let (priority, block) = decode_headers_payload(&frames[0]).unwrap();
        let priority = priority.unwrap();
        assert!(priority.exclusive);
        assert_eq!(priority.dependency, 7);
        assert_eq!(priority.weight, 32);
        assert_eq!(&block[..], b"\x82\x87");
    }

    #[test]
    fn reserved_stream_bit_ignored() {
        let mut buf = BytesMut::new();
        // length 0, type DATA, flags 0, stream id with reserved bit set
        buf.extend_from_slice(&[0, 0, 0, 0, 0, 0x80, 0, 0, 1]);
        let frame = parse_frame(&mut buf).unwrap();
        assert_eq!(frame.stream_id, 1);
    }

    #[test]
    fn partial_then_complete() {
        let mut writer = FrameWriter::new();
        writer.write_ping(42, true);
        let bytes = writer.take_buffer();
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&bytes[..10]);
        assert!(parse_frame(&mut buf).is_none());
        buf.extend_from_slice(&bytes[10..]);
        let frame = parse_frame(&mut buf).unwrap();
        assert_eq!(frame.frame_type, TYPE_PING);
        assert!(frame.has_flag(FLAG_ACK));
    }
}
