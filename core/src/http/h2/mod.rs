/*
 * mod.rs
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

//! HTTP/2 frame engine: binary framer, pull parser, and a client that
//! sequences preface + SETTINGS + HEADERS + DATA and reassembles the
//! stream-1 response from inbound frames.

pub mod client;
pub mod frame;
pub mod parser;
pub mod writer;

pub use client::{send, send_raw_frames, H2Response, RawFrames};
pub use frame::{Frame, Priority, PREFACE};
pub use parser::{
    decode_data_payload, decode_headers_payload, decode_settings_payload, parse_frame,
};
pub use writer::FrameWriter;
