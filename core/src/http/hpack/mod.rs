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

//! HPACK (RFC 7541) subset for HTTP/2 security testing: static table,
//! integer/string primitives, indexed and literal representations, and
//! a decoder covering all four representation forms. Strings are always
//! emitted plain (`H=0`); inbound Huffman strings decode fully.

mod decoder;
mod encoder;
mod huffman;
mod static_table;

pub use decoder::Decoder;
pub use encoder::{encode_integer, Encoder};
pub use static_table::{STATIC_TABLE, STATIC_TABLE_ENTRIES};
