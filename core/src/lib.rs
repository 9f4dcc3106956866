/*
 * lib.rs
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

//! Byte-level HTTP toolkit for authorized security testing and protocol
//! research. The caller controls the exact bytes placed on the wire:
//! malformed framing, conflicting length indicators, grammar-violating
//! header lines, pre-compression HTTP/2 header blocks. Nothing is
//! sanitized or corrected on the way out.
//!
//! - [`http::request`]: assemble well-formed or deliberately malformed
//!   HTTP/1.x request bytes.
//! - [`http::h1`]: raw async transport (single, pipelined, CONNECT tunnel).
//! - [`http::h2`] + [`http::hpack`]: HTTP/2 frame engine and HPACK codec.
//! - [`http::response`]: lenient response parsing with analyzer views.
//! - [`http::recipes`]: parameterized attack request constructors.
//! - [`encoding`] / [`diff`]: bypass payload encoders and record diffing.

pub mod diff;
pub mod encoding;
pub mod http;
pub mod net;
