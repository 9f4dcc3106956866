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

//! HTTP core: request assembly, response parsing, raw HTTP/1.x transport,
//! HTTP/2 frame engine with HPACK, connection pooling, attack recipes.
//!
//! Backends are a closed set (raw HTTP/1.x over TCP/TLS, HTTP/2 over TLS)
//! behind plain data records; there is no shared client supertype. The
//! response analyzer is a view over the parsed record, computed on demand.

pub mod options;
pub mod pool;
pub mod recipes;
pub mod request;
pub mod response;

pub mod h1;
pub mod h2;
pub mod hpack;

pub use options::{
    Origin, ProxyAuth, ProxyConfig, ProxyProtocol, Scheme, SendOptions, Timing, TlsOptions,
    TlsVersion,
};
pub use pool::{ConnectionPool, PoolStats};
pub use request::{HeaderEntry, LineEnding, Malformation, RequestPlan};
pub use response::{parse_response, ParsedResponse};
