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

//! Raw HTTP/1.x: async socket transport and pipelined response framing.

pub mod split;
pub mod transport;

pub use split::{count_complete, frame_one, split_buffer};
pub use transport::RawClient;
