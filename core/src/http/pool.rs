/*
 * pool.rs
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

//! Keyed pool of idle TCP/TLS sockets for keep-alive sends.
//!
//! Keys are `scheme://host:port`. Entries are created on demand up to a
//! per-key cap, marked in-use on acquire, returned (not closed) on
//! release, and evicted by a periodic sweep once idle past the timeout.
//! The holder of an in-use entry is its sole user; the sweep only
//! touches idle entries.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::http::options::{now_ms, Origin, Scheme, TlsOptions};
use crate::net::{connect_tcp, connect_tls, HttpStream};

const ACQUIRE_POLL_MS: u64 = 100;
const SWEEP_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections_per_host: usize,
    pub idle_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: 6,
            idle_timeout_ms: 30_000,
        }
    }
}

struct Entry {
    id: u64,
    /// None while the socket is out with a holder.
    stream: Option<HttpStream>,
    last_used_ms: u64,
    in_use: bool,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Vec<Entry>>,
    next_id: u64,
}

/// A socket on loan from the pool. Call [`ConnectionPool::release`] to
/// return it; dropping it instead discards the slot (socket closed).
pub struct PooledSocket {
    stream: Option<HttpStream>,
    key: String,
    id: u64,
    inner: Arc<Mutex<Inner>>,
}

impl PooledSocket {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn stream_mut(&mut self) -> &mut HttpStream {
        self.stream.as_mut().expect("socket already released")
    }
}

impl Drop for PooledSocket {
    fn drop(&mut self) {
        // Still holding the stream means the socket was never released:
        // forget the slot so capacity frees up. The stream closes with it.
        if self.stream.is_none() {
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(list) = inner.entries.get_mut(&self.key) {
                list.retain(|e| e.id != self.id);
                if list.is_empty() {
                    inner.entries.remove(&self.key);
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub in_use: usize,
    pub idle: usize,
    pub hosts: Vec<(String, usize)>,
}

/// The only shared state in the library. Safe under concurrent
/// acquire/release; guard held only for map bookkeeping, never across
/// socket I/O.
pub struct ConnectionPool {
    config: PoolConfig,
    inner: Arc<Mutex<Inner>>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionPool {
    /// Requires a running tokio runtime (spawns the sweep task).
    pub fn new(config: PoolConfig) -> Self {
        let inner: Arc<Mutex<Inner>> = Arc::default();
        let sweeper = tokio::spawn(Self::sweep_loop(Arc::clone(&inner), config.idle_timeout_ms));
        Self {
            config,
            inner,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    async fn sweep_loop(inner: Arc<Mutex<Inner>>, idle_timeout_ms: u64) {
        loop {
            sleep(Duration::from_millis(SWEEP_INTERVAL_MS)).await;
            let now = now_ms();
            let mut guard = match inner.lock() {
                Ok(g) => g,
                Err(_) => return,
            };
            guard.entries.retain(|_, list| {
                list.retain(|e| {
                    e.in_use || now.saturating_sub(e.last_used_ms) <= idle_timeout_ms
                });
                !list.is_empty()
            });
        }
    }

    /// Hand out an idle socket for the origin, or open a new one while
    /// under the per-key cap, or poll every 100 ms until a slot frees.
    pub async fn acquire(&self, origin: &Origin, tls: &TlsOptions) -> io::Result<PooledSocket> {
        let key = origin.key();
        loop {
            enum Plan {
                Reuse(u64, HttpStream),
                Open(u64),
                Wait,
            }
            let plan = {
                let mut inner = self.inner.lock().expect("pool lock");
                let inner = &mut *inner;
                let list = inner.entries.entry(key.clone()).or_default();
                if let Some(entry) = list
                    .iter_mut()
                    .find(|e| !e.in_use && e.stream.is_some())
                {
                    entry.in_use = true;
                    let stream = entry.stream.take().expect("idle entry has stream");
                    Plan::Reuse(entry.id, stream)
                } else if list.len() < self.config.max_connections_per_host {
                    let id = inner.next_id;
                    inner.next_id += 1;
                    list.push(Entry {
                        id,
                        stream: None,
                        last_used_ms: now_ms(),
                        in_use: true,
                    });
                    Plan::Open(id)
                } else {
                    Plan::Wait
                }
            };
            match plan {
                Plan::Reuse(id, stream) => {
                    return Ok(PooledSocket {
                        stream: Some(stream),
                        key,
                        id,
                        inner: Arc::clone(&self.inner),
                    });
                }
                Plan::Open(id) => {
                    let connected = match origin.scheme {
                        Scheme::Https => {
                            connect_tls(&origin.host, origin.port, tls, &[]).await
                        }
                        Scheme::Http => connect_tcp(&origin.host, origin.port)
                            .await
                            .map(HttpStream::Plain),
                    };
                    match connected {
                        Ok(stream) => {
                            return Ok(PooledSocket {
                                stream: Some(stream),
                                key,
                                id,
                                inner: Arc::clone(&self.inner),
                            });
                        }
                        Err(e) => {
                            let mut inner = self.inner.lock().expect("pool lock");
                            if let Some(list) = inner.entries.get_mut(&key) {
                                list.retain(|entry| entry.id != id);
                                if list.is_empty() {
                                    inner.entries.remove(&key);
                                }
                            }
                            return Err(e);
                        }
                    }
                }
                Plan::Wait => sleep(Duration::from_millis(ACQUIRE_POLL_MS)).await,
            }
        }
    }

    /// Return the socket to its slot and refresh its idle clock.
    /// Releasing an already-dropped or foreign socket is a no-op.
    pub fn release(&self, mut socket: PooledSocket) {
        let Some(stream) = socket.stream.take() else {
            return;
        };
        let mut inner = self.inner.lock().expect("pool lock");
        if let Some(entry) = inner
            .entries
            .get_mut(&socket.key)
            .and_then(|list| list.iter_mut().find(|e| e.id == socket.id))
        {
            entry.stream = Some(stream);
            entry.in_use = false;
            entry.last_used_ms = now_ms();
        }
    }

    /// Stop the sweep and close every socket.
    pub fn destroy(&self) {
        if let Ok(mut sweeper) = self.sweeper.lock() {
            if let Some(handle) = sweeper.take() {
                handle.abort();
            }
        }
        if let Ok(mut inner) = self.inner.lock() {
            inner.entries.clear();
        }
    }

    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().expect("pool lock");
        let mut stats = PoolStats {
            total: 0,
            in_use: 0,
            idle: 0,
            hosts: Vec::new(),
        };
        for (key, list) in &inner.entries {
            stats.total += list.len();
            stats.in_use += list.iter().filter(|e| e.in_use).count();
            stats.idle += list.iter().filter(|e| !e.in_use).count();
            stats.hosts.push((key.clone(), list.len()));
        }
        stats.hosts.sort();
        stats
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc as StdArc;
    use tokio::net::TcpListener;

    /// Accepts and parks connections so the client side stays open.
    async fn local_origin() -> Origin {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });
        Origin::http("127.0.0.1", port)
    }

    #[tokio::test]
    async fn acquire_release_reuses_entry() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let origin = local_origin().await;
        let tls = TlsOptions::default();

        let socket = pool.acquire(&origin, &tls).await.unwrap();
        let stats = pool.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.in_use, 1);

        pool.release(socket);
        let stats = pool.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.idle, 1);

        let _again = pool.acquire(&origin, &tls).await.unwrap();
        assert_eq!(pool.stats().total, 1);
    }

    #[tokio::test]
    async fn waits_for_capacity() {
        let pool = StdArc::new(ConnectionPool::new(PoolConfig {
            max_connections_per_host: 1,
            ..PoolConfig::default()
        }));
        let origin = local_origin().await;
        let tls = TlsOptions::default();

        let first = pool.acquire(&origin, &tls).await.unwrap();
        let releaser = StdArc::clone(&pool);
        tokio::spawn(async move {
            sleep(Duration::from_millis(200)).await;
            releaser.release(first);
        });
        // Blocks on the 100ms poll until the release above lands.
        let second = pool.acquire(&origin, &tls).await.unwrap();
        assert_eq!(pool.stats().total, 1);
        pool.release(second);
    }

    #[tokio::test]
    async fn dropped_socket_frees_slot() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let origin = local_origin().await;
        let socket = pool.acquire(&origin, &TlsOptions::default()).await.unwrap();
        drop(socket);
        assert_eq!(pool.stats().total, 0);
    }

    #[tokio::test]
    async fn destroy_clears_everything() {
        let pool = ConnectionPool::new(PoolConfig::default());
        let origin = local_origin().await;
        let socket = pool.acquire(&origin, &TlsOptions::default()).await.unwrap();
        pool.release(socket);
        pool.destroy();
        assert_eq!(pool.stats().total, 0);
    }
}
