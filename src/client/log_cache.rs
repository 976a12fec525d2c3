// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for transaction log lookups.
//!
//! Committed logs never change; they can only disappear when the node
//! prunes them. Entries therefore carry a TTL so a pruned transaction is
//! eventually reported as missing again.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::program::OpId;

struct CacheEntry {
    logs: Vec<String>,
    inserted_at: Instant,
}

/// In-process LRU cache keyed by transaction id.
pub struct LogCache {
    cache: Mutex<LruCache<OpId, CacheEntry>>,
    ttl: Duration,
}

impl LogCache {
    /// - `capacity`: max number of transactions cached (at least one).
    /// - `ttl`: time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Cached logs for `op_id`, `None` if absent or expired.
    pub fn get(&self, op_id: &OpId) -> Option<Vec<String>> {
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(op_id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.logs.clone());
            }
            cache.pop(op_id);
        }
        None
    }

    pub fn put(&self, op_id: OpId, logs: Vec<String>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                op_id,
                CacheEntry {
                    logs,
                    inserted_at: Instant::now(),
                },
            );
        }
    }
}
