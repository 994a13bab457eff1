//! 📊 Bulk counters. Bumped by every flush worker, snapshotted by whoever asks.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// 📊 A point-in-time copy of the bulk counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkStats {
    /// 📥 Items accepted by `add`.
    pub num_added: u64,
    /// 📤 Items that rode a `_bulk` request that got a 2xx answer.
    pub num_flushed: u64,
    /// 💀 Items that failed, either with their whole request or individually.
    pub num_failed: u64,
    /// ✅ Items the cluster confirmed (created or updated).
    pub num_indexed: u64,
    pub num_created: u64,
    pub num_updated: u64,
    /// 📡 `_bulk` requests attempted.
    pub num_requests: u64,
    /// 📦 Uncompressed payload bytes sent in successful requests.
    pub flushed_bytes: u64,
}

#[derive(Debug, Default)]
pub(crate) struct BulkCounters {
    added: AtomicU64,
    flushed: AtomicU64,
    failed: AtomicU64,
    indexed: AtomicU64,
    created: AtomicU64,
    updated: AtomicU64,
    requests: AtomicU64,
    flushed_bytes: AtomicU64,
}

impl BulkCounters {
    pub(crate) fn added(&self) {
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn flushed(&self, docs: u64, bytes: u64) {
        self.flushed.fetch_add(docs, Ordering::Relaxed);
        self.flushed_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn failed(&self, docs: u64) {
        self.failed.fetch_add(docs, Ordering::Relaxed);
    }

    pub(crate) fn created(&self) {
        self.indexed.fetch_add(1, Ordering::Relaxed);
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn updated(&self) {
        self.indexed.fetch_add(1, Ordering::Relaxed);
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    /// ✅ Confirmed, but with a `result` we don't track separately (e.g. `noop`).
    pub(crate) fn indexed(&self) {
        self.indexed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> BulkStats {
        BulkStats {
            num_added: self.added.load(Ordering::Relaxed),
            num_flushed: self.flushed.load(Ordering::Relaxed),
            num_failed: self.failed.load(Ordering::Relaxed),
            num_indexed: self.indexed.load(Ordering::Relaxed),
            num_created: self.created.load(Ordering::Relaxed),
            num_updated: self.updated.load(Ordering::Relaxed),
            num_requests: self.requests.load(Ordering::Relaxed),
            flushed_bytes: self.flushed_bytes.load(Ordering::Relaxed),
        }
    }
}
