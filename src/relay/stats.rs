//! Per-session byte and chunk counters

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the relay tasks of one session.
///
/// Each counter pair has a single writer (inbound relay or outbound drain).
#[derive(Debug, Default)]
pub struct SessionStats {
    bytes_in: AtomicU64,
    chunks_in: AtomicU64,
    bytes_out: AtomicU64,
    chunks_out: AtomicU64,
}

/// Point-in-time copy of [`SessionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub bytes_in: u64,
    pub chunks_in: u64,
    pub bytes_out: u64,
    pub chunks_out: u64,
}

impl SessionStats {
    pub fn record_in(&self, len: usize) {
        self.bytes_in.fetch_add(len as u64, Ordering::Relaxed);
        self.chunks_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_out(&self, len: usize) {
        self.bytes_out.fetch_add(len as u64, Ordering::Relaxed);
        self.chunks_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            bytes_in: self.bytes_in.load(Ordering::Relaxed),
            chunks_in: self.chunks_in.load(Ordering::Relaxed),
            bytes_out: self.bytes_out.load(Ordering::Relaxed),
            chunks_out: self.chunks_out.load(Ordering::Relaxed),
        }
    }
}
