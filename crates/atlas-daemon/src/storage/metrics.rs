use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct StorageMetrics {
    pub reads: AtomicU64,
    pub writes: AtomicU64,
    pub transactions: AtomicU64,
    pub aborts: AtomicU64,
    pub flushes: AtomicU64,
    pub errors: AtomicU64,
}

impl StorageMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StorageMetricsSnapshot {
        StorageMetricsSnapshot {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            transactions: self.transactions.load(Ordering::Relaxed),
            aborts: self.aborts.load(Ordering::Relaxed),
            flushes: self.flushes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageMetricsSnapshot {
    pub reads: u64,
    pub writes: u64,
    pub transactions: u64,
    pub aborts: u64,
    pub flushes: u64,
    pub errors: u64,
}
