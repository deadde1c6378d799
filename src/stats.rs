use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters collected during one pipeline run
#[derive(Default)]
pub struct RunStats {
    pub pages_seen: AtomicU64,
    pub pages_fetched: AtomicU64,
    pub fetch_errors: AtomicU64,
    pub records_accepted: AtomicU64,
    pub records_unchanged: AtomicU64,
    pub records_rejected: AtomicU64,
    pub images_resolved: AtomicU64,
    pub variants_truncated: AtomicU64,
    pub walk_errors: AtomicU64,
    pub checkpoint_writes: AtomicU64,
}

/// Plain copy of the counters for reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub pages_seen: u64,
    pub pages_fetched: u64,
    pub fetch_errors: u64,
    pub records_accepted: u64,
    pub records_unchanged: u64,
    pub records_rejected: u64,
    pub images_resolved: u64,
    pub variants_truncated: u64,
    pub walk_errors: u64,
    pub checkpoint_writes: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_pages_seen(&self) {
        self.pages_seen.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pages_fetched(&self) {
        self.pages_fetched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetch_errors(&self) {
        self.fetch_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_accepted(&self) {
        self.records_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unchanged(&self) {
        self.records_unchanged.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected(&self) {
        self.records_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_images(&self) {
        self.images_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_truncated(&self) {
        self.variants_truncated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_walk_errors(&self) {
        self.walk_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_checkpoint_writes(&self) {
        self.checkpoint_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_seen(&self) -> u64 {
        self.pages_seen.load(Ordering::Relaxed)
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn fetch_errors(&self) -> u64 {
        self.fetch_errors.load(Ordering::Relaxed)
    }

    pub fn accepted(&self) -> u64 {
        self.records_accepted.load(Ordering::Relaxed)
    }

    pub fn unchanged(&self) -> u64 {
        self.records_unchanged.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.records_rejected.load(Ordering::Relaxed)
    }

    pub fn images(&self) -> u64 {
        self.images_resolved.load(Ordering::Relaxed)
    }

    pub fn truncated(&self) -> u64 {
        self.variants_truncated.load(Ordering::Relaxed)
    }

    pub fn walk_errors(&self) -> u64 {
        self.walk_errors.load(Ordering::Relaxed)
    }

    pub fn checkpoint_writes(&self) -> u64 {
        self.checkpoint_writes.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            pages_seen: self.pages_seen(),
            pages_fetched: self.pages_fetched(),
            fetch_errors: self.fetch_errors(),
            records_accepted: self.accepted(),
            records_unchanged: self.unchanged(),
            records_rejected: self.rejected(),
            images_resolved: self.images(),
            variants_truncated: self.truncated(),
            walk_errors: self.walk_errors(),
            checkpoint_writes: self.checkpoint_writes(),
        }
    }
}
