use dashmap::DashMap;
use ferrous_sieve_application::ports::QueryLogObserver;
use ferrous_sieve_domain::{FilterAction, LogEntry, RecordType};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Counters fed by the query log. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryMetrics {
    total_entries: Arc<AtomicU64>,

    blocked: Arc<AtomicU64>,

    allowed: Arc<AtomicU64>,

    cached: Arc<AtomicU64>,

    total_elapsed_us: Arc<AtomicU64>,

    record_type_counts: Arc<DashMap<RecordType, u64>>,

    upstream_counts: Arc<DashMap<Arc<str>, u64>>,

    flushes: Arc<AtomicU64>,

    flushed_entries: Arc<AtomicU64>,

    failed_flushes: Arc<AtomicU64>,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self {
            total_entries: Arc::new(AtomicU64::new(0)),
            blocked: Arc::new(AtomicU64::new(0)),
            allowed: Arc::new(AtomicU64::new(0)),
            cached: Arc::new(AtomicU64::new(0)),
            total_elapsed_us: Arc::new(AtomicU64::new(0)),
            record_type_counts: Arc::new(DashMap::new()),
            upstream_counts: Arc::new(DashMap::new()),
            flushes: Arc::new(AtomicU64::new(0)),
            flushed_entries: Arc::new(AtomicU64::new(0)),
            failed_flushes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn total_entries(&self) -> u64 {
        self.total_entries.load(Ordering::Relaxed)
    }

    pub fn blocked(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    pub fn allowed(&self) -> u64 {
        self.allowed.load(Ordering::Relaxed)
    }

    pub fn cached(&self) -> u64 {
        self.cached.load(Ordering::Relaxed)
    }

    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn flushed_entries(&self) -> u64 {
        self.flushed_entries.load(Ordering::Relaxed)
    }

    pub fn failed_flushes(&self) -> u64 {
        self.failed_flushes.load(Ordering::Relaxed)
    }

    pub fn avg_elapsed_us(&self) -> f64 {
        let total = self.total_entries();
        if total == 0 {
            return 0.0;
        }
        self.total_elapsed_us.load(Ordering::Relaxed) as f64 / total as f64
    }

    pub fn record_type_count(&self, record_type: RecordType) -> u64 {
        self.record_type_counts
            .get(&record_type)
            .map(|v| *v)
            .unwrap_or(0)
    }

    pub fn upstream_count(&self, upstream: &str) -> u64 {
        self.upstream_counts.get(upstream).map(|v| *v).unwrap_or(0)
    }

    pub fn reset(&self) {
        self.total_entries.store(0, Ordering::Relaxed);
        self.blocked.store(0, Ordering::Relaxed);
        self.allowed.store(0, Ordering::Relaxed);
        self.cached.store(0, Ordering::Relaxed);
        self.total_elapsed_us.store(0, Ordering::Relaxed);
        self.flushes.store(0, Ordering::Relaxed);
        self.flushed_entries.store(0, Ordering::Relaxed);
        self.failed_flushes.store(0, Ordering::Relaxed);
        self.record_type_counts.clear();
        self.upstream_counts.clear();
    }
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryLogObserver for QueryMetrics {
    fn entry_added(&self, entry: &LogEntry) {
        self.total_entries.fetch_add(1, Ordering::Relaxed);
        self.total_elapsed_us
            .fetch_add(entry.elapsed_us, Ordering::Relaxed);

        match entry.verdict.action() {
            Some(FilterAction::Block) => {
                self.blocked.fetch_add(1, Ordering::Relaxed);
            }
            Some(FilterAction::Allow) => {
                self.allowed.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }

        if entry.cached {
            self.cached.fetch_add(1, Ordering::Relaxed);
        }

        self.record_type_counts
            .entry(entry.qtype)
            .and_modify(|c| *c += 1)
            .or_insert(1);

        if let Some(upstream) = &entry.upstream {
            self.upstream_counts
                .entry(Arc::clone(upstream))
                .and_modify(|c| *c += 1)
                .or_insert(1);
        }
    }

    fn flushed(&self, entries: usize, _elapsed: Duration) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        self.flushed_entries
            .fetch_add(entries as u64, Ordering::Relaxed);
    }

    fn flush_failed(&self, _entries: usize) {
        self.failed_flushes.fetch_add(1, Ordering::Relaxed);
    }
}
