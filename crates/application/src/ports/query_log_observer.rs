use ferrous_sieve_domain::LogEntry;
use std::time::Duration;

/// Receives query log events for metrics. Called outside of any log lock.
pub trait QueryLogObserver: Send + Sync {
    fn entry_added(&self, entry: &LogEntry);

    fn flushed(&self, entries: usize, elapsed: Duration);

    fn flush_failed(&self, _entries: usize) {}
}
