use ferrous_sieve_domain::{LogEntry, QueryLogConfig};
use std::sync::Arc;

/// Read-only view of the query log handed to the web layer.
pub trait QueryLogReader: Send + Sync {
    /// Newest first.
    fn recent(&self, limit: usize) -> Vec<LogEntry>;

    fn config(&self) -> QueryLogConfig;
}

pub trait HttpRegistrar: Send + Sync {
    fn register_query_log(&self, reader: Arc<dyn QueryLogReader>);
}
