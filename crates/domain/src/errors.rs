use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Filter fetch error for {filter}: {reason}")]
    FilterFetch { filter: String, reason: String },

    #[error("Filter {filter} exceeds the size limit of {limit} bytes")]
    FilterTooLarge { filter: String, limit: u64 },

    #[error("Filter fetch for {0} timed out")]
    FilterFetchTimeout(String),

    #[error("Filter compile error for {filter}: {reason}")]
    FilterCompile { filter: String, reason: String },

    #[error("Filter refresh already in progress")]
    RefreshInProgress,

    #[error("Filter engine is closed")]
    EngineClosed,

    #[error("Filter refresh failed for: {}", failed.join(", "))]
    RefreshFailed { failed: Vec<String> },

    #[error("Invalid query log parameters: {0}")]
    InvalidLogParams(String),

    #[error("Invalid client proto: {0:?}")]
    InvalidClientProto(String),

    #[error("Invalid rotation interval: {0}")]
    InvalidRotationInterval(String),

    #[error("Query log I/O error: {0}")]
    QueryLogIo(String),

    #[error("Client lookup failed: {0}")]
    ClientLookup(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DomainError {
    /// Name of the filter this error belongs to, when it is a per-filter error.
    pub fn filter_name(&self) -> Option<&str> {
        match self {
            DomainError::FilterFetch { filter, .. }
            | DomainError::FilterTooLarge { filter, .. }
            | DomainError::FilterCompile { filter, .. } => Some(filter),
            DomainError::FilterFetchTimeout(filter) => Some(filter),
            _ => None,
        }
    }
}
