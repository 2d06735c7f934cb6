use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Per-client settings relevant to the filtering and logging core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub name: Arc<str>,

    /// Identifiers the client is known by: IP addresses, MAC addresses or
    /// DoH/DoT client IDs.
    #[serde(default)]
    pub ids: Vec<Arc<str>>,

    /// Queries from this client never reach the query log.
    #[serde(default)]
    pub ignore_query_log: bool,
}

impl ClientSettings {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            ids: Vec::new(),
            ignore_query_log: false,
        }
    }

    pub fn with_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore_query_log(mut self, ignore: bool) -> Self {
        self.ignore_query_log = ignore;
        self
    }

    pub fn matches_any(&self, ids: &[&str]) -> bool {
        ids.iter()
            .any(|id| self.ids.iter().any(|own| own.eq_ignore_ascii_case(id)))
    }
}
