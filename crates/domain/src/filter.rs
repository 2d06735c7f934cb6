use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub type FilterId = u64;

/// Where a filter's rule text comes from. The scheme of the configured
/// locator selects the variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterLocator {
    File { path: PathBuf },
    Http { url: Arc<str> },
}

impl FilterLocator {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("Filter locator cannot be empty".to_string());
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            if raw.len() > 2048 {
                return Err("URL cannot exceed 2048 characters".to_string());
            }
            return Ok(FilterLocator::Http {
                url: Arc::from(raw),
            });
        }

        let path = raw.strip_prefix("file://").unwrap_or(raw);
        if path.is_empty() {
            return Err("File locator has no path".to_string());
        }

        Ok(FilterLocator::File {
            path: PathBuf::from(path),
        })
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, FilterLocator::Http { .. })
    }
}

impl fmt::Display for FilterLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterLocator::File { path } => write!(f, "{}", path.display()),
            FilterLocator::Http { url } => f.write_str(url),
        }
    }
}

/// One named rule-list source plus the metadata of its live compiled state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    pub name: Arc<str>,
    pub locator: FilterLocator,
    pub enabled: bool,

    /// Time of the last successful fetch that is currently in service.
    /// Stays `None` for a rule set built only from the cached copy.
    pub last_updated: Option<DateTime<Utc>>,

    /// Size in bytes of the rule text the live rule set was compiled from.
    pub size_bytes: u64,

    pub rules_count: usize,

    /// Hex SHA-256 of the rule text the live rule set was compiled from.
    pub checksum: Option<Arc<str>>,
}

impl Filter {
    pub fn new(id: FilterId, name: impl Into<Arc<str>>, locator: FilterLocator) -> Self {
        Self {
            id,
            name: name.into(),
            locator,
            enabled: true,
            last_updated: None,
            size_bytes: 0,
            rules_count: 0,
            checksum: None,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// File name of this filter's copy under the cache directory.
    pub fn cache_file_name(&self) -> String {
        format!("{}.txt", self.id)
    }

    /// True once a rule set is in service, whether built from a fetch or
    /// from the cached copy.
    pub fn has_compiled(&self) -> bool {
        self.checksum.is_some()
    }

    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("Filter name cannot be empty".to_string());
        }

        if name.len() > 200 {
            return Err("Filter name cannot exceed 200 characters".to_string());
        }

        Ok(())
    }
}
