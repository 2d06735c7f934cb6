use crate::filter::{Filter, FilterId, FilterLocator};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cap on the size of a single rule list, in bytes.
pub const DEFAULT_MAX_RULE_LIST_SIZE: u64 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilteringConfig {
    /// Directory holding the last good copy of every fetched list.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    #[serde(default = "default_max_rule_list_size")]
    pub max_rule_list_size: u64,

    /// Overall deadline for one refresh, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// 0 disables periodic refresh.
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,
}

impl Default for FilteringConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_rule_list_size: default_max_rule_list_size(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            refresh_interval_secs: default_refresh_interval_secs(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    pub id: FilterId,

    pub name: String,

    /// `http://`, `https://` or a local path, optionally `file://` prefixed.
    #[serde(alias = "path")]
    pub url: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FilterConfig {
    pub fn to_filter(&self) -> Result<Filter, String> {
        Filter::validate_name(&self.name)?;
        let locator = FilterLocator::parse(&self.url)?;
        Ok(Filter::new(self.id, self.name.trim(), locator).with_enabled(self.enabled))
    }
}

impl FilteringConfig {
    /// Filters in configuration order, which is also match precedence order.
    pub fn build_filters(&self) -> Result<Vec<Filter>, String> {
        let mut seen = std::collections::HashSet::with_capacity(self.filters.len());
        let mut filters = Vec::with_capacity(self.filters.len());

        for entry in &self.filters {
            if !seen.insert(entry.id) {
                return Err(format!("Duplicate filter id {}", entry.id));
            }
            let filter = entry
                .to_filter()
                .map_err(|e| format!("Filter {}: {}", entry.id, e))?;
            filters.push(filter);
        }

        Ok(filters)
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./data/filters")
}

fn default_max_rule_list_size() -> u64 {
    DEFAULT_MAX_RULE_LIST_SIZE
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_refresh_interval_secs() -> u64 {
    86_400
}

fn default_true() -> bool {
    true
}
