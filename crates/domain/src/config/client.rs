use crate::client::ClientSettings;
use serde::{Deserialize, Serialize};

/// A persistent client entry. `ids` may hold IP addresses or client IDs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub name: String,

    #[serde(default)]
    pub ids: Vec<String>,

    #[serde(default)]
    pub ignore_query_log: bool,
}

impl ClientConfig {
    pub fn to_settings(&self) -> ClientSettings {
        ClientSettings::new(self.name.as_str())
            .with_ids(self.ids.iter().map(String::as_str))
            .with_ignore_query_log(self.ignore_query_log)
    }
}
