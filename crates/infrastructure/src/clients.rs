use ferrous_sieve_application::ports::ClientFinder;
use ferrous_sieve_domain::{ClientConfig, ClientSettings, DomainError};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Answers client lookups from the `[[clients]]` configuration.
///
/// Ids are matched case-insensitively; the first configured client claiming
/// an id owns it.
pub struct StaticClientFinder {
    clients: Vec<Arc<ClientSettings>>,
    by_id: FxHashMap<String, usize>,
}

impl StaticClientFinder {
    pub fn new(clients: Vec<ClientSettings>) -> Self {
        let clients: Vec<Arc<ClientSettings>> = clients.into_iter().map(Arc::new).collect();
        let mut by_id = FxHashMap::default();

        for (idx, client) in clients.iter().enumerate() {
            for id in &client.ids {
                by_id.entry(id.to_ascii_lowercase()).or_insert(idx);
            }
        }

        Self { clients, by_id }
    }

    pub fn from_config(configs: &[ClientConfig]) -> Self {
        Self::new(configs.iter().map(ClientConfig::to_settings).collect())
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl ClientFinder for StaticClientFinder {
    fn find_client(&self, ids: &[&str]) -> Result<Option<ClientSettings>, DomainError> {
        let found = ids
            .iter()
            .filter(|id| !id.is_empty())
            .find_map(|id| self.by_id.get(&id.to_ascii_lowercase()))
            .map(|&idx| ClientSettings::clone(&self.clients[idx]));

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> StaticClientFinder {
        StaticClientFinder::new(vec![
            ClientSettings::new("tv")
                .with_ids(["192.168.1.20", "TV-Client"])
                .with_ignore_query_log(true),
            ClientSettings::new("laptop").with_ids(["192.168.1.30", "192.168.1.20"]),
        ])
    }

    #[test]
    fn test_find_by_any_id() {
        let finder = finder();

        let client = finder.find_client(&["10.0.0.1", "tv-client"]).unwrap();
        assert_eq!(client.unwrap().name.as_ref(), "tv");

        let client = finder.find_client(&["192.168.1.30"]).unwrap();
        assert_eq!(client.unwrap().name.as_ref(), "laptop");
    }

    #[test]
    fn test_first_client_owns_shared_id() {
        let client = finder().find_client(&["192.168.1.20"]).unwrap().unwrap();
        assert_eq!(client.name.as_ref(), "tv");
        assert!(client.ignore_query_log);
    }

    #[test]
    fn test_unknown_and_empty_ids() {
        let finder = finder();
        assert!(finder.find_client(&["", "10.9.9.9"]).unwrap().is_none());
        assert!(finder.find_client(&[]).unwrap().is_none());
    }
}
