use ferrous_sieve_domain::{ClientSettings, DomainError};

/// Resolves persistent client settings from any of the ids a query carries.
pub trait ClientFinder: Send + Sync {
    fn find_client(&self, ids: &[&str]) -> Result<Option<ClientSettings>, DomainError>;
}
