use async_trait::async_trait;
use ferrous_sieve_domain::{DomainError, Filter, FilterRequest, Verdict};

#[async_trait]
pub trait FilterEnginePort: Send + Sync {
    /// Matches against the currently published index. Never waits on a
    /// refresh in flight.
    fn filter_request(&self, request: &FilterRequest) -> Verdict;

    /// Re-fetches and recompiles every enabled filter. Filters that fail keep
    /// their previous rule set; their names are reported in
    /// [`DomainError::RefreshFailed`].
    async fn refresh(&self) -> Result<(), DomainError>;

    /// Snapshot of the filters with the metadata of their live rule sets.
    fn filters(&self) -> Vec<Filter>;
}
