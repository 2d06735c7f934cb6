use crate::ports::FilterEnginePort;
use ferrous_sieve_domain::DomainError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RefreshFiltersUseCase {
    engine: Arc<dyn FilterEnginePort>,
}

impl RefreshFiltersUseCase {
    pub fn new(engine: Arc<dyn FilterEnginePort>) -> Self {
        Self { engine }
    }

    /// Returns the number of enabled filters with a live rule set.
    pub async fn execute(&self) -> Result<usize, DomainError> {
        let result = self.engine.refresh().await;

        let filters = self.engine.filters();
        let live = filters
            .iter()
            .filter(|f| f.enabled && f.has_compiled())
            .count();
        let rules: usize = filters.iter().map(|f| f.rules_count).sum();

        match result {
            Ok(()) => {
                info!(filters = live, rules = rules, "Filter refresh completed");
                Ok(live)
            }
            Err(DomainError::RefreshFailed { failed }) => {
                warn!(
                    failed = %failed.join(", "),
                    live = live,
                    rules = rules,
                    "Filter refresh completed with failures"
                );
                Err(DomainError::RefreshFailed { failed })
            }
            Err(e) => Err(e),
        }
    }
}
