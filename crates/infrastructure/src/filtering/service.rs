use super::engine::RuleListEngine;
use super::source::DEFAULT_RULE_BUF_SIZE;
use async_trait::async_trait;
use ferrous_sieve_application::ports::FilterEnginePort;
use ferrous_sieve_domain::{DomainError, Filter, FilterRequest, FilteringConfig, Verdict};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// [`RuleListEngine`] bound to the HTTP client, cache directory and limits
/// it refreshes with.
pub struct FilteringService {
    engine: Arc<RuleListEngine>,
    client: reqwest::Client,
    cache_dir: PathBuf,
    max_size: u64,
    fetch_timeout: Duration,
    scratch: Mutex<Vec<u8>>,
}

impl FilteringService {
    pub fn new(
        engine: Arc<RuleListEngine>,
        client: reqwest::Client,
        cache_dir: PathBuf,
        max_size: u64,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            client,
            cache_dir,
            max_size,
            fetch_timeout,
            scratch: Mutex::new(vec![0; DEFAULT_RULE_BUF_SIZE]),
        }
    }

    pub fn from_config(config: &FilteringConfig) -> Result<Self, DomainError> {
        let filters = config.build_filters().map_err(DomainError::ConfigError)?;
        let fetch_timeout = Duration::from_secs(config.fetch_timeout_secs);

        let client = reqwest::Client::builder()
            .user_agent(concat!("Ferrous-Sieve/", env!("CARGO_PKG_VERSION")))
            .timeout(fetch_timeout)
            .build()
            .map_err(|e| DomainError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self::new(
            Arc::new(RuleListEngine::new("filters", filters)),
            client,
            config.cache_dir.clone(),
            config.max_rule_list_size,
            fetch_timeout,
        ))
    }

    pub fn engine(&self) -> &Arc<RuleListEngine> {
        &self.engine
    }

    pub fn close(&self) {
        self.engine.close();
    }
}

#[async_trait]
impl FilterEnginePort for FilteringService {
    #[inline]
    fn filter_request(&self, request: &FilterRequest) -> Verdict {
        self.engine.filter_request(request)
    }

    async fn refresh(&self) -> Result<(), DomainError> {
        let mut scratch = self
            .scratch
            .try_lock()
            .map_err(|_| DomainError::RefreshInProgress)?;
        let deadline = Instant::now() + self.fetch_timeout;

        self.engine
            .refresh(
                deadline,
                &mut scratch,
                &self.client,
                &self.cache_dir,
                self.max_size,
            )
            .await
    }

    fn filters(&self) -> Vec<Filter> {
        self.engine.filters()
    }
}
