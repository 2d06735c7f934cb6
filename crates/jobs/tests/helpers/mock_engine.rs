use async_trait::async_trait;
use ferrous_sieve_application::ports::FilterEnginePort;
use ferrous_sieve_domain::{DomainError, Filter, FilterRequest, Verdict};
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct MockFilterEngine {
    refresh_calls: AtomicUsize,
    failure: Option<DomainError>,
}

impl MockFilterEngine {
    pub fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    pub fn failing(error: DomainError) -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            failure: Some(error),
        }
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FilterEnginePort for MockFilterEngine {
    fn filter_request(&self, _request: &FilterRequest) -> Verdict {
        Verdict::NoMatch
    }

    async fn refresh(&self) -> Result<(), DomainError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn filters(&self) -> Vec<Filter> {
        Vec::new()
    }
}
