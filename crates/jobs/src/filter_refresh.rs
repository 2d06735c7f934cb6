use ferrous_sieve_application::use_cases::RefreshFiltersUseCase;
use ferrous_sieve_domain::DomainError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(86400);

/// Background job that periodically re-fetches and recompiles the filters.
///
/// The first tick is consumed immediately: the binary refreshes once before
/// serving, so the job only handles later refreshes.
pub struct FilterRefreshJob {
    refresh: Arc<RefreshFiltersUseCase>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl FilterRefreshJob {
    pub fn new(refresh: Arc<RefreshFiltersUseCase>) -> Self {
        Self {
            refresh,
            interval: DEFAULT_INTERVAL,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        if self.interval.is_zero() {
            warn!("Filter refresh interval is zero, job disabled");
            return;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            "Starting filter refresh job"
        );

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("FilterRefreshJob: shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }
        });
    }

    async fn run_once(&self) {
        debug!("FilterRefreshJob: refreshing filters");
        match self.refresh.execute().await {
            Ok(live) => info!(filters = live, "FilterRefreshJob: refresh completed"),
            Err(DomainError::RefreshInProgress) => {
                warn!("FilterRefreshJob: previous refresh still running, skipping tick")
            }
            Err(e) => error!(error = %e, "FilterRefreshJob: refresh failed"),
        }
    }
}
