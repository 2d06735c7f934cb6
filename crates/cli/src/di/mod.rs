use ferrous_sieve_application::ports::{FilterEnginePort, HttpRegistrar};
use ferrous_sieve_application::use_cases::RefreshFiltersUseCase;
use ferrous_sieve_domain::Config;
use ferrous_sieve_infrastructure::clients::StaticClientFinder;
use ferrous_sieve_infrastructure::filtering::FilteringService;
use ferrous_sieve_infrastructure::query_log::{QueryLog, QueryMetrics};
use std::sync::Arc;
use tracing::info;

/// Everything `serve` wires together.
pub struct Services {
    pub filtering: Arc<FilteringService>,
    pub query_log: Arc<QueryLog>,
    pub metrics: Arc<QueryMetrics>,
    pub refresh: Arc<RefreshFiltersUseCase>,
}

impl Services {
    pub fn new(
        config: &Config,
        registrar: Option<Arc<dyn HttpRegistrar>>,
    ) -> anyhow::Result<Self> {
        let filtering = Arc::new(FilteringService::from_config(&config.filtering)?);
        let metrics = Arc::new(QueryMetrics::new());
        let clients = Arc::new(StaticClientFinder::from_config(&config.clients));

        let mut builder = QueryLog::builder(config.query_log.clone())
            .client_finder(clients)
            .observer(metrics.clone());
        if let Some(registrar) = registrar {
            builder = builder.http_registrar(registrar);
        }
        let query_log = Arc::new(builder.build()?);

        let engine: Arc<dyn FilterEnginePort> = filtering.clone();

        info!(
            filters = config.filtering.filters.len(),
            clients = config.clients.len(),
            "Services initialized"
        );

        Ok(Self {
            refresh: Arc::new(RefreshFiltersUseCase::new(engine)),
            filtering,
            query_log,
            metrics,
        })
    }
}
