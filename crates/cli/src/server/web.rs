use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use ferrous_sieve_application::ports::{HttpRegistrar, QueryLogReader};
use ferrous_sieve_domain::{LogEntry, QueryLogConfig};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

/// Collects the query log handed over by `QueryLog::start` and serves it
/// read-only.
#[derive(Default)]
pub struct QueryLogRoutes {
    reader: RwLock<Option<Arc<dyn QueryLogReader>>>,
}

impl QueryLogRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router(&self) -> Router {
        let reader = self
            .reader
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        match reader {
            Some(reader) => Router::new()
                .route("/querylog", get(recent_handler))
                .route("/querylog/config", get(config_handler))
                .with_state(reader),
            None => {
                warn!("No query log registered, web endpoints disabled");
                Router::new()
            }
        }
    }
}

impl HttpRegistrar for QueryLogRoutes {
    fn register_query_log(&self, reader: Arc<dyn QueryLogReader>) {
        *self.reader.write().unwrap_or_else(|e| e.into_inner()) = Some(reader);
    }
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    limit: Option<usize>,
}

async fn recent_handler(
    State(reader): State<Arc<dyn QueryLogReader>>,
    Query(params): Query<RecentParams>,
) -> Json<Vec<LogEntry>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    Json(reader.recent(limit))
}

async fn config_handler(State(reader): State<Arc<dyn QueryLogReader>>) -> Json<QueryLogConfig> {
    Json(reader.config())
}

pub async fn start_web_server(
    bind_addr: SocketAddr,
    routes: Arc<QueryLogRoutes>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(
        bind_address = %listener.local_addr()?,
        "Web server started"
    );

    axum::serve(listener, routes.router())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Web server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ferrous_sieve_domain::{DnsClass, RecordType, Verdict};

    struct FixedReader {
        entries: Vec<LogEntry>,
    }

    impl QueryLogReader for FixedReader {
        fn recent(&self, limit: usize) -> Vec<LogEntry> {
            self.entries.iter().take(limit).cloned().collect()
        }

        fn config(&self) -> QueryLogConfig {
            QueryLogConfig {
                mem_size: 42,
                ..QueryLogConfig::default()
            }
        }
    }

    fn entry(host: &str) -> LogEntry {
        LogEntry {
            time: Utc::now(),
            qhost: host.into(),
            qtype: RecordType::A,
            qclass: DnsClass::IN,
            client_id: None,
            client_proto: Default::default(),
            ip: "192.168.1.10".parse().unwrap(),
            verdict: Verdict::NoMatch,
            upstream: None,
            elapsed_us: 120,
            cached: false,
            authenticated_data: false,
            ecs: None,
            answer: Vec::new(),
            orig_answer: None,
        }
    }

    async fn serve(routes: &QueryLogRoutes) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_querylog_endpoints_serve_registered_reader() {
        let routes = QueryLogRoutes::new();
        routes.register_query_log(Arc::new(FixedReader {
            entries: vec![entry("newest.example"), entry("older.example")],
        }));
        let base = serve(&routes).await;

        let body = reqwest::get(format!("{}/querylog?limit=1", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let entries: Vec<LogEntry> = serde_json::from_str(&body).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(&*entries[0].qhost, "newest.example");

        let body = reqwest::get(format!("{}/querylog/config", base))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        let config: QueryLogConfig = serde_json::from_str(&body).unwrap();
        assert_eq!(config.mem_size, 42);
    }

    #[tokio::test]
    async fn test_unregistered_routes_are_not_found() {
        let routes = QueryLogRoutes::new();
        let base = serve(&routes).await;

        let status = reqwest::get(format!("{}/querylog", base))
            .await
            .unwrap()
            .status();
        assert_eq!(status.as_u16(), 404);
    }
}
