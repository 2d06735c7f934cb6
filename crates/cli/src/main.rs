use clap::{Parser, Subcommand};
use ferrous_sieve_application::ports::{FilterEnginePort, HttpRegistrar};
use ferrous_sieve_domain::{CliOverrides, Config, DomainError, FilterRequest, RecordType};
use ferrous_sieve_infrastructure::filtering::FilteringService;
use ferrous_sieve_jobs::{FilterRefreshJob, JobRunner};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod bootstrap;
mod di;
mod server;

#[derive(Parser)]
#[command(name = "ferrous-sieve")]
#[command(version)]
#[command(about = "Ferrous Sieve - DNS rule-list filtering engine and query log")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Filter cache directory
    #[arg(long, value_name = "DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// Query log directory
    #[arg(long, value_name = "DIR", global = true)]
    query_log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Refresh filters, run the query log and serve the read endpoints
    Serve,
    /// Refresh filters once and print the verdict for a host
    Check {
        host: String,

        /// Query type to match with
        #[arg(long, default_value = "A")]
        qtype: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        log_level: cli.log_level.clone(),
        cache_dir: cli.cache_dir.clone(),
        query_log_dir: cli.query_log_dir.clone(),
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;
    bootstrap::init_logging(&config.logging)?;
    bootstrap::config::log_config_summary(&config);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Check { host, qtype } => check(config, &host, &qtype).await,
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    info!("Starting Ferrous Sieve v{}", env!("CARGO_PKG_VERSION"));

    let routes = config
        .web
        .enabled
        .then(|| Arc::new(server::QueryLogRoutes::new()));
    let registrar = routes
        .clone()
        .map(|routes| routes as Arc<dyn HttpRegistrar>);

    let services = di::Services::new(&config, registrar)?;

    match services.refresh.execute().await {
        Ok(live) => info!(filters = live, "Initial filter refresh completed"),
        Err(e) => warn!(error = %e, "Initial filter refresh incomplete"),
    }

    services.query_log.start();

    let shutdown = CancellationToken::new();

    let mut runner = JobRunner::new().with_shutdown_token(shutdown.clone());
    if config.filtering.refresh_interval_secs > 0 {
        runner = runner.with_filter_refresh(
            FilterRefreshJob::new(services.refresh.clone())
                .with_interval(Duration::from_secs(config.filtering.refresh_interval_secs)),
        );
    }
    runner.start().await;

    let web = match routes {
        Some(routes) => {
            let addr: SocketAddr = config.web.bind_address.parse()?;
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = server::start_web_server(addr, routes, token).await {
                    error!(error = %e, "Web server error");
                }
            }))
        }
        None => None,
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested");

    shutdown.cancel();
    if let Some(web) = web {
        let _ = web.await;
    }

    let query_log = services.query_log.clone();
    tokio::task::spawn_blocking(move || query_log.close()).await?;
    services.filtering.close();

    let metrics = &services.metrics;
    info!(
        entries = metrics.total_entries(),
        blocked = metrics.blocked(),
        allowed = metrics.allowed(),
        flushes = metrics.flushes(),
        failed_flushes = metrics.failed_flushes(),
        "Shutdown complete"
    );
    Ok(())
}

async fn check(config: Config, host: &str, qtype: &str) -> anyhow::Result<()> {
    let qtype: RecordType = qtype.parse().map_err(anyhow::Error::msg)?;
    let filtering = FilteringService::from_config(&config.filtering)?;

    match filtering.refresh().await {
        Ok(()) => {}
        Err(DomainError::RefreshFailed { failed }) => {
            warn!(failed = %failed.join(", "), "Some filters could not be refreshed");
        }
        Err(e) => return Err(e.into()),
    }

    let verdict = filtering.filter_request(&FilterRequest::new(host, qtype));
    println!("{}", serde_json::to_string_pretty(&verdict)?);

    filtering.close();
    Ok(())
}
