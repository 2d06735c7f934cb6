use ferrous_sieve_domain::{CliOverrides, Config};
use tracing::info;

pub fn load_config(path: Option<&str>, overrides: CliOverrides) -> anyhow::Result<Config> {
    let config = Config::load(path, overrides)?;
    config.validate()?;
    Ok(config)
}

/// Logged once logging is up, since loading happens before it.
pub fn log_config_summary(config: &Config) {
    info!(
        filters = config.filtering.filters.len(),
        cache_dir = %config.filtering.cache_dir.display(),
        query_log_dir = %config.query_log.dir.display(),
        clients = config.clients.len(),
        "Configuration loaded"
    );
}
