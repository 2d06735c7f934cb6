use ferrous_sieve_domain::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over the configured level when it is set and non-empty.
fn log_spec(config: &LoggingConfig, rust_log: Option<String>) -> String {
    match rust_log {
        Some(spec) if !spec.trim().is_empty() => spec,
        _ => config.level.clone(),
    }
}

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let spec = log_spec(config, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&spec)?;
    let registry = tracing_subscriber::registry().with(filter);

    match config.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(level: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: LogFormat::Text,
        }
    }

    #[test]
    fn test_rust_log_takes_precedence() {
        assert_eq!(
            log_spec(&config("info"), Some("ferrous_sieve=trace".to_string())),
            "ferrous_sieve=trace"
        );
    }

    #[test]
    fn test_config_level_when_rust_log_unset_or_blank() {
        assert_eq!(log_spec(&config("warn"), None), "warn");
        assert_eq!(log_spec(&config("debug"), Some("  ".to_string())), "debug");
    }
}
