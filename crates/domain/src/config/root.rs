use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::client::ClientConfig;
use super::errors::ConfigError;
use super::filtering::FilteringConfig;
use super::logging::LoggingConfig;
use super::query_log::QueryLogConfig;
use super::web::WebConfig;

const LOCAL_CONFIG: &str = "ferrous-sieve.toml";
const SYSTEM_CONFIG: &str = "/etc/ferrous-sieve/config.toml";

/// Main configuration structure for Ferrous Sieve
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Rule list sources and refresh settings
    #[serde(default)]
    pub filtering: FilteringConfig,

    #[serde(default)]
    pub query_log: QueryLogConfig,

    /// Persistent clients
    #[serde(default)]
    pub clients: Vec<ClientConfig>,

    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. ferrous-sieve.toml in current directory
    /// 3. /etc/ferrous-sieve/config.toml
    /// 4. Default configuration
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(LOCAL_CONFIG).exists() {
            Self::from_file(LOCAL_CONFIG)?
        } else if Path::new(SYSTEM_CONFIG).exists() {
            Self::from_file(SYSTEM_CONFIG)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
        if let Some(dir) = overrides.cache_dir {
            self.filtering.cache_dir = dir;
        }
        if let Some(dir) = overrides.query_log_dir {
            self.query_log.dir = dir;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.filtering
            .build_filters()
            .map_err(ConfigError::Validation)?;

        self.query_log
            .validate()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        for client in &self.clients {
            if client.name.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "Client name cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, toml_string)
            .map_err(|e| ConfigError::FileWrite(path.to_string(), e.to_string()))?;
        Ok(())
    }

    /// Get the path to the configuration file being used
    pub fn get_config_path() -> Option<String> {
        if Path::new(LOCAL_CONFIG).exists() {
            Some(LOCAL_CONFIG.to_string())
        } else if Path::new(SYSTEM_CONFIG).exists() {
            Some(SYSTEM_CONFIG.to_string())
        } else {
            None
        }
    }
}

/// Command-line overrides for configuration
#[derive(Debug, Default)]
pub struct CliOverrides {
    pub log_level: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub query_log_dir: Option<PathBuf>,
}
