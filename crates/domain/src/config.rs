pub mod client;
pub mod errors;
pub mod filtering;
pub mod logging;
pub mod query_log;
pub mod root;
pub mod web;

pub use client::ClientConfig;
pub use errors::ConfigError;
pub use filtering::{FilterConfig, FilteringConfig, DEFAULT_MAX_RULE_LIST_SIZE};
pub use logging::{LogFormat, LoggingConfig};
pub use query_log::{QueryLogConfig, RotationInterval};
pub use root::{CliOverrides, Config};
pub use web::WebConfig;
