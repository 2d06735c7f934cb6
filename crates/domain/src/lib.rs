//! Ferrous Sieve Domain Layer
pub mod client;
pub mod config;
pub mod dns_record;
pub mod errors;
pub mod filter;
pub mod query_log;
pub mod verdict;

pub use client::ClientSettings;
pub use config::{
    CliOverrides, ClientConfig, Config, ConfigError, FilterConfig, FilteringConfig, LogFormat,
    LoggingConfig, QueryLogConfig, RotationInterval, WebConfig,
};
pub use dns_record::{AnswerRecord, DnsClass, RecordType};
pub use errors::DomainError;
pub use filter::{Filter, FilterId, FilterLocator};
pub use query_log::{normalize_domain, AddParams, ClientProto, DnsQuestion, LogEntry};
pub use verdict::{FilterAction, FilterRequest, MatchedRule, Verdict};
