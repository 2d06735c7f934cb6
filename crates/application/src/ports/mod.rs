mod client_finder;
mod filter_engine;
mod http_registrar;
mod query_log;
mod query_log_observer;

pub use client_finder::ClientFinder;
pub use filter_engine::FilterEnginePort;
pub use http_registrar::{HttpRegistrar, QueryLogReader};
pub use query_log::QueryLogPort;
pub use query_log_observer::QueryLogObserver;
