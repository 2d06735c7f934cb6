pub mod clients;
pub mod filtering;
pub mod query_log;
