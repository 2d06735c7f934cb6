use ferrous_sieve_domain::{AddParams, DnsClass, RecordType};

pub trait QueryLogPort: Send + Sync {
    /// Checked before building params, so suppressed queries never reach
    /// [`QueryLogPort::add`].
    fn should_log(&self, host: &str, qtype: RecordType, qclass: DnsClass, ids: &[&str]) -> bool;

    /// Best effort. Invalid params are logged and dropped.
    fn add(&self, params: AddParams);
}
