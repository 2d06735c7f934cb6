use ferrous_sieve_domain::{AddParams, DnsQuestion, QueryLogConfig, RecordType, RotationInterval};
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

pub fn params(host: &str) -> AddParams {
    params_from(host, "192.168.1.10")
}

pub fn params_from(host: &str, ip: &str) -> AddParams {
    AddParams {
        questions: vec![DnsQuestion::new(host, RecordType::A)],
        client_ip: Some(ip.parse::<IpAddr>().unwrap()),
        elapsed: Duration::from_micros(250),
        upstream: Some("1.1.1.1:53".into()),
        ..Default::default()
    }
}

pub fn log_config(dir: &Path, mem_size: usize) -> QueryLogConfig {
    QueryLogConfig {
        enabled: true,
        file_enabled: true,
        dir: dir.to_path_buf(),
        mem_size,
        ignored: Vec::new(),
        rotation_interval: RotationInterval::DAY,
        max_file_size: 0,
        max_archives: 10,
    }
}

/// Parsed records of a JSON-lines query log file, oldest first.
pub fn read_entries(path: &Path) -> Vec<ferrous_sieve_domain::LogEntry> {
    match std::fs::read_to_string(path) {
        Ok(text) => text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).unwrap())
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => panic!("reading {}: {}", path.display(), e),
    }
}
