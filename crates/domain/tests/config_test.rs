use ferrous_sieve_domain::{
    CliOverrides, Config, ConfigError, FilterLocator, LogFormat, RotationInterval,
};
use std::path::PathBuf;
use std::time::Duration;

const SAMPLE: &str = r#"
[logging]
level = "debug"
format = "json"

[filtering]
cache_dir = "/var/cache/sieve"
fetch_timeout_secs = 30

[[filtering.filters]]
id = 1
name = "local"
path = "/etc/sieve/local.txt"

[[filtering.filters]]
id = 2
name = "remote"
url = "https://lists.example/ads.txt"
enabled = false

[query_log]
mem_size = 50
ignored = ["Example.ORG."]
rotation_interval = "7d"

[[clients]]
name = "tv"
ids = ["192.168.1.20"]
ignore_query_log = true
"#;

#[test]
fn test_default_config_is_valid() {
    let config = Config::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert!(config.query_log.enabled);
    assert_eq!(config.query_log.mem_size, 1000);
    assert_eq!(config.query_log.rotation_interval, RotationInterval::DAY);
    assert_eq!(config.query_log.max_archives, 10);
    assert_eq!(config.web.bind_address, "127.0.0.1:3080");
}

#[test]
fn test_parse_sample_config() {
    let config = Config::from_toml(SAMPLE).unwrap();
    config.validate().unwrap();

    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.filtering.cache_dir, PathBuf::from("/var/cache/sieve"));
    assert_eq!(config.query_log.mem_size, 50);
    assert_eq!(
        config.query_log.rotation_interval.as_duration(),
        Duration::from_secs(7 * 24 * 3600)
    );
    assert!(config.query_log.ignored_set().contains("example.org"));
    assert!(config.clients[0].ignore_query_log);

    let filters = config.filtering.build_filters().unwrap();
    assert_eq!(filters.len(), 2);
    assert!(matches!(filters[0].locator, FilterLocator::File { .. }));
    assert!(filters[1].locator.is_remote());
    assert!(!filters[1].enabled);
}

#[test]
fn test_duplicate_filter_ids_rejected() {
    let toml = r#"
[[filtering.filters]]
id = 1
name = "a"
url = "/tmp/a.txt"

[[filtering.filters]]
id = 1
name = "b"
url = "/tmp/b.txt"
"#;
    let config = Config::from_toml(toml).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
}

#[test]
fn test_empty_filter_name_rejected() {
    let toml = r#"
[[filtering.filters]]
id = 1
name = "  "
url = "/tmp/a.txt"
"#;
    let config = Config::from_toml(toml).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_unlisted_rotation_interval_rejected() {
    let config = Config::from_toml("[query_log]\nrotation_interval = \"12h\"\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_rotation_interval_out_of_bounds() {
    assert!(RotationInterval::new(Duration::from_secs(59 * 60))
        .check_bounds()
        .is_err());
    assert!(RotationInterval::new(Duration::from_secs(366 * 24 * 3600))
        .check_bounds()
        .is_err());
    assert!(RotationInterval::new(Duration::from_secs(3600))
        .check_bounds()
        .is_ok());
}

#[test]
fn test_malformed_rotation_interval_is_parse_error() {
    let result = Config::from_toml("[query_log]\nrotation_interval = \"soon\"\n");
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_zero_mem_size_rejected() {
    let config = Config::from_toml("[query_log]\nmem_size = 0\n").unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_cli_overrides_win() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sieve.toml");
    std::fs::write(&path, SAMPLE).unwrap();

    let overrides = CliOverrides {
        log_level: Some("trace".to_string()),
        cache_dir: Some(PathBuf::from("/tmp/cache")),
        query_log_dir: Some(PathBuf::from("/tmp/qlog")),
    };
    let config = Config::load(path.to_str(), overrides).unwrap();

    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.filtering.cache_dir, PathBuf::from("/tmp/cache"));
    assert_eq!(config.query_log.dir, PathBuf::from("/tmp/qlog"));
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("saved.toml");
    let path = path.to_str().unwrap();

    let config = Config::from_toml(SAMPLE).unwrap();
    config.save(path).unwrap();

    let reloaded = Config::from_file(path).unwrap();
    assert_eq!(reloaded.query_log, config.query_log);
    assert_eq!(reloaded.filtering.filters.len(), 2);
}
