use crate::errors::DomainError;
use crate::query_log::normalize_domain;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);
const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// How long the active query log file is written to before it is rotated.
///
/// Written in configuration as a number followed by a unit: `s`, `m`, `h`
/// or `d` (`"6h"`, `"7d"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RotationInterval(Duration);

impl RotationInterval {
    pub const QUARTER_DAY: Self = Self(Duration::from_secs(6 * 60 * 60));
    pub const DAY: Self = Self(DAY);
    pub const WEEK: Self = Self(Duration::from_secs(7 * 24 * 60 * 60));
    pub const MONTH: Self = Self(Duration::from_secs(30 * 24 * 60 * 60));
    pub const THREE_MONTHS: Self = Self(Duration::from_secs(90 * 24 * 60 * 60));

    pub const ALLOWED: [Self; 5] = [
        Self::QUARTER_DAY,
        Self::DAY,
        Self::WEEK,
        Self::MONTH,
        Self::THREE_MONTHS,
    ];

    pub fn new(duration: Duration) -> Self {
        Self(duration)
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    /// True if the interval is one of the values offered to users.
    pub fn is_allowed(&self) -> bool {
        Self::ALLOWED.contains(self)
    }

    /// Rejects intervals shorter than an hour or longer than a year.
    pub fn check_bounds(&self) -> Result<(), DomainError> {
        if self.0 < HOUR {
            return Err(DomainError::InvalidRotationInterval(
                "less than an hour".to_string(),
            ));
        }

        if self.0 > DAY * 365 {
            return Err(DomainError::InvalidRotationInterval(
                "more than a year".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        self.check_bounds()?;

        if !self.is_allowed() {
            return Err(DomainError::InvalidRotationInterval(format!(
                "{} is not one of 6h, 24h, 7d, 30d, 90d",
                self
            )));
        }

        Ok(())
    }
}

impl Default for RotationInterval {
    fn default() -> Self {
        Self::DAY
    }
}

impl fmt::Display for RotationInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        if secs != 0 && secs % DAY.as_secs() == 0 && secs / DAY.as_secs() > 1 {
            write!(f, "{}d", secs / DAY.as_secs())
        } else if secs != 0 && secs % HOUR.as_secs() == 0 {
            write!(f, "{}h", secs / HOUR.as_secs())
        } else if secs != 0 && secs % 60 == 0 {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{}s", secs)
        }
    }
}

impl TryFrom<String> for RotationInterval {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_interval(&value).map(Self)
    }
}

impl From<RotationInterval> for String {
    fn from(value: RotationInterval) -> Self {
        value.to_string()
    }
}

fn parse_interval(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("missing unit in interval {:?}", raw))?;
    let (value, unit) = raw.split_at(split);
    let value: u64 = value
        .parse()
        .map_err(|_| format!("invalid number in interval {:?}", raw))?;

    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => HOUR.as_secs(),
        "d" => DAY.as_secs(),
        _ => return Err(format!("unknown unit {:?} in interval {:?}", unit, raw)),
    };

    value
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("interval {:?} is too large", raw))
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct QueryLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_true")]
    pub file_enabled: bool,

    /// Directory holding `querylog.json` and its rotated predecessors.
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// In-memory buffer capacity, also the entry count that triggers a flush.
    #[serde(default = "default_mem_size")]
    pub mem_size: usize,

    /// Hosts that are never logged.
    #[serde(default)]
    pub ignored: Vec<String>,

    #[serde(default)]
    pub rotation_interval: RotationInterval,

    /// Active file size that forces a rotation. 0 disables size rotation.
    #[serde(default)]
    pub max_file_size: u64,

    #[serde(default = "default_max_archives")]
    pub max_archives: usize,
}

impl Default for QueryLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_enabled: true,
            dir: default_dir(),
            mem_size: default_mem_size(),
            ignored: Vec::new(),
            rotation_interval: RotationInterval::default(),
            max_file_size: 0,
            max_archives: default_max_archives(),
        }
    }
}

impl QueryLogConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.mem_size == 0 {
            return Err(DomainError::ConfigError(
                "query_log.mem_size must be at least 1".to_string(),
            ));
        }

        self.rotation_interval.validate()
    }

    pub fn ignored_set(&self) -> HashSet<String> {
        self.ignored
            .iter()
            .map(|h| normalize_domain(h))
            .filter(|h| !h.is_empty())
            .collect()
    }
}

fn default_true() -> bool {
    true
}

fn default_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_mem_size() -> usize {
    1000
}

fn default_max_archives() -> usize {
    10
}
