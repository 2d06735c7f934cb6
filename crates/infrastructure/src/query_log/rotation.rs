use chrono::{DateTime, Utc};
use ferrous_sieve_domain::{LogEntry, QueryLogConfig};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const LOG_FILE_NAME: &str = "querylog.json";
const PREDECESSOR_SUFFIX: &str = ".1";
const ARCHIVE_SUFFIX: &str = ".gz";

/// When the active file is retired and how much compressed history stays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    pub interval: Duration,
    /// 0 disables size-based rotation.
    pub max_file_size: u64,
    pub max_archives: usize,
}

impl RotationPolicy {
    pub fn from_config(config: &QueryLogConfig) -> Self {
        Self {
            interval: config.rotation_interval.as_duration(),
            max_file_size: config.max_file_size,
            max_archives: config.max_archives,
        }
    }

    pub fn is_due(&self, started_at: DateTime<Utc>, size: u64, now: DateTime<Utc>) -> bool {
        if self.max_file_size > 0 && size >= self.max_file_size {
            return true;
        }

        let age = now.signed_duration_since(started_at);
        age.to_std().map(|age| age >= self.interval).unwrap_or(false)
    }
}

#[derive(Debug, Clone)]
pub struct LogFiles {
    dir: PathBuf,
}

impl LogFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn active(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    pub fn predecessor(&self) -> PathBuf {
        self.dir
            .join(format!("{}{}", LOG_FILE_NAME, PREDECESSOR_SUFFIX))
    }

    /// Archive path for `now`. Archives already taken at the same instant
    /// get a counter one past the highest in use.
    fn archive_for(&self, now: DateTime<Utc>) -> io::Result<PathBuf> {
        let stamp = now.format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let next = self
            .archives()?
            .iter()
            .map(|path| archive_order(path))
            .filter(|(taken, _)| *taken == stamp)
            .map(|(_, n)| n + 1)
            .max();

        let name = match next {
            Some(n) => format!("{}.{}-{}{}", LOG_FILE_NAME, stamp, n, ARCHIVE_SUFFIX),
            None => format!("{}.{}{}", LOG_FILE_NAME, stamp, ARCHIVE_SUFFIX),
        };
        Ok(self.dir.join(name))
    }

    /// Compressed history, oldest first.
    pub fn archives(&self) -> io::Result<Vec<PathBuf>> {
        let prefix = format!("{}.", LOG_FILE_NAME);
        let mut archives = Vec::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && name.ends_with(ARCHIVE_SUFFIX) {
                archives.push(entry.path());
            }
        }

        archives.sort_by_cached_key(|path| archive_order(path));
        Ok(archives)
    }

    /// Timestamp of the first record in the active file, which is the age
    /// of the file.
    pub fn active_started_at(&self) -> io::Result<Option<DateTime<Utc>>> {
        let file = match File::open(self.active()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let mut first = String::new();
        BufReader::new(file).read_line(&mut first)?;
        if first.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str::<LogEntry>(first.trim_end()) {
            Ok(entry) => Ok(Some(entry.time)),
            Err(e) => {
                warn!(error = %e, "Unreadable first query log record, treating file as new");
                Ok(None)
            }
        }
    }

    pub fn active_size(&self) -> io::Result<u64> {
        match fs::metadata(self.active()) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Compresses the old predecessor into the archive set, moves the active
    /// file into its place and prunes archives beyond `max_archives`.
    pub fn rotate(&self, max_archives: usize, now: DateTime<Utc>) -> io::Result<()> {
        let active = self.active();
        if !active.exists() {
            return Ok(());
        }

        let predecessor = self.predecessor();
        if predecessor.exists() {
            let archive = self.archive_for(now)?;
            gzip_file(&predecessor, &archive)?;
            fs::remove_file(&predecessor)?;
            debug!(archive = %archive.display(), "Archived query log predecessor");
        }

        fs::rename(&active, &predecessor)?;
        self.prune_archives(max_archives)?;

        info!(dir = %self.dir.display(), "Rotated query log");
        Ok(())
    }

    fn prune_archives(&self, max_archives: usize) -> io::Result<()> {
        let archives = self.archives()?;
        if archives.len() <= max_archives {
            return Ok(());
        }

        let excess = archives.len() - max_archives;
        for path in &archives[..excess] {
            fs::remove_file(path)?;
            debug!(archive = %path.display(), "Removed old query log archive");
        }
        Ok(())
    }

    /// Removes the active file and its predecessor. A missing file counts as
    /// removed.
    pub fn remove_current(&self) -> io::Result<()> {
        for path in [self.predecessor(), self.active()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Sort key of an archive: its timestamp, then the collision counter, so
/// `<stamp>-1.gz` comes after `<stamp>.gz`.
fn archive_order(path: &Path) -> (String, u32) {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let stem = name
        .strip_prefix(LOG_FILE_NAME)
        .and_then(|rest| rest.strip_prefix('.'))
        .and_then(|rest| rest.strip_suffix(ARCHIVE_SUFFIX))
        .unwrap_or(name);

    match stem.rsplit_once('-') {
        Some((stamp, n)) => match n.parse() {
            Ok(n) => (stamp.to_string(), n),
            Err(_) => (stem.to_string(), 0),
        },
        None => (stem.to_string(), 0),
    }
}

fn gzip_file(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = BufReader::new(File::open(src)?);
    let output = BufWriter::new(File::create(dst)?);
    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.into_inner().map_err(|e| e.into_error())?.sync_all()
}
