use super::rotation::{LogFiles, RotationPolicy};
use chrono::Utc;
use ferrous_sieve_domain::{DomainError, LogEntry};
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error};

struct WriterState {
    files: LogFiles,
    /// Entries whose write failed, written ahead of the next batch.
    backlog: Vec<LogEntry>,
}

/// Appends JSON lines to the active query log file and rotates it.
///
/// Every file operation runs under one write lock, so rotation, clearing
/// and appends never interleave.
pub struct QueryLogWriter {
    state: Mutex<WriterState>,
}

impl QueryLogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(WriterState {
                files: LogFiles::new(dir),
                backlog: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WriterState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn files(&self) -> LogFiles {
        self.lock().files.clone()
    }

    pub fn set_dir(&self, dir: &Path) {
        let mut state = self.lock();
        if state.files.dir() != dir {
            state.files = LogFiles::new(dir);
        }
    }

    pub fn backlog_len(&self) -> usize {
        self.lock().backlog.len()
    }

    /// Appends `entries` oldest first, after any backlog. On failure the
    /// whole batch joins the backlog. Returns the number of lines written.
    ///
    /// A file grown past the size limit is rotated after the write. A failed
    /// rotation is logged and retried later; the lines stay written.
    pub fn write_entries(
        &self,
        entries: Vec<LogEntry>,
        policy: &RotationPolicy,
    ) -> Result<usize, DomainError> {
        let mut state = self.lock();

        let mut batch = std::mem::take(&mut state.backlog);
        batch.extend(entries);
        if batch.is_empty() {
            return Ok(0);
        }

        match append_lines(state.files.dir(), &state.files.active(), &batch) {
            Ok(()) => {
                debug!(count = batch.len(), "Wrote query log entries");
            }
            Err(e) => {
                error!(
                    error = %e,
                    pending = batch.len(),
                    "Failed to write query log, keeping entries for the next flush"
                );
                state.backlog = batch;
                return Err(DomainError::QueryLogIo(e.to_string()));
            }
        }

        if policy.max_file_size > 0 {
            let size = state.files.active_size().unwrap_or(0);
            if size >= policy.max_file_size {
                if let Err(e) = rotate_locked(&state.files, policy) {
                    error!(error = %e, size, "Failed to rotate query log after write");
                }
            }
        }

        Ok(batch.len())
    }

    /// Rotates when the active file is older than the interval or larger
    /// than the size limit. Returns true if it rotated.
    pub fn rotate_if_due(&self, policy: &RotationPolicy) -> Result<bool, DomainError> {
        let state = self.lock();
        let io_err = |e: std::io::Error| DomainError::QueryLogIo(e.to_string());

        let Some(started_at) = state.files.active_started_at().map_err(io_err)? else {
            return Ok(false);
        };
        let size = state.files.active_size().map_err(io_err)?;

        if !policy.is_due(started_at, size, Utc::now()) {
            return Ok(false);
        }

        rotate_locked(&state.files, policy)?;
        Ok(true)
    }

    /// Drops the backlog and removes the active file and its predecessor.
    pub fn clear(&self) -> Result<(), DomainError> {
        let mut state = self.lock();
        state.backlog.clear();
        state
            .files
            .remove_current()
            .map_err(|e| DomainError::QueryLogIo(e.to_string()))
    }
}

fn rotate_locked(files: &LogFiles, policy: &RotationPolicy) -> Result<(), DomainError> {
    files
        .rotate(policy.max_archives, Utc::now())
        .map_err(|e| DomainError::QueryLogIo(format!("rotation: {}", e)))
}

fn append_lines(dir: &Path, path: &Path, entries: &[LogEntry]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = BufWriter::new(file);

    let mut buf = Vec::with_capacity(entries.len() * 256);
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }

    writer.write_all(&buf)?;
    writer.flush()
}
