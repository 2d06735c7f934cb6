use super::ring_buffer::RingBuffer;
use super::rotation::RotationPolicy;
use super::writer::QueryLogWriter;
use chrono::Utc;
use ferrous_sieve_application::ports::{
    ClientFinder, HttpRegistrar, QueryLogObserver, QueryLogPort, QueryLogReader,
};
use ferrous_sieve_domain::{
    normalize_domain, AddParams, DnsClass, DomainError, LogEntry, QueryLogConfig, RecordType,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const ROTATION_CHECK_INTERVAL: Duration = Duration::from_secs(60 * 60);

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_CLOSING: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLogState {
    Stopped,
    Running,
    Closing,
}

impl QueryLogState {
    fn from_u8(value: u8) -> Self {
        match value {
            STATE_RUNNING => QueryLogState::Running,
            STATE_CLOSING => QueryLogState::Closing,
            _ => QueryLogState::Stopped,
        }
    }
}

struct ConfState {
    config: QueryLogConfig,
    ignored: HashSet<String>,
}

struct BufferState {
    ring: RingBuffer<LogEntry>,
    /// Entries pushed out of a full ring before a flush drained them. Only
    /// kept while file logging is on; written ahead of the ring.
    spilled: Vec<LogEntry>,
    flush_pending: bool,
}

struct Inner {
    conf: RwLock<ConfState>,
    buffer: RwLock<BufferState>,
    /// Serializes flush and clear.
    flush_lock: Mutex<()>,
    writer: QueryLogWriter,
    state: AtomicU8,
    shutdown: CancellationToken,
    client_finder: Option<Arc<dyn ClientFinder>>,
    observer: Option<Arc<dyn QueryLogObserver>>,
    registrar: Option<Arc<dyn HttpRegistrar>>,
}

/// In-memory buffer of recent queries persisted to a rotated JSON-lines
/// file. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryLog {
    inner: Arc<Inner>,
}

/// Optional collaborators of a [`QueryLog`].
pub struct QueryLogBuilder {
    config: QueryLogConfig,
    client_finder: Option<Arc<dyn ClientFinder>>,
    observer: Option<Arc<dyn QueryLogObserver>>,
    registrar: Option<Arc<dyn HttpRegistrar>>,
}

impl QueryLogBuilder {
    pub fn client_finder(mut self, finder: Arc<dyn ClientFinder>) -> Self {
        self.client_finder = Some(finder);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueryLogObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn http_registrar(mut self, registrar: Arc<dyn HttpRegistrar>) -> Self {
        self.registrar = Some(registrar);
        self
    }

    pub fn build(self) -> Result<QueryLog, DomainError> {
        let Self {
            config,
            client_finder,
            observer,
            registrar,
        } = self;

        config.validate()?;

        let ignored = config.ignored_set();
        let writer = QueryLogWriter::new(config.dir.clone());
        let ring = RingBuffer::new(config.mem_size);

        Ok(QueryLog {
            inner: Arc::new(Inner {
                conf: RwLock::new(ConfState { config, ignored }),
                buffer: RwLock::new(BufferState {
                    ring,
                    spilled: Vec::new(),
                    flush_pending: false,
                }),
                flush_lock: Mutex::new(()),
                writer,
                state: AtomicU8::new(STATE_STOPPED),
                shutdown: CancellationToken::new(),
                client_finder,
                observer,
                registrar,
            }),
        })
    }
}

impl QueryLog {
    pub fn builder(config: QueryLogConfig) -> QueryLogBuilder {
        QueryLogBuilder {
            config,
            client_finder: None,
            observer: None,
            registrar: None,
        }
    }

    /// A query log without a client finder, observer or registrar.
    pub fn new(config: QueryLogConfig) -> Result<Self, DomainError> {
        Self::builder(config).build()
    }

    pub fn state(&self) -> QueryLogState {
        QueryLogState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Registers the read endpoints, if a registrar is configured, and starts
    /// the hourly rotation check. Calling it on a running log does nothing.
    pub fn start(&self) {
        if self
            .inner
            .state
            .compare_exchange(
                STATE_STOPPED,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            warn!("Query log already started");
            return;
        }

        if let Some(registrar) = &self.inner.registrar {
            let reader: Arc<dyn QueryLogReader> = Arc::new(self.clone());
            registrar.register_query_log(reader);
        }

        match Handle::try_current() {
            Ok(handle) => {
                let inner = Arc::clone(&self.inner);
                handle.spawn(periodic_rotate(inner));
            }
            Err(_) => {
                warn!("No async runtime, periodic query log rotation disabled");
            }
        }

        let conf = self.inner.conf();
        info!(
            dir = %conf.config.dir.display(),
            mem_size = conf.config.mem_size,
            file_enabled = conf.config.file_enabled,
            "Query log started"
        );
    }

    /// Writes what is buffered, when file logging is on, and stops the
    /// rotation check. Safe to call more than once.
    pub fn close(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.state.store(STATE_CLOSING, Ordering::Release);

        let file_enabled = self.inner.conf().config.file_enabled;
        if file_enabled {
            if let Err(e) = self.inner.flush() {
                error!(error = %e, "Failed to flush query log on close");
            }
        }

        self.inner.shutdown.cancel();
        self.inner.state.store(STATE_STOPPED, Ordering::Release);
        info!("Query log closed");
    }

    /// Drains the buffer to the active file.
    pub fn flush(&self) -> Result<usize, DomainError> {
        self.inner.flush()
    }

    /// Empties the buffer and the writer backlog and removes the active file
    /// and its predecessor. Serialized with flushes, so nothing cleared is
    /// written afterwards.
    pub fn clear(&self) -> Result<(), DomainError> {
        let _flush = self.inner.flush_guard();

        {
            let mut buffer = self.inner.buffer_mut();
            buffer.ring.clear();
            buffer.spilled.clear();
            buffer.flush_pending = false;
        }

        match self.inner.writer.clear() {
            Ok(()) => {
                debug!("Query log cleared");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to remove query log files");
                Err(e)
            }
        }
    }

    /// Rotates the active file now if it is due.
    pub fn rotate_if_due(&self) -> Result<bool, DomainError> {
        self.inner.rotate_if_due()
    }

    /// Newest buffered entries first.
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let buffer = self.inner.buffer();
        buffer.ring.iter().rev().take(limit).cloned().collect()
    }

    pub fn buffered_len(&self) -> usize {
        let buffer = self.inner.buffer();
        buffer.ring.len() + buffer.spilled.len()
    }

    pub fn is_flush_pending(&self) -> bool {
        self.inner.buffer().flush_pending
    }

    pub fn write_disk_config(&self, target: &mut QueryLogConfig) {
        target.clone_from(&self.inner.conf().config);
    }

    /// Replaces the configuration. The ring is resized keeping the newest
    /// entries and the writer follows a changed directory. With file logging
    /// on, entries that no longer fit are kept for the next flush.
    pub fn set_config(&self, config: QueryLogConfig) -> Result<(), DomainError> {
        config.validate()?;

        let ignored = config.ignored_set();
        let mem_size = config.mem_size;
        let file_enabled = config.file_enabled;
        let dir = config.dir.clone();

        {
            let mut conf = self.inner.conf_mut();
            conf.config = config;
            conf.ignored = ignored;
        }

        {
            let mut buffer = self.inner.buffer_mut();
            if buffer.ring.capacity() != mem_size {
                if file_enabled && buffer.ring.len() > mem_size {
                    let mut kept = buffer.ring.drain();
                    let overflow = kept.len() - mem_size;
                    buffer.spilled.extend(kept.drain(..overflow));
                    buffer.ring.resize(mem_size);
                    for entry in kept {
                        buffer.ring.append(entry);
                    }
                } else {
                    buffer.ring.resize(mem_size);
                }
            }
        }

        self.inner.writer.set_dir(&dir);
        info!(dir = %dir.display(), mem_size, "Query log configuration updated");
        Ok(())
    }

    pub fn writer(&self) -> &QueryLogWriter {
        &self.inner.writer
    }
}

impl Inner {
    fn conf(&self) -> RwLockReadGuard<'_, ConfState> {
        self.conf.read().unwrap_or_else(|e| e.into_inner())
    }

    fn conf_mut(&self) -> RwLockWriteGuard<'_, ConfState> {
        self.conf.write().unwrap_or_else(|e| e.into_inner())
    }

    fn buffer(&self) -> RwLockReadGuard<'_, BufferState> {
        self.buffer.read().unwrap_or_else(|e| e.into_inner())
    }

    fn buffer_mut(&self) -> RwLockWriteGuard<'_, BufferState> {
        self.buffer.write().unwrap_or_else(|e| e.into_inner())
    }

    fn flush_guard(&self) -> MutexGuard<'_, ()> {
        self.flush_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn policy(&self) -> RotationPolicy {
        RotationPolicy::from_config(&self.conf().config)
    }

    fn flush(&self) -> Result<usize, DomainError> {
        let _flush = self.flush_guard();
        let start = Instant::now();

        let entries = {
            let mut buffer = self.buffer_mut();
            let mut entries = std::mem::take(&mut buffer.spilled);
            entries.extend(buffer.ring.drain());
            buffer.flush_pending = false;
            entries
        };

        let count = entries.len();
        let policy = self.policy();

        match self.writer.write_entries(entries, &policy) {
            Ok(written) => {
                let elapsed = start.elapsed();
                if written > 0 {
                    debug!(
                        entries = written,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "Flushed query log"
                    );
                }
                if let Some(observer) = &self.observer {
                    observer.flushed(written, elapsed);
                }
                Ok(written)
            }
            Err(e) => {
                if let Some(observer) = &self.observer {
                    observer.flush_failed(count);
                }
                Err(e)
            }
        }
    }

    fn rotate_if_due(&self) -> Result<bool, DomainError> {
        if !self.conf().config.file_enabled {
            return Ok(false);
        }
        let policy = self.policy();
        self.writer.rotate_if_due(&policy)
    }

    fn schedule_flush(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        let task = move || {
            if let Err(e) = inner.flush() {
                error!(error = %e, "Failed to flush query log after reaching the buffer limit");
            }
        };

        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(task);
            }
            Err(_) => task(),
        }
    }

    fn add(self: &Arc<Self>, params: AddParams) {
        let (enabled, file_enabled, mem_size) = {
            let conf = self.conf();
            (
                conf.config.enabled,
                conf.config.file_enabled,
                conf.config.mem_size,
            )
        };

        if !enabled {
            return;
        }

        let mut entry = match LogEntry::from_params(params, Utc::now()) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Dropping query log record");
                return;
            }
        };

        if let Some(observer) = &self.observer {
            observer.entry_added(&entry);
        }

        let schedule = {
            let mut buffer = self.buffer_mut();

            // Stamped under the buffer lock so arrival order and time order agree.
            entry.time = Utc::now();

            if let Some(evicted) = buffer.ring.append(entry) {
                if file_enabled {
                    buffer.spilled.push(evicted);
                }
            }

            if !buffer.flush_pending && file_enabled && buffer.ring.len() >= mem_size {
                buffer.flush_pending = true;
                true
            } else {
                false
            }
        };

        if schedule {
            self.schedule_flush();
        }
    }

    fn should_log(&self, host: &str, ids: &[&str]) -> bool {
        let conf = self.conf();

        if let Some(finder) = &self.client_finder {
            match finder.find_client(ids) {
                Ok(Some(client)) if client.ignore_query_log => return false,
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Failed to find client for query log");
                }
            }
        }

        !conf.ignored.contains(&normalize_domain(host))
    }
}

async fn periodic_rotate(inner: Arc<Inner>) {
    let mut interval = tokio::time::interval(ROTATION_CHECK_INTERVAL);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => {
                debug!("Query log rotation check stopped");
                return;
            }
            _ = interval.tick() => {
                let task_inner = Arc::clone(&inner);
                match tokio::task::spawn_blocking(move || task_inner.rotate_if_due()).await {
                    Ok(Ok(true)) => info!("Query log rotated on schedule"),
                    Ok(Ok(false)) => {}
                    Ok(Err(e)) => error!(error = %e, "Failed to rotate query log"),
                    Err(e) => error!(error = %e, "Query log rotation task panicked"),
                }
            }
        }
    }
}

impl QueryLogPort for QueryLog {
    fn should_log(&self, host: &str, _qtype: RecordType, _qclass: DnsClass, ids: &[&str]) -> bool {
        self.inner.should_log(host, ids)
    }

    fn add(&self, params: AddParams) {
        self.inner.add(params);
    }
}

impl QueryLogReader for QueryLog {
    fn recent(&self, limit: usize) -> Vec<LogEntry> {
        QueryLog::recent(self, limit)
    }

    fn config(&self) -> QueryLogConfig {
        self.inner.conf().config.clone()
    }
}
