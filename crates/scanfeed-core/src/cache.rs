//! TTL-aware JSON key/value cache. Every operation fails soft: storage and
//! serialization errors are logged and reported as "absent" / no-op.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

/// Snapshot freshness window used by the sync layer.
pub const CACHE_TTL: Duration = Duration::from_secs(50 * 60);

pub mod keys {
    pub const CHANNELS: &str = "cached_channels";
    pub const MESSAGES: &str = "cached_messages";
    pub const KEYWORDS: &str = "cached_keywords";
    pub const TIMEZONE: &str = "cached_timezone";
    pub const LAST_FETCH: &str = "last_fetch_time";
    pub const VIEW_PREFERENCES: &str = "view_preferences";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid cache key {0:?}")]
    InvalidKey(String),
    #[error("cache i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Raw string storage behind [`CacheStore`].
pub trait KeyValueStore: Send + Sync {
    fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    fn clear(&self) -> Result<(), StoreError>;
    fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries().remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.entries().clear();
        Ok(())
    }
}

/// One `<key>.json` file per entry inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.as_path()
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn init(&self) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn clear(&self) -> Result<(), StoreError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        opts.mode(0o600);
    }
    let mut file = opts.open(path)?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Millisecond wall clock; swapped for [`ManualClock`] in tests.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore").finish_non_exhaustive()
    }
}

impl CacheStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    pub fn on_disk(dir: impl AsRef<Path>) -> Self {
        Self::new(Arc::new(FileStore::new(dir)), Arc::new(SystemClock))
    }

    /// Prepares the backing store. Failure leaves the cache usable but every
    /// later write will likely fail soft as well.
    pub fn init(&self) -> bool {
        match self.store.init() {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, "cache init failed");
                false
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(err) => {
                warn!(key, error = %err, "cache serialize failed");
                return;
            }
        };
        if let Err(err) = self.store.write(key, &encoded) {
            warn!(key, error = %err, "cache write failed");
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(key, error = %err, "discarding corrupt cache entry");
                None
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if let Err(err) = self.store.remove(key) {
            warn!(key, error = %err, "cache remove failed");
        }
    }

    /// Stores the current clock reading under `key`.
    pub fn mark_written(&self, key: &str) {
        self.set(key, &self.now_ms());
    }

    /// True iff `key` holds a write timestamp younger than `ttl`.
    pub fn is_fresh(&self, key: &str, ttl: Duration) -> bool {
        let Some(written_ms) = self.get::<i64>(key) else {
            return false;
        };
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let age_ms = self.now_ms().saturating_sub(written_ms);
        debug!(key, age_ms, ttl_ms, "cache freshness check");
        age_ms < ttl_ms
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn flush(&self) {
        if let Err(err) = self.store.flush() {
            warn!(error = %err, "cache flush failed");
        }
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "cache clear failed");
        }
    }
}
