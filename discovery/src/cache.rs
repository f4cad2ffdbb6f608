//! Help output cache with executable fingerprint invalidation.
//!
//! Discovery runs `cdo -h <operator>` once per operator, which dominates
//! start-up time. [`CachingInvoker`] memoizes successful outputs by argument
//! vector and persists them as one JSON file per executable fingerprint, so
//! installing a different build of the tool starts a fresh cache.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CdoConfig;
use crate::error::InvocationError;
use crate::invoker::ProcessInvoker;

/// Fingerprint of the executable whose output is cached.
#[derive(Debug, Clone, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub executable_path: PathBuf,
    pub mtime_secs: i64,
    pub size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheFile {
    key: CacheKey,
    entries: BTreeMap<String, String>,
}

/// Builds a cache key by resolving `executable` and reading its metadata.
///
/// Returns `None` when the executable cannot be found.
pub fn build_cache_key(executable: &str) -> Option<CacheKey> {
    let exe_path = resolve_executable(executable)?;
    let metadata = fs::metadata(&exe_path).ok()?;
    let mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);

    Some(CacheKey {
        executable_path: exe_path,
        mtime_secs: mtime,
        size_bytes: metadata.len(),
    })
}

/// Default cache directory (`$XDG_CACHE_HOME/cdo-bind` or `~/.cache/cdo-bind`).
pub fn default_dir() -> PathBuf {
    dirs_cache_dir().join("cdo-bind")
}

/// Opens the cache configured by `config.cache_dir` around `inner`.
///
/// Returns `None` when caching is disabled or the executable cannot be
/// fingerprinted.
pub fn open_for_config(
    config: &CdoConfig,
    inner: Arc<dyn ProcessInvoker>,
) -> Option<Arc<CachingInvoker>> {
    let dir = config.cache_dir.as_deref()?;
    let Some(key) = build_cache_key(&config.executable) else {
        debug!(executable = %config.executable, "Cannot fingerprint executable, help cache disabled");
        return None;
    };
    Some(Arc::new(CachingInvoker::open(inner, dir, key)))
}

/// [`ProcessInvoker`] decorator that memoizes successful outputs.
///
/// Failures are never cached. Call [`flush`](Self::flush) to persist new
/// entries.
pub struct CachingInvoker {
    inner: Arc<dyn ProcessInvoker>,
    path: PathBuf,
    key: CacheKey,
    entries: Mutex<BTreeMap<String, String>>,
    dirty: AtomicBool,
}

impl CachingInvoker {
    /// Opens the cache for `key` under `cache_dir`, loading any entries
    /// stored for the same fingerprint.
    pub fn open(inner: Arc<dyn ProcessInvoker>, cache_dir: &Path, key: CacheKey) -> Self {
        let path = entry_path(cache_dir, &key);
        let entries = load_entries(&path, &key).unwrap_or_default();
        debug!(path = %path.display(), entries = entries.len(), "Opened help cache");
        Self {
            inner,
            path,
            key,
            entries: Mutex::new(entries),
            dirty: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the cache file if new entries were added.
    pub fn flush(&self) -> std::io::Result<()> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = CacheFile {
            key: self.key.clone(),
            entries: self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(std::io::Error::other)?;
        fs::write(&self.path, json)
    }
}

impl ProcessInvoker for CachingInvoker {
    fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
        let key = argv.join("\u{1f}");
        if let Some(hit) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(hit.clone());
        }

        let output = self.inner.invoke(argv)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, output.clone());
        self.dirty.store(true, Ordering::SeqCst);
        Ok(output)
    }
}

fn load_entries(path: &Path, key: &CacheKey) -> Option<BTreeMap<String, String>> {
    let raw = fs::read_to_string(path).ok()?;
    let file: CacheFile = serde_json::from_str(&raw).ok()?;
    // A fingerprint mismatch means the stored entries are stale.
    (file.key == *key).then_some(file.entries)
}

fn entry_path(cache_dir: &Path, key: &CacheKey) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    cache_dir.join(format!("{:016x}.json", hasher.finish()))
}

fn resolve_executable(executable: &str) -> Option<PathBuf> {
    if executable.contains(std::path::MAIN_SEPARATOR) {
        return fs::canonicalize(executable).ok();
    }
    let output = Command::new("which").arg(executable).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if path_str.is_empty() {
        return None;
    }
    fs::canonicalize(&path_str)
        .ok()
        .or_else(|| Some(PathBuf::from(path_str)))
}

fn dirs_cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".cache");
    }
    std::env::temp_dir()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl ProcessInvoker for Counting {
        fn invoke(&self, argv: &[String]) -> Result<String, InvocationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if argv.iter().any(|arg| arg == "fail") {
                return Err(InvocationError::NonZeroExit {
                    status: Some(1),
                    stderr: "nope".into(),
                });
            }
            Ok(format!("help for {}", argv.join(" ")))
        }
    }

    fn key(size_bytes: u64) -> CacheKey {
        CacheKey {
            executable_path: PathBuf::from("/usr/bin/cdo"),
            mtime_secs: 1_700_000_000,
            size_bytes,
        }
    }

    fn argv(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_memoizes_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(Counting::default());

        let cache = CachingInvoker::open(inner.clone(), dir.path(), key(1));
        let help = argv(&["cdo", "-h", "sinfo"]);
        assert_eq!(cache.invoke(&help).unwrap(), "help for cdo -h sinfo");
        assert_eq!(cache.invoke(&help).unwrap(), "help for cdo -h sinfo");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        cache.flush().unwrap();

        let reopened = CachingInvoker::open(inner.clone(), dir.path(), key(1));
        assert_eq!(reopened.len(), 1);
        reopened.invoke(&help).unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_different_fingerprint_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(Counting::default());

        let cache = CachingInvoker::open(inner.clone(), dir.path(), key(1));
        cache.invoke(&argv(&["cdo", "--operators"])).unwrap();
        cache.flush().unwrap();

        let other = CachingInvoker::open(inner, dir.path(), key(2));
        assert!(other.is_empty());
    }

    #[test]
    fn test_failures_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let inner = Arc::new(Counting::default());
        let cache = CachingInvoker::open(inner.clone(), dir.path(), key(1));

        let failing = argv(&["cdo", "-h", "fail"]);
        assert!(cache.invoke(&failing).is_err());
        assert!(cache.invoke(&failing).is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_open_for_config() {
        let dir = tempfile::tempdir().unwrap();
        let inner: Arc<dyn ProcessInvoker> = Arc::new(Counting::default());

        let disabled = CdoConfig::default();
        assert!(open_for_config(&disabled, inner.clone()).is_none());

        let unknown = CdoConfig {
            executable: "/nonexistent/path/to/cdo".into(),
            cache_dir: Some(dir.path().to_path_buf()),
            ..CdoConfig::default()
        };
        assert!(open_for_config(&unknown, inner.clone()).is_none());

        let exe = tempfile::NamedTempFile::new().unwrap();
        let config = CdoConfig {
            executable: exe.path().display().to_string(),
            cache_dir: Some(dir.path().to_path_buf()),
            ..CdoConfig::default()
        };
        let cache = open_for_config(&config, inner).unwrap();
        cache.invoke(&argv(&["cdo", "--operators"])).unwrap();
        cache.flush().unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unknown_executable_has_no_key() {
        assert!(build_cache_key("/nonexistent/path/to/cdo").is_none());
    }
}
