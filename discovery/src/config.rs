//! Runner configuration.
//!
//! Controls which executable is run, extra options passed on every call,
//! process timeouts, help-fetch parallelism, and the help cache.
//!
//! # Example YAML
//!
//! ```yaml
//! executable: /opt/cdo/bin/cdo
//! default_options:
//!   - -s
//! timeout_ms: 30000
//! jobs: 8
//! cache_dir: /home/me/.cache/cdo-bind
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable overriding [`CdoConfig::executable`].
pub const EXECUTABLE_ENV: &str = "CDO";

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "cdo";

/// Configuration for running the tool and discovering its operators.
///
/// # Examples
///
/// ```
/// use cdo_schema_discovery::config::CdoConfig;
///
/// let config = CdoConfig::default();
/// assert_eq!(config.executable, "cdo");
/// assert!(config.default_options.is_empty());
/// assert!(config.timeout_ms.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdoConfig {
    /// Program to run (name on `PATH` or absolute path).
    pub executable: String,
    /// Options inserted before the operator on every invocation.
    pub default_options: Vec<String>,
    /// Per-process timeout in milliseconds. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Parallel help-fetch workers (`None` = adaptive default).
    pub jobs: Option<usize>,
    /// Directory for cached help output. `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for CdoConfig {
    fn default() -> Self {
        Self {
            executable: DEFAULT_EXECUTABLE.to_string(),
            default_options: Vec::new(),
            timeout_ms: None,
            jobs: None,
            cache_dir: None,
        }
    }
}

impl CdoConfig {
    /// Loads configuration from a YAML file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Applies the `CDO` environment variable, if set and non-empty.
    pub fn with_env_overrides(self) -> Self {
        let value = std::env::var(EXECUTABLE_ENV).ok();
        self.with_executable_override(value.as_deref())
    }

    fn with_executable_override(mut self, value: Option<&str>) -> Self {
        if let Some(executable) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.executable = executable.to_string();
        }
        self
    }
}
