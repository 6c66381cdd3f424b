//! Run configuration.
//!
//! Values are resolved in layers: built-in defaults, then an optional TOML
//! file, then environment variables. The binary applies its command-line
//! flags last.
//!
//! ```toml
//! api_url = "https://api.sejm.gov.pl/sejm"
//! database_path = "data/sejm.duckdb"
//! max_concurrent_fetches = 8
//! request_timeout_secs = 30
//!
//! [retry]
//! max_attempts = 3
//! min_delay_secs = 4
//! max_delay_secs = 10
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Public endpoint of the Sejm API.
pub const DEFAULT_API_URL: &str = "https://api.sejm.gov.pl/sejm";

/// Environment variable naming a TOML config file.
pub const CONFIG_ENV: &str = "SEJM_MIRROR_CONFIG";

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`IngestConfig`].
    #[error("Invalid config {}: {source}", path.display())]
    Toml {
        /// Path of the config file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// An environment variable holds a value of the wrong type.
    #[error("Invalid value {value:?} for {name}")]
    Env {
        /// Variable name.
        name: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Backoff settings for remote requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub min_delay_secs: u64,
    /// Upper bound for any retry delay, in seconds.
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_secs: 4,
            max_delay_secs: 10,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub const fn min_delay(&self) -> Duration {
        Duration::from_secs(self.min_delay_secs)
    }

    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_secs)
    }
}

/// Settings for one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Base URL of the Sejm API.
    pub api_url: String,
    /// Location of the mirror database. `None` uses the default under the
    /// workspace `data/` directory.
    pub database_path: Option<PathBuf>,
    /// Maximum vote-detail requests in flight per sitting.
    pub max_concurrent_fetches: usize,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
    /// Backoff settings.
    pub retry: RetryConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            database_path: None,
            max_concurrent_fetches: 8,
            request_timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Loads the configuration from defaults, the file at `path` (or the
    /// one named by `SEJM_MIRROR_CONFIG`), and the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// environment variable is malformed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Reads a TOML config file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Overrides fields from environment variables read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Env`] if a numeric variable does not parse.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("SEJM_API_URL") {
            self.api_url = url;
        }
        if let Some(path) = lookup("SEJM_MIRROR_DB") {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(n) = parse_env(&lookup, "SEJM_MIRROR_CONCURRENCY")? {
            self.max_concurrent_fetches = n;
        }
        if let Some(secs) = parse_env(&lookup, "SEJM_MIRROR_TIMEOUT_SECS")? {
            self.request_timeout_secs = secs;
        }
        Ok(())
    }

    /// Concurrency bound for vote-detail fetches. Never zero.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.max_concurrent_fetches.max(1)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Env { name, value })
        })
        .transpose()
}
