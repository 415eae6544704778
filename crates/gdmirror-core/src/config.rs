//! Configuration module for gdmirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for gdmirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub rate_limiting: RateLimitingConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
    pub credentials: CredentialsConfig,
}

/// Mirror layout and pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory receiving one sub-directory per remote root folder.
    pub download_root: PathBuf,
    /// Files downloaded concurrently within one folder.
    pub batch_size: usize,
    /// Objects requested per listing page.
    pub page_size: u32,
    /// Pause between listing pages, in milliseconds.
    pub page_delay_ms: u64,
    /// Manifest file name, written under `download_root`.
    pub manifest_file: String,
    /// Wait for queued retries to finish before saving the cache.
    pub drain_retries_before_exit: bool,
}

/// Token-bucket settings shared by every remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    /// Bucket capacity; the bucket also refills `capacity` tokens per second.
    pub capacity: u32,
}

/// Transfer retry settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Attempts per transfer, and per retry-queue item.
    pub max_attempts: u32,
    /// First backoff delay in milliseconds; doubles with each attempt.
    pub initial_delay_ms: u64,
}

/// Change-cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// When false every file is downloaded on every run.
    pub enabled: bool,
    /// Directory holding the cache file.
    pub dir: PathBuf,
    /// Cache file name inside `dir`.
    pub file_name: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Master switch; `false` silences all log output.
    pub enabled: bool,
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

/// Where the service-account key lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsConfig {
    /// Path to the service-account JSON key file.
    pub path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/gdmirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("gdmirror")
            .join("config.yaml")
    }

    /// Full path of the change-cache file.
    pub fn cache_path(&self) -> PathBuf {
        self.cache.dir.join(&self.cache.file_name)
    }

    /// Full path of the output manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.sync.download_root.join(&self.sync.manifest_file)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            download_root: PathBuf::from("./gdmirror-data"),
            batch_size: 5,
            page_size: 100,
            page_delay_ms: 100,
            manifest_file: "folder_structure.json".to_string(),
            drain_retries_before_exit: true,
        }
    }
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self { capacity: 100 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: PathBuf::from("./"),
            file_name: ".gdmirror-cache.json".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.batch_size"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Largest page size the Drive API accepts.
const MAX_PAGE_SIZE: u32 = 1000;

/// A bare file name: non-empty, no separators, not `.`/`..`.
fn is_bare_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.batch_size == 0 {
            errors.push(ValidationError {
                field: "sync.batch_size".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sync.page_size == 0 || self.sync.page_size > MAX_PAGE_SIZE {
            errors.push(ValidationError {
                field: "sync.page_size".into(),
                message: format!("must be in range 1..={MAX_PAGE_SIZE}"),
            });
        }
        if self.sync.download_root.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "sync.download_root".into(),
                message: "must not be empty".into(),
            });
        }
        if !is_bare_file_name(&self.sync.manifest_file) {
            errors.push(ValidationError {
                field: "sync.manifest_file".into(),
                message: format!(
                    "must be a plain file name, got '{}'",
                    self.sync.manifest_file
                ),
            });
        }

        // --- rate_limiting ---
        if self.rate_limiting.capacity == 0 {
            errors.push(ValidationError {
                field: "rate_limiting.capacity".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- retry ---
        if self.retry.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- cache ---
        if !is_bare_file_name(&self.cache.file_name) {
            errors.push(ValidationError {
                field: "cache.file_name".into(),
                message: format!("must be a plain file name, got '{}'", self.cache.file_name),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use gdmirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .sync_download_root(PathBuf::from("/srv/drive-mirror"))
///     .sync_batch_size(8)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Start from an already loaded configuration (e.g. to apply CLI overrides).
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- sync ---

    pub fn sync_download_root(mut self, root: PathBuf) -> Self {
        self.config.sync.download_root = root;
        self
    }

    pub fn sync_batch_size(mut self, n: usize) -> Self {
        self.config.sync.batch_size = n;
        self
    }

    pub fn sync_page_size(mut self, n: u32) -> Self {
        self.config.sync.page_size = n;
        self
    }

    pub fn sync_page_delay_ms(mut self, ms: u64) -> Self {
        self.config.sync.page_delay_ms = ms;
        self
    }

    pub fn sync_manifest_file(mut self, name: impl Into<String>) -> Self {
        self.config.sync.manifest_file = name.into();
        self
    }

    pub fn sync_drain_retries_before_exit(mut self, drain: bool) -> Self {
        self.config.sync.drain_retries_before_exit = drain;
        self
    }

    // --- rate_limiting ---

    pub fn rate_limiting_capacity(mut self, capacity: u32) -> Self {
        self.config.rate_limiting.capacity = capacity;
        self
    }

    // --- retry ---

    pub fn retry_max_attempts(mut self, n: u32) -> Self {
        self.config.retry.max_attempts = n;
        self
    }

    pub fn retry_initial_delay_ms(mut self, ms: u64) -> Self {
        self.config.retry.initial_delay_ms = ms;
        self
    }

    // --- cache ---

    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.config.cache.enabled = enabled;
        self
    }

    pub fn cache_dir(mut self, dir: PathBuf) -> Self {
        self.config.cache.dir = dir;
        self
    }

    pub fn cache_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.cache.file_name = name.into();
        self
    }

    // --- logging ---

    pub fn logging_enabled(mut self, enabled: bool) -> Self {
        self.config.logging.enabled = enabled;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- credentials ---

    pub fn credentials_path(mut self, path: PathBuf) -> Self {
        self.config.credentials.path = Some(path);
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
