//! Collector configuration
//!
//! Three layers, later wins:
//! 1. Built-in defaults
//! 2. Config file (TOML, `--config`)
//! 3. CLI flags
//!
//! ```toml
//! cache_root = "/var/cache/build/disk-cache"
//! jobs = 4
//! dry_run = false
//!
//! [policy]
//! max_size = "10GiB"   # or integer bytes
//! max_age = "14d"      # or integer seconds
//! ```
//!
//! Everything is validated before the collector is built, so a bad value
//! never gets as far as scanning.

mod units;

pub use units::{format_size, parse_duration_secs, parse_size};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use diskcache_collector::{CollectionPolicy, GcError};
use serde::{Deserialize, Serialize};

/// Error types for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error(transparent)]
    Collector(#[from] GcError),
}

/// A limit written either as a bare integer or as a string with a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LimitValue {
    Number(i64),
    Text(String),
}

impl LimitValue {
    fn bytes(&self) -> Result<i64, ConfigError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_size(s)
                .map_err(|e| ConfigError::ValidationError(format!("max_size: {}", e))),
        }
    }

    fn seconds(&self) -> Result<i64, ConfigError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(s) => parse_duration_secs(s)
                .map_err(|e| ConfigError::ValidationError(format!("max_age: {}", e))),
        }
    }
}

/// `[policy]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Upper bound on total bytes kept in `ac` + `cas`
    pub max_size: Option<LimitValue>,

    /// Upper bound on entry age
    pub max_age: Option<LimitValue>,
}

/// Collector configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcConfig {
    /// Cache root containing `ac/`, `cas/`, `tmp/` and `gc/`
    pub cache_root: Option<PathBuf>,

    /// Worker threads for scanning and deleting
    pub jobs: Option<i64>,

    /// Log what would be deleted without deleting
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Values given on the command line. `None` leaves the file value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub cache_root: Option<PathBuf>,
    pub max_size: Option<String>,
    pub max_age: Option<String>,
    pub jobs: Option<usize>,
    pub dry_run: bool,
}

/// Fully validated settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub cache_root: PathBuf,
    pub jobs: usize,
    pub dry_run: bool,
    pub policy: CollectionPolicy,
}

impl GcConfig {
    /// Load and parse config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse config from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: GcConfig = toml::from_str(s)?;
        Ok(config)
    }

    /// Apply CLI flags on top of this config.
    pub fn apply(&mut self, overrides: CliOverrides) {
        if let Some(root) = overrides.cache_root {
            self.cache_root = Some(root);
        }
        if let Some(size) = overrides.max_size {
            self.policy.max_size = Some(LimitValue::Text(size));
        }
        if let Some(age) = overrides.max_age {
            self.policy.max_age = Some(LimitValue::Text(age));
        }
        if let Some(jobs) = overrides.jobs {
            self.jobs = Some(jobs as i64);
        }
        self.dry_run |= overrides.dry_run;
    }

    /// Validate and produce the settings for a run.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        let cache_root = self.cache_root.clone().ok_or_else(|| {
            ConfigError::ValidationError(
                "cache_root is required (set it in the config file or pass --disk-cache)"
                    .to_string(),
            )
        })?;

        let jobs = match self.jobs {
            None => default_jobs(),
            Some(n) if n >= 1 => n as usize,
            Some(n) => {
                return Err(ConfigError::ValidationError(format!(
                    "jobs must be at least 1, got {}",
                    n
                )))
            }
        };

        let max_size = self.policy.max_size.as_ref().map(LimitValue::bytes).transpose()?;
        let max_age = self.policy.max_age.as_ref().map(LimitValue::seconds).transpose()?;
        let policy = CollectionPolicy::from_signed(max_size, max_age)?;

        Ok(ResolvedConfig {
            cache_root,
            jobs,
            dry_run: self.dry_run,
            policy,
        })
    }
}

/// Default worker count: one per core, capped.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(16)
}
