//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::path::cache::CacheSettings;
use crate::platform::PlatformProfile;
use crate::{AppError, Result};

/// Validation defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct ValidationConfig {
    /// Timeout applied when a call does not supply one.
    pub default_timeout_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 30_000,
        }
    }
}

/// Result cache tuning.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct CacheConfig {
    /// Whether results are cached at all.
    pub enabled: bool,
    /// Capacity before LRU eviction.
    pub max_entries: usize,
    /// Entry lifetime.
    pub ttl_seconds: u64,
    /// Whether reads extend an entry's lifetime.
    pub refresh_on_read: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            ttl_seconds: 300,
            refresh_on_read: false,
        }
    }
}

/// HTTP controller binding.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct HttpConfig {
    /// Interface address.
    pub bind: String,
    /// TCP port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3001,
        }
    }
}

/// Audit trail settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", default)]
pub struct AuditConfig {
    /// Whether validation calls are appended to JSONL files.
    pub enabled: bool,
    /// Directory holding `audit-YYYY-MM-DD.jsonl` files.
    pub log_dir: PathBuf,
    /// Days a file is kept before the retention task deletes it.
    pub retention_days: u32,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: PathBuf::from(".repo-path-guard").join("logs"),
            retention_days: 30,
        }
    }
}

fn default_platform() -> String {
    "auto".into()
}

/// Global configuration parsed from `config.toml`. Every section is optional.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Platform rules: `auto`, `win32`/`windows`, or a POSIX identifier.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Validation defaults.
    #[serde(default)]
    pub validation: ValidationConfig,
    /// Result cache tuning.
    #[serde(default)]
    pub cache: CacheConfig,
    /// HTTP controller binding.
    #[serde(default)]
    pub http: HttpConfig,
    /// Audit trail settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            validation: ValidationConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            audit: AuditConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Platform profile named by `platform`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the platform name is empty.
    pub fn platform_profile(&self) -> Result<PlatformProfile> {
        PlatformProfile::from_name(&self.platform)
    }

    /// Timeout applied when a call does not supply one.
    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.validation.default_timeout_ms)
    }

    /// Cache settings derived from the `[cache]` section.
    #[must_use]
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            max_entries: self.cache.max_entries,
            ttl: Duration::from_secs(self.cache.ttl_seconds),
            refresh_on_read: self.cache.refresh_on_read,
        }
    }

    fn validate(&self) -> Result<()> {
        self.platform_profile()?;

        if self.validation.default_timeout_ms == 0 {
            return Err(AppError::Config(
                "validation.default_timeout_ms must be greater than zero".into(),
            ));
        }

        if self.cache.max_entries == 0 {
            return Err(AppError::Config(
                "cache.max_entries must be greater than zero".into(),
            ));
        }

        if self.cache.ttl_seconds == 0 {
            return Err(AppError::Config(
                "cache.ttl_seconds must be greater than zero".into(),
            ));
        }

        if self.audit.enabled && self.audit.retention_days == 0 {
            return Err(AppError::Config(
                "audit.retention_days must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
