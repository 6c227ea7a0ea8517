//! Configuration loading, validation, and management for classbatch.
//!
//! Loads configuration from `~/.classbatch/config.toml` (or an explicit path)
//! with environment variable overrides. Validates all settings at startup so
//! bad bounds are rejected before the database is opened.

use classbatch_core::{AllocationRequest, ClassNaming, EducatorId, EligibilityFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.classbatch/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database connection settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Class size bounds and naming
    #[serde(default)]
    pub allocation: AllocationConfig,

    /// Which students may be placed into classes
    #[serde(default)]
    pub eligibility: EligibilityFilter,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL, e.g. `sqlite:///var/lib/classbatch/classbatch.sqlite`
    #[serde(default = "default_database_url")]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_url() -> String {
    format!(
        "sqlite://{}",
        AppConfig::config_dir().join("classbatch.sqlite").display()
    )
}
fn default_max_connections() -> u32 {
    4
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Mask the password component of a connection URL for Debug output.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:[REDACTED]@{host}"),
        None => url.to_string(),
    }
}

impl DatabaseConfig {
    /// The connection URL with any password masked, for display.
    pub fn redacted_url(&self) -> String {
        redact_url(&self.url)
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &redact_url(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    #[serde(default = "default_min_size")]
    pub min_size: usize,

    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// Educator who owns generated classes
    #[serde(default = "default_educator_id")]
    pub educator_id: i64,

    /// Name prefix of generated classes; the sequence number follows it
    #[serde(default = "default_class_name_prefix")]
    pub class_name_prefix: String,
}

fn default_min_size() -> usize {
    22
}
fn default_max_size() -> usize {
    28
}
fn default_educator_id() -> i64 {
    1
}
fn default_class_name_prefix() -> String {
    classbatch_core::registry::DEFAULT_CLASS_PREFIX.into()
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            min_size: default_min_size(),
            max_size: default_max_size(),
            educator_id: default_educator_id(),
            class_name_prefix: default_class_name_prefix(),
        }
    }
}

impl AllocationConfig {
    pub fn naming(&self) -> ClassNaming {
        ClassNaming::new(self.class_name_prefix.clone())
    }
}

impl AppConfig {
    /// Load configuration from `path`, or from `~/.classbatch/config.toml`.
    ///
    /// Environment variable overrides (highest priority):
    /// - `CLASSBATCH_DATABASE_URL`
    /// - `CLASSBATCH_EDUCATOR_ID`
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_path();
        let mut config = Self::load_from(path.unwrap_or(&default_path))?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("CLASSBATCH_DATABASE_URL") {
            self.database.url = url;
        }

        if let Some(raw) = lookup("CLASSBATCH_EDUCATOR_ID") {
            self.allocation.educator_id = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "CLASSBATCH_EDUCATOR_ID must be an integer (got {raw:?})"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".classbatch")
    }

    /// Get the default configuration file path.
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let allocation = &self.allocation;
        if allocation.min_size < 1 {
            return Err(ConfigError::ValidationError(
                "allocation.min_size must be at least 1".into(),
            ));
        }

        if allocation.min_size > allocation.max_size {
            return Err(ConfigError::ValidationError(format!(
                "allocation.min_size ({}) must not exceed allocation.max_size ({})",
                allocation.min_size, allocation.max_size
            )));
        }

        if allocation.class_name_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "allocation.class_name_prefix must not be empty".into(),
            ));
        }

        if self.eligibility.required_measurements < 1 {
            return Err(ConfigError::ValidationError(
                "eligibility.required_measurements must be at least 1".into(),
            ));
        }

        if self.database.max_connections < 1 {
            return Err(ConfigError::ValidationError(
                "database.max_connections must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Build the request for one allocation run.
    pub fn allocation_request(&self, dry_run: bool) -> AllocationRequest {
        AllocationRequest {
            min_size: self.allocation.min_size,
            max_size: self.allocation.max_size,
            educator_id: EducatorId(self.allocation.educator_id),
            naming: self.allocation.naming(),
            eligibility: self.eligibility.clone(),
            dry_run,
        }
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
