//! Configuration System
//!
//! Layered configuration for the rollback core: built-in defaults, the global config file,
//! an optional explicit file and `RECLAIM__*` environment overrides, merged with the
//! `config` crate and deserialized into [`RollbackConfig`].

use crate::content::HashAlgorithm;
use crate::error::RollbackError;
use crate::logging::LoggingConfig;
use crate::snapshot::RestorePolicy;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::environment::ENV_PREFIX;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollbackConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub restore: RestoreConfig,

    #[serde(default)]
    pub recovery: RecoveryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where rollback state lives and how blobs are addressed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for blobs, snapshots, the ledger and the lock file;
    /// defaults to the platform data directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,

    #[serde(default)]
    pub hash_algorithm: HashAlgorithm,
}

impl StorageConfig {
    /// Effective base directory: `override_dir`, then `base_dir`, then the platform default
    pub fn resolve_base_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf, RollbackError> {
        if let Some(dir) = override_dir.or(self.base_dir.as_deref()) {
            return Ok(dir.to_path_buf());
        }
        default_base_dir().ok_or_else(|| {
            RollbackError::Config(
                "Cannot determine a data directory; set storage.base_dir or --base-dir".to_string(),
            )
        })
    }
}

/// Platform data directory for rollback state, e.g. `~/.local/share/reclaim/rollback`
pub fn default_base_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "reclaim").map(|dirs| dirs.data_dir().join("rollback"))
}

/// Integrity checks during restore
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreConfig {
    #[serde(default = "default_true")]
    pub verify_blobs: bool,

    #[serde(default = "default_true")]
    pub verify_restored: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            verify_blobs: true,
            verify_restored: true,
        }
    }
}

impl RestoreConfig {
    pub fn policy(&self) -> RestorePolicy {
        RestorePolicy {
            verify_blobs: self.verify_blobs,
            verify_restored: self.verify_restored,
        }
    }
}

/// Orphaned-transaction reporting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// A PENDING transaction older than this is reported as orphaned
    #[serde(default = "default_orphan_after_secs")]
    pub orphan_after_secs: u64,
}

fn default_orphan_after_secs() -> u64 {
    3600
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            orphan_after_secs: default_orphan_after_secs(),
        }
    }
}

impl RecoveryConfig {
    pub fn orphan_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.orphan_after_secs.min(u64::from(u32::MAX)) as i64)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Storage(String),
    Recovery(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Recovery(msg) => write!(f, "Recovery: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl RollbackConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(base_dir) = &self.storage.base_dir {
            if base_dir.as_os_str().is_empty() {
                errors.push(ValidationError::Storage(
                    "base_dir cannot be empty".to_string(),
                ));
            }
        }

        if self.recovery.orphan_after_secs == 0 {
            errors.push(ValidationError::Recovery(
                "orphan_after_secs must be greater than zero".to_string(),
            ));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate, folding every problem into one `RollbackError::Config`
    pub fn validated(self) -> Result<Self, RollbackError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            RollbackError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(self)
    }

    /// Effective configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, RollbackError> {
        toml::to_string_pretty(self)
            .map_err(|e| RollbackError::Config(format!("Failed to render configuration: {}", e)))
    }
}
