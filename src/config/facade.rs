//! Config loading facade: builds the layered source stack and deserializes it.

use super::merge::merge_policy;
use super::sources::{environment, explicit_file, global_file};
use super::RollbackConfig;
use config::ConfigError;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration: defaults, global file, optional explicit file, environment
    pub fn load(config_path: Option<&Path>) -> Result<RollbackConfig, ConfigError> {
        let mut builder = merge_policy::builder_with_defaults()?;
        builder = global_file::add_to_builder(builder)?;
        if let Some(path) = config_path {
            builder = explicit_file::add_to_builder(builder, path)?;
        }
        builder = environment::add_to_builder(builder);

        let config: RollbackConfig = builder.build()?.try_deserialize()?;
        debug!(explicit = ?config_path, "Configuration loaded");
        Ok(config)
    }

    /// Load from a single file on top of the defaults; global file and environment are ignored
    pub fn load_from_file(path: &Path) -> Result<RollbackConfig, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = explicit_file::add_to_builder(builder, path)?;
        builder.build()?.try_deserialize()
    }

    /// Path of the global config file, if a home or XDG config directory is known
    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
