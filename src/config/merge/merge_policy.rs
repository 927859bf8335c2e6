//! Merge rules: defaults and override order.
//!
//! Sources are layered lowest to highest: these defaults, the global config file, an
//! explicit `--config` file, then `RECLAIM__*` environment variables.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("storage.hash_algorithm", "blake3")?
        .set_default("restore.verify_blobs", true)?
        .set_default("restore.verify_restored", true)?
        .set_default("recovery.orphan_after_secs", 3600)?
        .set_default("logging.level", "info")?
        .set_default("logging.format", "text")?
        .set_default("logging.output", "file")
}
