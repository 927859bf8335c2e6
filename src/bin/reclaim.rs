//! Reclaim CLI Binary
//!
//! Command-line interface for the reclaim rollback core.

use clap::Parser;
use reclaim::cli::{Cli, RunContext};
use reclaim::config::{ConfigLoader, RollbackConfig};
use reclaim::logging::{init_logging, resolve_log_file_path, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Reclaim CLI starting");

    let context = match RunContext::new(cli.base_dir.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing rollback state: {}", e);
            eprintln!("{}", reclaim::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", reclaim::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = ConfigLoader::load(cli.config.as_deref()).unwrap_or_default();
    let mut config = loaded.logging.clone();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.level = "debug".to_string();
        // An explicit --log-output value still takes precedence below.
        if config.output == "file" {
            config.output = "file+stderr".to_string();
        }
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }

    let output_uses_file = config.output == "file" || config.output == "file+stderr";
    if config.enabled && output_uses_file {
        match resolve_base_dir(&loaded, cli) {
            Some(base_dir) => {
                config.file = Some(resolve_log_file_path(
                    cli.log_file.clone(),
                    config.file.clone(),
                    &base_dir,
                ));
            }
            None => config.file = cli.log_file.clone().or(config.file),
        }
    } else if let Some(ref file) = cli.log_file {
        config.file = Some(file.clone());
    }

    config
}

fn resolve_base_dir(config: &RollbackConfig, cli: &Cli) -> Option<std::path::PathBuf> {
    config.storage.resolve_base_dir(cli.base_dir.as_deref()).ok()
}
