//! CLI command-name contract for logging and routing.

use crate::cli::parse::{Commands, ConfigCommands, RollbackCommands};

/// Command name string for log fields (e.g. "rollback.list", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Rollback { command } => format!("rollback.{}", rollback_command_name(command)),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

pub fn rollback_command_name(command: &RollbackCommands) -> &'static str {
    match command {
        RollbackCommands::List { .. } => "list",
        RollbackCommands::Create { .. } => "create",
        RollbackCommands::Restore { .. } => "restore",
        RollbackCommands::Delete { .. } => "delete",
        RollbackCommands::Undo { .. } => "undo",
        RollbackCommands::Show { .. } => "show",
        RollbackCommands::Verify { .. } => "verify",
        RollbackCommands::Pending { .. } => "pending",
    }
}

pub fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
    }
}
