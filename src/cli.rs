//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the rollback manager.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigCommands, RollbackCommands};
pub use route::RunContext;
