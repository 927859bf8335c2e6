//! Integration tests for the reclaim rollback core

mod cli_commands;
mod config_integration;
mod content_addressing;
mod protected_execution;
mod restore_integrity;
mod test_utils;
