//! CLI subcommand implementations for the lotmap binary.

pub mod output;
pub mod progress;
pub mod regions_cmd;
pub mod run_cmd;
