// Library interface for ensemble-cli, so integration tests can reach the
// argument parser and output formatting.

pub mod app;
pub mod cli;
pub mod commands;

pub use cli::{Cli, Command, RunArgs};
pub use commands::{format_outcome, parse_approval, resolve_run, ResolvedRun};
