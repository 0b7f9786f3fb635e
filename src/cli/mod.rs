//! CLI module for attrschema
//!
//! Provides command-line interface for:
//! - check: Build a spec file and list its attributes
//! - parse: Parse one JSON object against a spec

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check, parse, run_command, Options, ParseFailure};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_input, write_error, write_response};

/// Parses process arguments and runs the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
