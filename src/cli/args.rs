//! CLI argument definitions using clap
//!
//! Commands:
//! - attrschema check --spec <path>
//! - attrschema parse --spec <path> [--options <path>] [--input <path>] [--raise]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// attrschema - declarative attribute parsing and validation
#[derive(Parser, Debug)]
#[command(name = "attrschema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a spec file and print its attribute names
    Check {
        /// Path to the JSON spec file
        #[arg(long)]
        spec: PathBuf,
    },

    /// Parse a JSON object against a spec
    Parse {
        /// Path to the JSON spec file
        #[arg(long)]
        spec: PathBuf,

        /// Path to a conversion options file
        #[arg(long)]
        options: Option<PathBuf>,

        /// Read input from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,

        /// Exit non-zero on a parse failure instead of reporting it
        #[arg(long)]
        raise: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
