//! CLI command implementations
//!
//! Commands build their response as a JSON value; `run_command` writes it.
//! With `--raise` a parse failure is returned as a `CliError` instead.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use tracing::info;

use crate::schema::{ConversionOptions, Schema, SpecLoader};
use crate::value::Value;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_input, write_error, write_response};

/// Largest scale `rust_decimal` can represent
const MAX_DECIMAL_PRECISION: u32 = 28;

/// Conversion options file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Options {
    #[serde(flatten)]
    pub conversion: ConversionOptions,
}

impl Options {
    /// Load options from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read options: {}", e)))?;

        let options: Options = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid options JSON: {}", e)))?;

        options.validate()?;

        Ok(options)
    }

    fn validate(&self) -> CliResult<()> {
        let format = &self.conversion.format;

        if let Some(base) = format.integer_base {
            if !(2..=36).contains(&base) {
                return Err(CliError::config_error(format!(
                    "Invalid integer_base: {}. Must be in 2..=36.",
                    base
                )));
            }
        }

        if let Some(precision) = format.decimal_precision {
            if precision > MAX_DECIMAL_PRECISION {
                return Err(CliError::config_error(format!(
                    "Invalid decimal_precision: {}. Must be <= {}.",
                    precision, MAX_DECIMAL_PRECISION
                )));
            }
        }

        Ok(())
    }
}

/// Run the given command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Check { spec } => {
            let names = check(&spec)?;
            write_response(json!(names))
        }
        Command::Parse {
            spec,
            options,
            input,
            raise,
        } => {
            let mut conversion = match options {
                Some(path) => Options::load(&path)?.conversion,
                None => ConversionOptions::default(),
            };
            // the flag alone selects raising; options files only carry formats here
            conversion.raise_on_error = raise;

            let input = read_input(input.as_deref())?;
            let outcome = parse(&spec, &conversion, &input)?;
            match outcome {
                Ok(data) => write_response(data),
                Err(failure) => write_error(&failure.code, &failure.attribute, &failure.message),
            }
        }
    }
}

/// Load and build a spec file, returning its attribute names in order
pub fn check(spec_path: &Path) -> CliResult<Vec<String>> {
    let schema = load_schema(spec_path)?;
    Ok(schema.names().into_iter().map(str::to_string).collect())
}

/// A reported parse failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub code: String,
    pub attribute: String,
    pub message: String,
}

/// Parse `input` against the spec at `spec_path`.
///
/// The outer `Err` covers spec, I/O and raised parse failures; the inner
/// `Err` is a failure captured in reporting mode.
pub fn parse(
    spec_path: &Path,
    options: &ConversionOptions,
    input: &Json,
) -> CliResult<Result<Json, ParseFailure>> {
    let schema = load_schema(spec_path)?;
    let outcome = schema.parse(&Value::from(input), options)?;

    match (outcome.data, outcome.error) {
        (_, Some(error)) => Ok(Err(ParseFailure {
            code: error.code().to_string(),
            attribute: error.attribute().to_string(),
            message: error.to_string(),
        })),
        (data, None) => Ok(Ok(Json::from(Value::Object(data.unwrap_or_default())))),
    }
}

fn load_schema(spec_path: &Path) -> CliResult<Arc<Schema>> {
    let dir = spec_path.parent().unwrap_or_else(|| Path::new("."));
    let mut loader = SpecLoader::new(dir);
    let schema = loader.load_spec_file(spec_path)?;

    info!(spec = %spec_path.display(), attributes = schema.len(), "spec loaded");
    Ok(schema)
}
