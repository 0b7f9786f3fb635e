//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero exit.

use std::fmt;
use std::io;

use crate::schema::{AttributeError, SpecError};

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Options file error
    ConfigError,
    /// I/O error (files, stdin/stdout)
    IoError,
    /// Spec failed to load or build
    SpecError,
    /// Parse failed with `--raise`
    ParseFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "ATTR_CLI_CONFIG_ERROR",
            Self::IoError => "ATTR_CLI_IO_ERROR",
            Self::SpecError => "ATTR_CLI_SPEC_ERROR",
            Self::ParseFailed => "ATTR_CLI_PARSE_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn spec_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::SpecError, msg)
    }

    pub fn parse_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ParseFailed, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<SpecError> for CliError {
    fn from(e: SpecError) -> Self {
        Self::spec_error(e.to_string())
    }
}

impl From<AttributeError> for CliError {
    fn from(e: AttributeError) -> Self {
        Self::parse_failed(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
