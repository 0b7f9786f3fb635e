//! Schema error types
//!
//! Two categories:
//! - `AttributeError`: parse-time failures, one of a closed set of kinds,
//!   always naming the attribute's display name
//! - `SpecError`: construction-time configuration errors, raised when an
//!   attribute or schema is built and never deferred to parse time

use std::fmt;

use thiserror::Error;

/// Closed set of parse-time failure kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeErrorKind {
    /// Required attribute has no value and no default
    MissingRequiredAttribute,
    /// Value does not have the declared type after casting
    TypeMismatched,
    /// Enumeration, pattern or predicate rejected the value
    InvalidAttributeValue,
    /// Raw value could not be converted to the declared type
    TypeCastingError,
}

impl AttributeErrorKind {
    /// Returns the stable string code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            AttributeErrorKind::MissingRequiredAttribute => "MISSING_REQUIRED_ATTRIBUTE",
            AttributeErrorKind::TypeMismatched => "TYPE_MISMATCHED",
            AttributeErrorKind::InvalidAttributeValue => "INVALID_ATTRIBUTE_VALUE",
            AttributeErrorKind::TypeCastingError => "TYPE_CASTING_ERROR",
        }
    }
}

impl fmt::Display for AttributeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AttributeErrorKind::MissingRequiredAttribute => "MissingRequiredAttribute",
            AttributeErrorKind::TypeMismatched => "TypeMismatched",
            AttributeErrorKind::InvalidAttributeValue => "InvalidAttributeValue",
            AttributeErrorKind::TypeCastingError => "TypeCastingError",
        };
        f.write_str(name)
    }
}

/// Parse-time error with full context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    kind: AttributeErrorKind,
    /// Display name of the failing attribute (uppercase)
    attribute: String,
    /// Human-readable reason
    reason: String,
}

impl AttributeError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self {
            kind: AttributeErrorKind::MissingRequiredAttribute,
            attribute: attribute.into(),
            reason: "value is required".into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatched(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: AttributeErrorKind::TypeMismatched,
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid value error (enumeration, pattern or predicate)
    pub fn invalid_value(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: AttributeErrorKind::InvalidAttributeValue,
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    /// Create a casting error wrapping a lower-level conversion failure
    pub fn casting_failed(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: AttributeErrorKind::TypeCastingError,
            attribute: attribute.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> AttributeErrorKind {
        self.kind
    }

    /// Returns the string code of the error kind
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Returns the display name of the failing attribute
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AttributeErrorKind::MissingRequiredAttribute => {
                write!(f, "Missing required attribute {}", self.attribute)
            }
            AttributeErrorKind::TypeMismatched => {
                write!(f, "Type MISMATCHED for attribute {}: {}", self.attribute, self.reason)
            }
            AttributeErrorKind::InvalidAttributeValue => {
                write!(f, "Invalid value for attribute {}: {}", self.attribute, self.reason)
            }
            AttributeErrorKind::TypeCastingError => {
                write!(f, "Failed to cast attribute {}: {}", self.attribute, self.reason)
            }
        }
    }
}

impl std::error::Error for AttributeError {}

/// Result type for parse operations
pub type ParseResult<T> = Result<T, AttributeError>;

/// Construction-time configuration errors
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("UNKNOWN type for attribute {attribute}: {type_name}")]
    UnknownType { attribute: String, type_name: String },

    #[error("Invalid default for attribute {attribute}: {source}")]
    InvalidDefault {
        attribute: String,
        #[source]
        source: AttributeError,
    },

    #[error("Matching pattern of attribute {attribute} is invalid: {source}")]
    InvalidPattern {
        attribute: String,
        #[source]
        source: regex::Error,
    },

    #[error("List of values for attribute {attribute} is invalid: {reason}")]
    InvalidEnumeration { attribute: String, reason: String },

    #[error("Attribute {0} is declared more than once")]
    DuplicateAttribute(String),

    #[error("Attribute {0} cannot declare both a type and a nested schema")]
    ConflictingType(String),

    #[error("Inline attribute {0} requires a nested schema")]
    InlineWithoutSchema(String),

    #[error("Malformed schema spec '{origin}': {reason}")]
    Malformed { origin: String, reason: String },

    #[error("Schema '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl SpecError {
    /// Create an error for an unreadable or undecodable spec source
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        SpecError::Malformed {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for construction operations
pub type SpecResult<T> = Result<T, SpecError>;
