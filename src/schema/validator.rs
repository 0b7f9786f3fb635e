//! Validation pipeline
//!
//! Rules run in a fixed order against the post-cast value:
//! 1. Required
//! 2. Type
//! 3. Enumeration
//! 4. Pattern
//! 5. Predicate
//!
//! The first failing rule determines the error. An optional attribute with
//! no value passes trivially.

use super::attribute::AttributeSpec;
use super::errors::{AttributeError, ParseResult};
use crate::value::Value;

/// Runs every rule declared on `attribute` against `value`.
///
/// `Value::Null` stands for an absent value.
pub fn validate(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    validate_required(attribute, value)?;
    if value.is_null() {
        return Ok(());
    }

    validate_type(attribute, value)?;
    validate_any_of(attribute, value)?;
    validate_match(attribute, value)?;
    validate_assurance(attribute, value)?;

    Ok(())
}

/// Returns whether `value` passes every rule of `attribute`.
pub fn is_valid(attribute: &AttributeSpec, value: &Value) -> bool {
    validate(attribute, value).is_ok()
}

fn validate_required(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    if attribute.is_required() && value.is_null() {
        return Err(AttributeError::missing_required(attribute.display_name()));
    }
    Ok(())
}

fn validate_type(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    match attribute.value_type() {
        Some(expected) if !expected.matches(value) => Err(AttributeError::type_mismatched(
            attribute.display_name(),
            format!("MUST be an instance of {}, got {}", expected, value.type_name()),
        )),
        _ => Ok(()),
    }
}

fn validate_any_of(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    match attribute.enumeration() {
        Some(allowed) if !allowed.contains(value) => Err(AttributeError::invalid_value(
            attribute.display_name(),
            format!("{} is NOT one of {}", value.literal(), allowed.describe()),
        )),
        _ => Ok(()),
    }
}

fn validate_match(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    match attribute.pattern() {
        Some(pattern) if !pattern.is_match(&value.to_string()) => {
            Err(AttributeError::invalid_value(
                attribute.display_name(),
                format!("{} does NOT match {}", value.literal(), pattern.describe()),
            ))
        }
        _ => Ok(()),
    }
}

fn validate_assurance(attribute: &AttributeSpec, value: &Value) -> ParseResult<()> {
    match attribute.predicate() {
        Some(predicate) if !predicate.test(value) => Err(AttributeError::invalid_value(
            attribute.display_name(),
            format!("{} does NOT meet the assurance.", value.literal()),
        )),
        _ => Ok(()),
    }
}
