//! Rule capabilities for enumeration, pattern and predicate checks
//!
//! Each rule is a small trait so that closures and concrete adapters can be
//! plugged in interchangeably.

use std::fmt;
use std::ops::RangeInclusive;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::value::Value;

/// Closed-set membership test
pub trait Membership: Send + Sync {
    fn contains(&self, value: &Value) -> bool;

    /// Describes the allowed set for error messages
    fn describe(&self) -> String;
}

/// String pattern matcher, applied to a value's string form
pub trait Pattern: Send + Sync {
    fn is_match(&self, text: &str) -> bool;

    fn describe(&self) -> String;
}

/// Custom boolean test over a value
pub trait Predicate: Send + Sync {
    fn test(&self, value: &Value) -> bool;
}

/// Enumeration backed by an explicit list of allowed values
#[derive(Debug, Clone, PartialEq)]
pub struct AnyOf(Vec<Value>);

impl AnyOf {
    pub fn new(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Self(values.into_iter().map(Into::into).collect())
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Membership for AnyOf {
    fn contains(&self, value: &Value) -> bool {
        self.0.iter().any(|allowed| same_value(allowed, value))
    }

    fn describe(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Equality for membership checks: numbers compare by magnitude across
/// integer, float and decimal, everything else structurally.
fn same_value(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(i), Value::Float(x)) | (Value::Float(x), Value::Integer(i)) => {
            *i as f64 == *x
        }
        (Value::Integer(i), Value::Decimal(d)) | (Value::Decimal(d), Value::Integer(i)) => {
            Decimal::from(*i) == *d
        }
        (Value::Float(x), Value::Decimal(d)) | (Value::Decimal(d), Value::Float(x)) => {
            d.to_f64().map_or(false, |f| f == *x)
        }
        _ => a == b,
    }
}

impl Membership for RangeInclusive<i64> {
    fn contains(&self, value: &Value) -> bool {
        value
            .as_i64()
            .map_or(false, |i| RangeInclusive::contains(self, &i))
    }

    fn describe(&self) -> String {
        format!("{}..={}", self.start(), self.end())
    }
}

/// Membership test defined by a closure
pub struct MembershipFn<F> {
    test: F,
    description: String,
}

impl<F> MembershipFn<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    pub fn new(description: impl Into<String>, test: F) -> Self {
        Self {
            test,
            description: description.into(),
        }
    }
}

impl<F> Membership for MembershipFn<F>
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn contains(&self, value: &Value) -> bool {
        (self.test)(value)
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

impl<F> fmt::Debug for MembershipFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipFn")
            .field("description", &self.description)
            .finish()
    }
}

impl Pattern for Regex {
    fn is_match(&self, text: &str) -> bool {
        Regex::is_match(self, text)
    }

    fn describe(&self) -> String {
        format!("/{}/", self.as_str())
    }
}

impl<F> Predicate for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn test(&self, value: &Value) -> bool {
        self(value)
    }
}
