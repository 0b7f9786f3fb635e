//! Schema subsystem for attrschema
//!
//! A schema is an immutable blueprint of attribute specs. Parsing walks the
//! attributes in declaration order and produces a fresh output map per call.
//!
//! # Design Principles
//!
//! - Blueprints are built once and never mutated by a parse
//! - Fixed rule order: required, type, enumeration, pattern, predicate
//! - First failure wins
//! - Casting is idempotent for every supported type
//! - Format precedence: attribute, then call options, then defaults

mod attribute;
mod caster;
mod errors;
mod loader;
mod parser;
mod rules;
mod types;
pub mod validator;

pub use attribute::{AttributeBuilder, AttributeSpec, Transform};
pub use caster::{
    CastFailure, FormatOptions, FormatOverrides, UnknownValueType, ValueType,
    DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_DECIMAL_PRECISION,
    DEFAULT_INTEGER_BASE, DEFAULT_TIME_FORMAT,
};
pub use errors::{AttributeError, AttributeErrorKind, ParseResult, SpecError, SpecResult};
pub use loader::{read_spec, SpecLoader};
pub use parser::{ConversionOptions, ParseOutcome, Schema, SchemaBuilder, ROOT_ATTRIBUTE};
pub use rules::{AnyOf, Membership, MembershipFn, Pattern, Predicate};
pub use types::{AttributeDecl, SchemaSpec};
