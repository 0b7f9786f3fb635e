//! Schema: an ordered collection of attribute specs and the parse entry point
//!
//! Parse semantics:
//! - Attributes run in declaration order
//! - Each runs extract, default, cast, validate, serialize
//! - The first failure stops the parse
//! - `raise_on_error` selects between returning the failure as `Err` and
//!   capturing it in the `ParseOutcome`
//!
//! A `Schema` is never mutated by `parse`: all output lives in the map
//! built for that call, so one schema can serve any number of threads.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::attribute::AttributeSpec;
use super::caster::FormatOverrides;
use super::errors::{AttributeError, ParseResult, SpecError, SpecResult};
use super::types::SchemaSpec;
use crate::value::{Map, Value};

/// Display name reported when the parse input itself is not an object
pub const ROOT_ATTRIBUTE: &str = "$ROOT";

/// Per-call conversion options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionOptions {
    /// Return the first failure as `Err` (true) or capture it in the outcome
    pub raise_on_error: bool,
    /// Call-level formatting, below attribute-declared formatting
    #[serde(flatten)]
    pub format: FormatOverrides,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            raise_on_error: true,
            format: FormatOverrides::default(),
        }
    }
}

impl ConversionOptions {
    /// Options that propagate the first failure
    pub fn raising() -> Self {
        Self::default()
    }

    /// Options that capture the first failure in the outcome
    pub fn reporting() -> Self {
        Self {
            raise_on_error: false,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: FormatOverrides) -> Self {
        self.format = format;
        self
    }
}

/// Result of a parse: exactly one of `data` and `error` is set
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub data: Option<Map>,
    pub error: Option<AttributeError>,
}

impl ParseOutcome {
    fn success(data: Map) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    fn failure(error: AttributeError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Converts the captured outcome back into a `Result`
    pub fn into_result(self) -> ParseResult<Map> {
        match (self.data, self.error) {
            (_, Some(error)) => Err(error),
            (data, None) => Ok(data.unwrap_or_default()),
        }
    }
}

/// Immutable, ordered collection of attribute specs
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: Vec<AttributeSpec>,
}

impl Schema {
    /// Starts a programmatic schema composition
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Builds a schema from a declarative spec.
    ///
    /// `inherited` format overrides apply to every attribute unless the
    /// attribute declares its own.
    ///
    /// # Errors
    ///
    /// Any construction error of an attribute, or `DuplicateAttribute` if a
    /// name is declared twice.
    pub fn build(spec: &SchemaSpec, inherited: &FormatOverrides) -> SpecResult<Self> {
        let mut builder = Schema::builder();
        for (name, decl) in spec.iter() {
            builder = builder.attribute(decl.to_builder(name, inherited)?.build()?);
        }
        builder.build()
    }

    pub fn attributes(&self) -> &[AttributeSpec] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(AttributeSpec::name).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Parses `input` into a typed output map.
    ///
    /// With `raise_on_error` the first failure is returned as `Err`;
    /// otherwise it is returned as `Ok(ParseOutcome { data: None, error })`.
    pub fn parse(&self, input: &Value, options: &ConversionOptions) -> ParseResult<ParseOutcome> {
        debug!(attributes = self.attributes.len(), "parsing input");

        match self.try_parse(input, options) {
            Ok(data) => Ok(ParseOutcome::success(data)),
            Err(error) => {
                debug!(
                    code = error.code(),
                    attribute = error.attribute(),
                    raise = options.raise_on_error,
                    "parse failed"
                );
                if options.raise_on_error {
                    Err(error)
                } else {
                    Ok(ParseOutcome::failure(error))
                }
            }
        }
    }

    /// Parses `input`, always propagating the first failure.
    pub fn try_parse(&self, input: &Value, options: &ConversionOptions) -> ParseResult<Map> {
        let object = input.as_object().ok_or_else(|| {
            AttributeError::casting_failed(
                ROOT_ATTRIBUTE,
                format!("expected an object, got {}", input.type_name()),
            )
        })?;
        self.parse_object(object, options)
    }

    pub(crate) fn parse_object(&self, input: &Map, options: &ConversionOptions) -> ParseResult<Map> {
        let mut output = Map::new();
        for attribute in &self.attributes {
            output.extend(attribute.process(input, options)?);
        }
        Ok(output)
    }
}

/// Programmatic schema composition
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    attributes: Vec<AttributeSpec>,
}

impl SchemaBuilder {
    /// Appends an attribute; declaration order is parse order
    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Finishes the schema, rejecting duplicate attribute names
    pub fn build(self) -> SpecResult<Schema> {
        let mut seen = HashSet::new();
        for attribute in &self.attributes {
            if !seen.insert(attribute.name()) {
                return Err(SpecError::DuplicateAttribute(attribute.display_name().to_string()));
            }
        }
        Ok(Schema {
            attributes: self.attributes,
        })
    }
}
