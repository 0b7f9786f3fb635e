//! Attribute specifications
//!
//! An `AttributeSpec` is the immutable blueprint of one named field. It is
//! checked once at construction and then shared by every parse call; parse
//! results live in call-local storage and are never written back.

use std::fmt;
use std::sync::Arc;

use super::caster::{FormatOptions, FormatOverrides, ValueType};
use super::errors::{AttributeError, ParseResult, SpecError, SpecResult};
use super::parser::{ConversionOptions, Schema};
use super::rules::{Membership, Pattern, Predicate};
use super::validator;
use crate::value::{Map, Value};

/// Post-cast transform applied before validation
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Immutable blueprint for a single attribute
#[derive(Clone)]
pub struct AttributeSpec {
    name: String,
    display_name: String,
    bind_to: Option<String>,
    /// Output translation table, keyed by the value's string form
    value_map: Option<Map>,
    value_type: Option<ValueType>,
    required: bool,
    default: Option<Value>,
    enumeration: Option<Arc<dyn Membership>>,
    pattern: Option<Arc<dyn Pattern>>,
    predicate: Option<Arc<dyn Predicate>>,
    schema: Option<Arc<Schema>>,
    inline: bool,
    format: FormatOverrides,
    transform: Option<Transform>,
}

impl AttributeSpec {
    /// Starts building an attribute. Attributes are required by default.
    pub fn builder(name: impl Into<String>) -> AttributeBuilder {
        AttributeBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uppercase name used in error messages
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn bind_to(&self) -> Option<&str> {
        self.bind_to.as_deref()
    }

    /// Key under which the value is serialized
    pub fn output_key(&self) -> &str {
        self.bind_to.as_deref().unwrap_or(&self.name)
    }

    pub fn value_map(&self) -> Option<&Map> {
        self.value_map.as_ref()
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type
    }

    pub fn is_typed(&self) -> bool {
        self.value_type.is_some()
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        !self.required
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn enumeration(&self) -> Option<&dyn Membership> {
        self.enumeration.as_deref()
    }

    pub fn pattern(&self) -> Option<&dyn Pattern> {
        self.pattern.as_deref()
    }

    pub fn predicate(&self) -> Option<&dyn Predicate> {
        self.predicate.as_deref()
    }

    pub fn nested_schema(&self) -> Option<&Schema> {
        self.schema.as_deref()
    }

    pub fn has_schema(&self) -> bool {
        self.schema.is_some()
    }

    /// Inline attributes consume and emit the entire enclosing object
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    pub fn format_overrides(&self) -> &FormatOverrides {
        &self.format
    }

    /// Formatting options in effect for a parse call: attribute overrides
    /// win over call-level options, which win over the defaults.
    pub fn effective_format(&self, options: &ConversionOptions) -> FormatOptions {
        FormatOptions::default()
            .apply(&options.format)
            .apply(&self.format)
    }

    /// Extracts the raw value for this attribute from an input object.
    ///
    /// Looks up the structured key (`:name`) first, then the textual key.
    /// Inline attributes assemble a sub-object from every nested attribute
    /// key present in `input`, yielding nothing when all are absent.
    pub fn extract(&self, input: &Map) -> Option<Value> {
        if !self.inline {
            return lookup(input, &self.name).cloned();
        }

        let schema = self.schema.as_ref()?;
        let sub: Map = schema
            .attributes()
            .iter()
            .filter_map(|attr| {
                lookup(input, attr.name()).map(|v| (attr.name().to_string(), v.clone()))
            })
            .collect();

        if sub.is_empty() {
            None
        } else {
            Some(Value::Object(sub))
        }
    }

    /// Substitutes the default when no value was extracted.
    ///
    /// The default is stored already cast, so it never goes through the
    /// caster or a nested parse again.
    pub fn resolve_default(&self, raw: Option<Value>) -> Value {
        raw.or_else(|| self.default.clone()).unwrap_or(Value::Null)
    }

    /// Casts a value, then applies the transform.
    ///
    /// Absent values and untyped attributes pass through the caster
    /// unchanged; attributes with a nested schema delegate to its parse.
    pub fn cast(&self, value: Value, options: &ConversionOptions) -> ParseResult<Value> {
        let value = self.coerce(value, options)?;
        Ok(self.apply_transform(value))
    }

    fn apply_transform(&self, value: Value) -> Value {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }

    fn coerce(&self, value: Value, options: &ConversionOptions) -> ParseResult<Value> {
        if value.is_null() {
            return Ok(value);
        }

        if let Some(schema) = &self.schema {
            let object = match value {
                Value::Object(object) => object,
                other => {
                    return Err(AttributeError::casting_failed(
                        &self.display_name,
                        format!("expected an object, got {}", other.type_name()),
                    ))
                }
            };
            // the parent's formatting flows into the nested attributes
            let nested = ConversionOptions {
                format: options.format.layer(&self.format),
                ..options.clone()
            };
            return schema.parse_object(&object, &nested).map(Value::Object);
        }

        match self.value_type {
            Some(value_type) => value_type
                .cast(value, &self.effective_format(options))
                .map_err(|e| AttributeError::casting_failed(&self.display_name, e.to_string())),
            None => Ok(value),
        }
    }

    /// Runs the validation pipeline against a post-cast value.
    pub fn validate(&self, value: &Value) -> ParseResult<()> {
        validator::validate(self, value)
    }

    /// Serializes a validated value into its output fragment.
    ///
    /// Inline attributes emit the nested schema's output directly.
    pub fn serialize(&self, value: Value) -> Map {
        if self.inline {
            return match value {
                Value::Object(object) => object,
                _ => Map::new(),
            };
        }

        let mut out = Map::new();
        out.insert(self.output_key().to_string(), self.map_value(value));
        out
    }

    fn map_value(&self, value: Value) -> Value {
        match &self.value_map {
            Some(table) if !value.is_null() => {
                table.get(&value.to_string()).cloned().unwrap_or(Value::Null)
            }
            _ => value,
        }
    }

    /// Runs extract, default substitution, cast, validate and serialize for
    /// one attribute against an input object.
    ///
    /// The stored default was cast when the attribute was built, so only the
    /// transform runs over it here.
    pub fn process(&self, input: &Map, options: &ConversionOptions) -> ParseResult<Map> {
        let value = match self.extract(input) {
            Some(raw) => self.cast(raw, options)?,
            None => self.apply_transform(self.resolve_default(None)),
        };
        self.validate(&value)?;
        Ok(self.serialize(value))
    }
}

fn lookup<'a>(input: &'a Map, key: &str) -> Option<&'a Value> {
    input
        .get(&format!(":{}", key))
        .or_else(|| input.get(key))
        .filter(|v| !v.is_null())
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("name", &self.name)
            .field("bind_to", &self.bind_to)
            .field("value_type", &self.value_type)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("enumeration", &self.enumeration.as_ref().map(|m| m.describe()))
            .field("pattern", &self.pattern.as_ref().map(|p| p.describe()))
            .field("predicate", &self.predicate.is_some())
            .field("schema", &self.schema)
            .field("inline", &self.inline)
            .finish()
    }
}

/// Builder for `AttributeSpec`. All configuration is verified in `build`.
pub struct AttributeBuilder {
    name: String,
    bind_to: Option<String>,
    value_map: Option<Map>,
    type_name: Option<String>,
    required: bool,
    default: Option<Value>,
    enumeration: Option<Arc<dyn Membership>>,
    pattern: Option<Arc<dyn Pattern>>,
    predicate: Option<Arc<dyn Predicate>>,
    schema: Option<Schema>,
    inline: bool,
    format: FormatOverrides,
    transform: Option<Transform>,
}

impl AttributeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bind_to: None,
            value_map: None,
            type_name: None,
            required: true,
            default: None,
            enumeration: None,
            pattern: None,
            predicate: None,
            schema: None,
            inline: false,
            format: FormatOverrides::default(),
            transform: None,
        }
    }

    /// Serializes under `key` instead of the attribute name
    pub fn bind_to(mut self, key: impl Into<String>) -> Self {
        self.bind_to = Some(key.into());
        self
    }

    /// Translates values on output, e.g. `true` to `"Y"`
    pub fn value_map(mut self, table: Map) -> Self {
        self.value_map = Some(table);
        self
    }

    pub fn value_type(mut self, value_type: ValueType) -> Self {
        self.type_name = Some(value_type.name().to_string());
        self
    }

    /// Declares the type by name; unknown names fail in `build`
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = Some(name.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn optional(self) -> Self {
        self.required(false)
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn any_of(mut self, membership: impl Membership + 'static) -> Self {
        self.enumeration = Some(Arc::new(membership));
        self
    }

    pub fn pattern(mut self, pattern: impl Pattern + 'static) -> Self {
        self.pattern = Some(Arc::new(pattern));
        self
    }

    pub fn assure(mut self, predicate: impl Predicate + 'static) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Makes the attribute composite: its value is parsed by `schema`
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self.inline = false;
        self
    }

    /// Like `schema`, but the nested schema covers the enclosing object
    pub fn inline_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self.inline = true;
        self
    }

    pub fn format(mut self, format: FormatOverrides) -> Self {
        self.format = format;
        self
    }

    pub fn transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Verifies the configuration and returns the immutable spec.
    ///
    /// # Errors
    ///
    /// - `ConflictingType` if both a type and a nested schema are declared
    /// - `InlineWithoutSchema` if inline is requested without a schema
    /// - `UnknownType` if no caster is registered for the declared type
    /// - `InvalidDefault` if the default fails casting or validation
    pub fn build(self) -> SpecResult<AttributeSpec> {
        let display_name = self.name.to_uppercase();

        if self.type_name.is_some() && self.schema.is_some() {
            return Err(SpecError::ConflictingType(display_name));
        }
        if self.inline && self.schema.is_none() {
            return Err(SpecError::InlineWithoutSchema(display_name));
        }

        let value_type = match &self.type_name {
            Some(type_name) => Some(type_name.parse::<ValueType>().map_err(|_| {
                SpecError::UnknownType {
                    attribute: display_name.clone(),
                    type_name: type_name.clone(),
                }
            })?),
            None => None,
        };

        let mut spec = AttributeSpec {
            name: self.name,
            display_name,
            bind_to: self.bind_to,
            value_map: self.value_map,
            value_type,
            required: self.required,
            default: None,
            enumeration: self.enumeration,
            pattern: self.pattern,
            predicate: self.predicate,
            schema: self.schema.map(Arc::new),
            inline: self.inline,
            format: self.format,
            transform: self.transform,
        };

        if let Some(default) = self.default {
            spec.default = Some(spec.verify_default(default)?);
        }

        Ok(spec)
    }
}

impl AttributeSpec {
    /// Casts the default with the attribute's own format and runs the full
    /// pipeline over it.
    fn verify_default(&self, default: Value) -> SpecResult<Value> {
        let invalid = |source| SpecError::InvalidDefault {
            attribute: self.display_name.clone(),
            source,
        };

        let options = ConversionOptions::default();
        let value = self.coerce(default, &options).map_err(invalid)?;
        self.validate(&self.apply_transform(value.clone()))
            .map_err(invalid)?;
        Ok(value)
    }
}

impl fmt::Debug for AttributeBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeBuilder")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("required", &self.required)
            .finish()
    }
}
