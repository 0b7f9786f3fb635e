//! Declarative schema specifications
//!
//! A `SchemaSpec` is an ordered mapping from attribute name to its options
//! record. Specs are plain data: they can be read from JSON, layered with
//! `merge`, and then built into an immutable `Schema`.
//!
//! ```json
//! {
//!   "age":    { "type": "integer" },
//!   "status": { "type": "string", "any_of": ["active", "inactive"] },
//!   "email":  { "type": "string", "match": ".+@.+", "required": false }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::attribute::{AttributeBuilder, AttributeSpec};
use super::caster::{FormatOptions, FormatOverrides, ValueType};
use super::errors::{SpecError, SpecResult};
use super::parser::Schema;
use super::rules::AnyOf;
use crate::value::{Map, Value};

/// Options record for one declared attribute.
///
/// Every field is optional so that `merge` can tell an unset option from
/// one explicitly set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDecl {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<serde_json::Value>>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline: Option<bool>,
    #[serde(flatten)]
    pub format: FormatOverrides,
}

impl AttributeDecl {
    /// Declares an attribute of the named type
    pub fn of_type(type_name: impl Into<String>) -> Self {
        Self {
            value_type: Some(type_name.into()),
            ..Default::default()
        }
    }

    /// Declares a composite attribute parsed by a nested spec
    pub fn nested(spec: SchemaSpec) -> Self {
        Self {
            schema: Some(spec),
            ..Default::default()
        }
    }

    /// Declares an inline composite attribute
    pub fn inline(spec: SchemaSpec) -> Self {
        Self {
            schema: Some(spec),
            inline: Some(true),
            ..Default::default()
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = Some(false);
        self
    }

    pub fn with_default(mut self, value: serde_json::Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_any_of(mut self, values: Vec<serde_json::Value>) -> Self {
        self.any_of = Some(values);
        self
    }

    pub fn with_match(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_bind_to(mut self, key: impl Into<String>) -> Self {
        self.bind_to = Some(key.into());
        self
    }

    pub fn with_map(mut self, table: BTreeMap<String, serde_json::Value>) -> Self {
        self.map = Some(table);
        self
    }

    pub fn with_format(mut self, format: FormatOverrides) -> Self {
        self.format = format;
        self
    }

    /// Layers `other` over `self`. Options set in `other` win; `map` and the
    /// nested `schema` merge recursively.
    pub fn merge(&self, other: &AttributeDecl) -> AttributeDecl {
        AttributeDecl {
            bind_to: other.bind_to.clone().or_else(|| self.bind_to.clone()),
            map: match (&self.map, &other.map) {
                (Some(base), Some(over)) => Some(merge_json_maps(base, over)),
                (base, over) => over.clone().or_else(|| base.clone()),
            },
            value_type: other.value_type.clone().or_else(|| self.value_type.clone()),
            required: other.required.or(self.required),
            default: other.default.clone().or_else(|| self.default.clone()),
            any_of: other.any_of.clone().or_else(|| self.any_of.clone()),
            pattern: other.pattern.clone().or_else(|| self.pattern.clone()),
            schema: match (&self.schema, &other.schema) {
                (Some(base), Some(over)) => Some(base.merge(over)),
                (base, over) => over.clone().or_else(|| base.clone()),
            },
            inline: other.inline.or(self.inline),
            format: self.format.layer(&other.format),
        }
    }

    /// Converts the declaration into an attribute builder.
    ///
    /// `inherited` carries the format overrides of the enclosing attribute;
    /// this declaration's own overrides win.
    pub(crate) fn to_builder(
        &self,
        name: &str,
        inherited: &FormatOverrides,
    ) -> SpecResult<AttributeBuilder> {
        let display_name = name.to_uppercase();
        let format = inherited.layer(&self.format);
        let mut builder = AttributeSpec::builder(name).format(format.clone());

        if let Some(key) = &self.bind_to {
            builder = builder.bind_to(key.clone());
        }
        if let Some(table) = &self.map {
            let table: Map = table
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v)))
                .collect();
            builder = builder.value_map(table);
        }
        if let Some(type_name) = &self.value_type {
            builder = builder.type_name(type_name.clone());
        }
        if let Some(required) = self.required {
            builder = builder.required(required);
        }
        if let Some(default) = &self.default {
            builder = builder.default_value(Value::from(default));
        }
        if let Some(values) = self.any_of.as_ref().filter(|v| !v.is_empty()) {
            let members = cast_members(&display_name, self.value_type.as_deref(), values, &format)?;
            builder = builder.any_of(members);
        }
        if let Some(pattern) = &self.pattern {
            let regex = Regex::new(pattern).map_err(|source| SpecError::InvalidPattern {
                attribute: display_name.clone(),
                source,
            })?;
            builder = builder.pattern(regex);
        }
        if let Some(nested) = &self.schema {
            let schema = Schema::build(nested, &format)?;
            builder = if self.inline.unwrap_or(false) {
                builder.inline_schema(schema)
            } else {
                builder.schema(schema)
            };
        } else if self.inline.unwrap_or(false) {
            return Err(SpecError::InlineWithoutSchema(display_name));
        }

        Ok(builder)
    }
}

/// Casts declared enumeration members through the attribute's caster so
/// they compare equal to cast input values.
fn cast_members(
    display_name: &str,
    type_name: Option<&str>,
    values: &[serde_json::Value],
    format: &FormatOverrides,
) -> SpecResult<AnyOf> {
    let members = values.iter().map(Value::from);
    let value_type = match type_name.map(str::parse::<ValueType>) {
        // unknown type names are reported by the attribute builder
        Some(Ok(value_type)) => value_type,
        _ => return Ok(AnyOf::new(members)),
    };

    let format = FormatOptions::default().apply(format);
    let cast = members
        .map(|member| value_type.cast(member, &format))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| SpecError::InvalidEnumeration {
            attribute: display_name.to_string(),
            reason: e.to_string(),
        })?;
    Ok(AnyOf::new(cast))
}

fn merge_json_maps(
    base: &BTreeMap<String, serde_json::Value>,
    over: &BTreeMap<String, serde_json::Value>,
) -> BTreeMap<String, serde_json::Value> {
    let mut merged = base.clone();
    for (key, value) in over {
        let layered = layer_json(merged.get(key), value);
        merged.insert(key.clone(), layered);
    }
    merged
}

/// Layers `over` onto `base`; objects merge key by key, anything else is
/// replaced.
fn layer_json(base: Option<&serde_json::Value>, over: &serde_json::Value) -> serde_json::Value {
    match (base, over) {
        (Some(serde_json::Value::Object(a)), serde_json::Value::Object(b)) => {
            let mut merged = a.clone();
            for (key, value) in b {
                let layered = layer_json(merged.get(key), value);
                merged.insert(key.clone(), layered);
            }
            serde_json::Value::Object(merged)
        }
        _ => over.clone(),
    }
}

/// Ordered declarative schema specification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaSpec {
    attributes: Vec<(String, AttributeDecl)>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an attribute declaration
    pub fn with(mut self, name: impl Into<String>, decl: AttributeDecl) -> Self {
        self.attributes.push((name.into(), decl));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, decl: AttributeDecl) {
        self.attributes.push((name.into(), decl));
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, decl)| decl)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeDecl)> {
        self.attributes.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn names(&self) -> Vec<&str> {
        self.attributes.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns a new spec with `other` layered over `self`.
    ///
    /// Attributes present in both are merged option by option with `other`
    /// winning; attributes only in `other` are appended in its order.
    /// Neither operand is modified.
    pub fn merge(&self, other: &SchemaSpec) -> SchemaSpec {
        let mut merged = self.clone();
        for (name, decl) in &other.attributes {
            match merged.attributes.iter_mut().find(|(n, _)| n == name) {
                Some((_, existing)) => *existing = existing.merge(decl),
                None => merged.attributes.push((name.clone(), decl.clone())),
            }
        }
        merged
    }

    /// Parses a spec from a JSON object, keeping declaration order.
    pub fn from_json_str(json: &str) -> SpecResult<Self> {
        serde_json::from_str(json).map_err(|e| SpecError::malformed("<json>", e.to_string()))
    }

    /// Builds the immutable schema with default formatting.
    pub fn build(&self) -> SpecResult<Schema> {
        Schema::build(self, &FormatOverrides::default())
    }
}

impl FromIterator<(String, AttributeDecl)> for SchemaSpec {
    fn from_iter<I: IntoIterator<Item = (String, AttributeDecl)>>(iter: I) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

impl Serialize for SchemaSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len()))?;
        for (name, decl) in &self.attributes {
            map.serialize_entry(name, decl)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SchemaSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpecVisitor;

        impl<'de> Visitor<'de> for SpecVisitor {
            type Value = SchemaSpec;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from attribute name to attribute options")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SchemaSpec, A::Error> {
                let mut attributes = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, decl)) = access.next_entry::<String, AttributeDecl>()? {
                    attributes.push((name, decl));
                }
                Ok(SchemaSpec { attributes })
            }
        }

        deserializer.deserialize_map(SpecVisitor)
    }
}
