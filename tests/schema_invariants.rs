//! Schema Invariant Tests
//!
//! Tests for parse invariants:
//! - Missing required attributes are reported by display name
//! - Rule order is fixed: required, type, enumeration, pattern, predicate
//! - Invalid defaults never produce a usable schema
//! - Casting a value that already matches its type is a no-op
//! - Reporting and raising modes carry the same error
//! - One schema serves concurrent parses without shared state

use attrschema::schema::{
    AnyOf, AttributeDecl, AttributeErrorKind, AttributeSpec, ConversionOptions, FormatOptions,
    Schema, SchemaSpec, SpecError, ValueType,
};
use attrschema::{Map, Value};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::thread;

// =============================================================================
// Helper Functions
// =============================================================================

fn input(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn age_schema() -> Schema {
    SchemaSpec::new()
        .with("age", AttributeDecl::of_type("integer"))
        .build()
        .unwrap()
}

fn person_schema() -> Schema {
    SchemaSpec::from_json_str(
        r#"{
            "name":    { "type": "string" },
            "status":  { "type": "string", "any_of": ["active", "inactive"] },
            "email":   { "type": "string", "match": ".+@.+", "required": false },
            "address": {
                "required": false,
                "schema": {
                    "street": { "type": "string" },
                    "city":   { "type": "string" }
                }
            }
        }"#,
    )
    .unwrap()
    .build()
    .unwrap()
}

// =============================================================================
// Required Attribute Tests
// =============================================================================

#[test]
fn test_missing_required_is_reported() {
    let outcome = age_schema()
        .parse(&input(json!({})), &ConversionOptions::reporting())
        .unwrap();

    assert!(outcome.data.is_none());
    let error = outcome.error.unwrap();
    assert_eq!(error.kind(), AttributeErrorKind::MissingRequiredAttribute);
    assert_eq!(error.attribute(), "AGE");
    assert_eq!(error.to_string(), "Missing required attribute AGE");
}

#[test]
fn test_string_input_is_cast() {
    let outcome = age_schema()
        .parse(&input(json!({"age": "42"})), &ConversionOptions::reporting())
        .unwrap();

    assert!(outcome.error.is_none());
    let mut expected = Map::new();
    expected.insert("age".into(), Value::Integer(42));
    assert_eq!(outcome.data, Some(expected));
}

#[test]
fn test_null_counts_as_absent() {
    let err = age_schema()
        .try_parse(&input(json!({"age": null})), &ConversionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), AttributeErrorKind::MissingRequiredAttribute);
}

// =============================================================================
// Rule Order Tests
// =============================================================================

#[test]
fn test_enumeration_failure_names_allowed_set() {
    let err = person_schema()
        .try_parse(
            &input(json!({"name": "Ann", "status": "pending"})),
            &ConversionOptions::default(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), AttributeErrorKind::InvalidAttributeValue);
    assert_eq!(err.attribute(), "STATUS");
    assert!(err.reason().contains("active, inactive"));
}

#[test]
fn test_pattern_failure() {
    let err = person_schema()
        .try_parse(
            &input(json!({"name": "Ann", "status": "active", "email": "foo"})),
            &ConversionOptions::default(),
        )
        .unwrap_err();

    assert_eq!(err.kind(), AttributeErrorKind::InvalidAttributeValue);
    assert_eq!(err.attribute(), "EMAIL");
    assert!(err.reason().contains("does NOT match"));
}

/// A wrong-typed value outside the enumeration reports the type failure.
#[test]
fn test_type_checked_before_enumeration() {
    let attr = AttributeSpec::builder("level")
        .value_type(ValueType::Integer)
        .any_of(AnyOf::new([1i64, 2, 3]))
        .build()
        .unwrap();

    let err = attr.validate(&Value::from("high")).unwrap_err();
    assert_eq!(err.kind(), AttributeErrorKind::TypeMismatched);
}

#[test]
fn test_predicate_after_pattern() {
    let attr = AttributeSpec::builder("code")
        .value_type(ValueType::String)
        .pattern(regex::Regex::new(r"^[A-Z]+$").unwrap())
        .assure(|v: &Value| v.as_str().map_or(false, |s| s.len() == 3))
        .build()
        .unwrap();

    let err = attr.validate(&Value::from("abcd")).unwrap_err();
    assert!(err.reason().contains("does NOT match"));

    let err = attr.validate(&Value::from("ABCD")).unwrap_err();
    assert!(err.reason().contains("assurance"));

    assert!(attr.validate(&Value::from("ABC")).is_ok());
}

// =============================================================================
// Nested Schema Tests
// =============================================================================

#[test]
fn test_optional_nested_absent_passes() {
    let data = person_schema()
        .try_parse(
            &input(json!({"name": "Ann", "status": "active"})),
            &ConversionOptions::default(),
        )
        .unwrap();
    assert_eq!(data.get("address"), Some(&Value::Null));
}

#[test]
fn test_nested_required_reported_by_inner_name() {
    let err = person_schema()
        .try_parse(
            &input(json!({"name": "Ann", "status": "active", "address": {"city": "X"}})),
            &ConversionOptions::default(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), AttributeErrorKind::MissingRequiredAttribute);
    assert_eq!(err.attribute(), "STREET");
}

#[test]
fn test_inline_attribute_consumes_whole_object() {
    let spec = SchemaSpec::new()
        .with("id", AttributeDecl::of_type("integer"))
        .with(
            "period",
            AttributeDecl::inline(
                SchemaSpec::new()
                    .with("from", AttributeDecl::of_type("date"))
                    .with("to", AttributeDecl::of_type("date")),
            ),
        );

    let data = spec
        .build()
        .unwrap()
        .try_parse(
            &input(json!({"id": "1", "from": "2024-01-01", "to": "2024-02-01"})),
            &ConversionOptions::default(),
        )
        .unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data.get("from").unwrap().type_name(), "date");
    assert!(data.get("period").is_none());
}

/// A composite default is emitted as declared, even with renamed keys.
#[test]
fn test_nested_default_survives_bind_to() {
    let schema = SchemaSpec::from_json_str(
        r#"{
            "address": {
                "schema": { "street": { "type": "string", "bind_to": "st" } },
                "default": { "street": "Main" }
            }
        }"#,
    )
    .unwrap()
    .build()
    .unwrap();

    let data = schema
        .try_parse(&input(json!({})), &ConversionOptions::default())
        .unwrap();
    let address = data.get("address").unwrap().as_object().unwrap();
    assert_eq!(address.get("st"), Some(&Value::from("Main")));
    assert!(address.get("street").is_none());
}

#[test]
fn test_inline_default_with_value_map() {
    let schema = SchemaSpec::from_json_str(
        r#"{
            "flags": {
                "inline": true,
                "schema": {
                    "active": { "type": "bool", "map": { "true": "Y", "false": "N" } }
                },
                "default": { "active": true }
            }
        }"#,
    )
    .unwrap()
    .build()
    .unwrap();

    for _ in 0..3 {
        let data = schema
            .try_parse(&input(json!({})), &ConversionOptions::default())
            .unwrap();
        assert_eq!(data.get("active"), Some(&Value::from("Y")));
    }

    let data = schema
        .try_parse(&input(json!({"active": "false"})), &ConversionOptions::default())
        .unwrap();
    assert_eq!(data.get("active"), Some(&Value::from("N")));
}

/// Programmatic nesting inherits the parent's formatting like declarative nesting.
#[test]
fn test_builder_nested_schema_uses_parent_format() {
    let window = Schema::builder()
        .attribute(
            AttributeSpec::builder("from")
                .value_type(ValueType::Date)
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();
    let schema = Schema::builder()
        .attribute(
            AttributeSpec::builder("window")
                .schema(window)
                .format(attrschema::schema::FormatOverrides {
                    date_format: Some("%Y%m%d".into()),
                    ..Default::default()
                })
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let data = schema
        .try_parse(
            &input(json!({"window": {"from": "20240309"}})),
            &ConversionOptions::default(),
        )
        .unwrap();
    let window = data.get("window").unwrap().as_object().unwrap();
    assert_eq!(
        window.get("from"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()))
    );
}

#[test]
fn test_untyped_enumeration_matches_numerically() {
    let schema = SchemaSpec::new()
        .with("level", AttributeDecl::default().with_any_of(vec![json!(1), json!(2)]))
        .build()
        .unwrap();

    assert!(schema
        .try_parse(&input(json!({"level": 1.0})), &ConversionOptions::default())
        .is_ok());
    let err = schema
        .try_parse(&input(json!({"level": 1.5})), &ConversionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), AttributeErrorKind::InvalidAttributeValue);
}

/// Output keys come out sorted, independent of declaration order.
#[test]
fn test_output_key_order_is_sorted() {
    let schema = SchemaSpec::new()
        .with("zeta", AttributeDecl::of_type("integer"))
        .with("alpha", AttributeDecl::of_type("integer"))
        .build()
        .unwrap();

    let data = schema
        .try_parse(&input(json!({"zeta": 1, "alpha": 2})), &ConversionOptions::default())
        .unwrap();
    let keys: Vec<&str> = data.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["alpha", "zeta"]);
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_invalid_default_fails_construction() {
    let result = SchemaSpec::new()
        .with(
            "status",
            AttributeDecl::of_type("string")
                .with_any_of(vec![json!("active"), json!("inactive")])
                .with_default(json!("archived")),
        )
        .build();

    assert!(matches!(result, Err(SpecError::InvalidDefault { .. })));
}

#[test]
fn test_unknown_type_fails_construction() {
    let result = SchemaSpec::new()
        .with("id", AttributeDecl::of_type("uuid"))
        .build();
    assert!(matches!(result, Err(SpecError::UnknownType { .. })));
}

#[test]
fn test_merge_layers_route_over_base() {
    let base = SchemaSpec::new()
        .with("page", AttributeDecl::of_type("integer").with_default(json!(1)))
        .with("limit", AttributeDecl::of_type("integer").with_default(json!(20)));
    let route = SchemaSpec::new()
        .with("limit", AttributeDecl::default().with_default(json!(50)))
        .with("query", AttributeDecl::of_type("string"));

    let merged = base.merge(&route);
    assert_eq!(merged.names(), vec!["page", "limit", "query"]);

    let data = merged
        .build()
        .unwrap()
        .try_parse(&input(json!({"query": "rust"})), &ConversionOptions::default())
        .unwrap();
    assert_eq!(data.get("limit"), Some(&Value::Integer(50)));
    assert_eq!(data.get("page"), Some(&Value::Integer(1)));

    // operands untouched
    assert_eq!(base.len(), 2);
    assert_eq!(route.len(), 2);
}

// =============================================================================
// Casting Properties
// =============================================================================

#[test]
fn test_cast_is_idempotent_on_matching_values() {
    let format = FormatOptions::default();
    let samples = [
        (ValueType::Integer, Value::Integer(-7)),
        (ValueType::String, Value::from("x")),
        (ValueType::Float, Value::Float(1.5)),
        (ValueType::Bool, Value::Bool(false)),
        (ValueType::Symbol, Value::Symbol("on".into())),
        (ValueType::Decimal, Value::Decimal(Decimal::new(12345, 3))),
        (
            ValueType::Date,
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
        ),
        (
            ValueType::DateTime,
            Value::DateTime(
                NaiveDate::from_ymd_opt(2024, 2, 29)
                    .unwrap()
                    .and_hms_milli_opt(23, 59, 58, 123)
                    .unwrap(),
            ),
        ),
        (
            ValueType::Time,
            Value::Time(Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap()),
        ),
    ];

    for (value_type, value) in samples {
        assert!(value_type.matches(&value));
        assert_eq!(value_type.cast(value.clone(), &format).unwrap(), value);
    }
}

#[test]
fn test_serialize_round_trip() {
    let attr = AttributeSpec::builder("count")
        .value_type(ValueType::Integer)
        .build()
        .unwrap();

    let raw = Value::Integer(9);
    let cast = attr.cast(raw.clone(), &ConversionOptions::default()).unwrap();
    let out = attr.serialize(cast);
    assert_eq!(out.get("count"), Some(&raw));
}

#[test]
fn test_cast_failure_is_typed() {
    let err = age_schema()
        .try_parse(&input(json!({"age": "forty"})), &ConversionOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), AttributeErrorKind::TypeCastingError);
    assert!(err.to_string().starts_with("Failed to cast attribute AGE"));
}

// =============================================================================
// Propagation Mode Tests
// =============================================================================

#[test]
fn test_reporting_and_raising_carry_same_error() {
    let schema = age_schema();
    let bad = input(json!({"age": "forty"}));

    let reported = schema
        .parse(&bad, &ConversionOptions::reporting())
        .unwrap()
        .error
        .unwrap();
    let raised = schema.parse(&bad, &ConversionOptions::raising()).unwrap_err();

    assert_eq!(reported, raised);
}

// =============================================================================
// Sharing Tests
// =============================================================================

/// One schema parses concurrently; each call gets its own output.
#[test]
fn test_concurrent_parses_are_independent() {
    let schema = age_schema();

    thread::scope(|s| {
        let handles: Vec<_> = (0..8i64)
            .map(|i| {
                let schema = &schema;
                s.spawn(move || {
                    let data = schema
                        .try_parse(
                            &input(json!({"age": i.to_string()})),
                            &ConversionOptions::default(),
                        )
                        .unwrap();
                    assert_eq!(data.get("age"), Some(&Value::Integer(i)));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    });
}
