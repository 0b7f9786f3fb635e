//! Contract Composition Tests
//!
//! - Route specs layer over base specs
//! - Result specs layer over the default result envelope
//! - Failures surface as request or result errors, never as panics

use attrschema::contract::{ApiContract, ContractError, ContractSpec};
use attrschema::schema::{AttributeDecl, AttributeErrorKind, SchemaSpec};
use attrschema::Value;
use serde_json::json;

fn base() -> ContractSpec {
    ContractSpec {
        parameters: SchemaSpec::new()
            .with("page", AttributeDecl::of_type("integer").with_default(json!(1))),
        ..Default::default()
    }
}

#[test]
fn test_compose_from_json() {
    let route: ContractSpec = serde_json::from_value(json!({
        "parameters": {
            "id":   { "type": "integer" },
            "page": { "default": 3 }
        },
        "result": {
            "data": { "type": "string", "required": true }
        }
    }))
    .unwrap();

    let contract = ApiContract::compose(&base(), &route).unwrap();
    assert_eq!(contract.parameters().names(), vec!["page", "id"]);

    let params = contract
        .convert_params(&Value::from(json!({"id": "5"})))
        .unwrap();
    assert_eq!(params.get("page"), Some(&Value::Integer(3)));
    assert_eq!(params.get("id"), Some(&Value::Integer(5)));

    let err = contract
        .convert_result(&Value::from(json!({"code": "OK", "message": "done"})))
        .unwrap_err();
    assert!(matches!(err, ContractError::InvalidResult(_)));
    assert_eq!(err.attribute_error().attribute(), "DATA");
}

#[test]
fn test_invalid_request_message() {
    let route = ContractSpec {
        parameters: SchemaSpec::new().with(
            "sort",
            AttributeDecl::of_type("string").with_any_of(vec![json!("asc"), json!("desc")]),
        ),
        ..Default::default()
    };
    let contract = ApiContract::compose(&base(), &route).unwrap();

    let err = contract
        .convert_params(&Value::from(json!({"sort": "up"})))
        .unwrap_err();
    assert_eq!(
        err.attribute_error().kind(),
        AttributeErrorKind::InvalidAttributeValue
    );
    assert!(err.to_string().starts_with("invalid request: Invalid value for attribute SORT"));
}

#[test]
fn test_bad_route_fails_composition() {
    let route = ContractSpec {
        parameters: SchemaSpec::new().with("id", AttributeDecl::of_type("uuid")),
        ..Default::default()
    };
    assert!(ApiContract::compose(&base(), &route).is_err());
}
