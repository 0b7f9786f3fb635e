//! API contract composition
//!
//! A contract pairs a parameter schema with a result schema. Base and route
//! specs are merged (route wins), the result spec is layered over the
//! default result envelope, and both schemas are built once up front.
//!
//! Parameters and results are always parsed in reporting mode; a captured
//! failure is surfaced as a `ContractError` naming which side failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::schema::{
    AttributeDecl, AttributeError, ConversionOptions, FormatOverrides, Schema, SchemaSpec,
    SpecResult,
};
use crate::value::{Map, Value};

/// Contract-level failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContractError {
    /// Incoming parameters failed the parameter schema
    #[error("invalid request: {0} ({})", .0.kind())]
    InvalidRequest(AttributeError),

    /// Handler output failed the result schema
    #[error("invalid result: {0} ({})", .0.kind())]
    InvalidResult(AttributeError),
}

impl ContractError {
    /// The underlying attribute failure
    pub fn attribute_error(&self) -> &AttributeError {
        match self {
            ContractError::InvalidRequest(e) | ContractError::InvalidResult(e) => e,
        }
    }
}

/// Declarative contract for one route
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractSpec {
    pub parameters: SchemaSpec,
    pub result: SchemaSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversion: Option<ConversionOptions>,
}

impl ContractSpec {
    /// Result envelope every contract starts from
    pub fn default_result() -> SchemaSpec {
        SchemaSpec::new()
            .with("code", AttributeDecl::of_type("string"))
            .with("message", AttributeDecl::of_type("string"))
            .with("data", AttributeDecl::default().optional())
    }
}

/// Built contract: both schemas are immutable and shareable
#[derive(Debug, Clone)]
pub struct ApiContract {
    parameters: Schema,
    result: Schema,
    options: ConversionOptions,
}

impl ApiContract {
    /// Composes `route` over `base` and builds both schemas.
    ///
    /// Conversion options come from the route when it declares them,
    /// otherwise from the base.
    pub fn compose(base: &ContractSpec, route: &ContractSpec) -> SpecResult<Self> {
        let parameters = base.parameters.merge(&route.parameters);
        let result = ContractSpec::default_result()
            .merge(&base.result)
            .merge(&route.result);

        let options = route
            .conversion
            .clone()
            .or_else(|| base.conversion.clone())
            .unwrap_or_default();
        // the contract reports rather than raises; the caller gets ContractError
        let options = ConversionOptions {
            raise_on_error: false,
            ..options
        };

        let none = FormatOverrides::default();
        Ok(Self {
            parameters: Schema::build(&parameters, &none)?,
            result: Schema::build(&result, &none)?,
            options,
        })
    }

    pub fn parameters(&self) -> &Schema {
        &self.parameters
    }

    pub fn result(&self) -> &Schema {
        &self.result
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Converts raw request parameters into typed parameters.
    pub fn convert_params(&self, params: &Value) -> Result<Map, ContractError> {
        self.convert(&self.parameters, params)
            .map_err(ContractError::InvalidRequest)
    }

    /// Converts a handler result into the declared result shape.
    pub fn convert_result(&self, result: &Value) -> Result<Map, ContractError> {
        self.convert(&self.result, result)
            .map_err(ContractError::InvalidResult)
    }

    fn convert(&self, schema: &Schema, input: &Value) -> Result<Map, AttributeError> {
        let outcome = schema.parse(input, &self.options)?;
        if let Some(error) = &outcome.error {
            debug!(code = error.code(), attribute = error.attribute(), "contract conversion failed");
        }
        outcome.into_result()
    }
}
