//! attrschema - declarative attribute parsing, casting and validation
//!
//! A schema is declared once, either programmatically or from a JSON spec,
//! and then used to turn loosely-typed input maps into typed output maps.

pub mod cli;
pub mod contract;
pub mod schema;
pub mod value;

pub use value::{Map, Value};
