//! Schema loading and validation errors

use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors raised while loading a schema or writing a record against it.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to read the schema file.
    #[error("failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the schema JSON.
    #[error("failed to parse schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The schema document does not have the expected layout.
    #[error("malformed schema: {0}")]
    Malformed(String),

    /// A class name the schema does not declare.
    #[error("unknown class '{0}'")]
    UnknownClass(String),

    /// A field the class does not declare.
    #[error("{class} has no field '{field}'")]
    UnknownField { class: String, field: String },

    /// A value of the wrong JSON type.
    #[error("{class}.{field}: expected {expected}, found {found}")]
    WrongType {
        class: String,
        field: String,
        expected: String,
        found: String,
    },

    /// A numeric value outside the declared range.
    #[error("{class}.{field}: {value} is outside [{min}, {max}]")]
    OutOfRange {
        class: String,
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    /// A string outside the declared enumeration.
    #[error("{class}.{field}: '{value}' is not one of {allowed:?}")]
    InvalidEnum {
        class: String,
        field: String,
        value: String,
        allowed: Vec<String>,
    },

    /// A nested record of a class outside the expected abstract type.
    #[error("{class}.{field}: '{found}' is not a {expected}")]
    WrongClass {
        class: String,
        field: String,
        expected: String,
        found: String,
    },

    /// A required field left without a value.
    #[error("{class}.{field} is required")]
    MissingField { class: String, field: String },
}
