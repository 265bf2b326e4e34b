//! Input loading errors

use thiserror::Error;

/// Errors that can occur when loading a policy or demographics file.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Failed to read an input file.
    #[error("failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the policy YAML.
    #[error("failed to parse policy YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Failed to parse a JSON input.
    #[error("failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid API version.
    #[error("invalid apiVersion: expected 'coc/v1', got '{0}'")]
    InvalidApiVersion(String),

    /// Invalid kind.
    #[error("invalid kind: expected 'Policy', got '{0}'")]
    InvalidKind(String),

    /// Missing required field.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field is present but out of range.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// The demographics document declares a property without values.
    #[error("invalid demographics: {0}")]
    InvalidDemographics(String),
}

/// Result type for policy and demographics loading.
pub type PolicyResult<T> = Result<T, PolicyError>;
