//! Error types for the model layer

use thiserror::Error;

/// Result type alias for model-layer operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by schema declaration and registry lookups
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Schema or relation metadata is invalid or missing; a deployment
    /// defect, not a runtime condition
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Model name not present in the registry
    #[error("Unknown model '{0}'")]
    UnknownModel(String),
}
