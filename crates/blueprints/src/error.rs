//! Error types for blueprint operations
//!
//! The pipeline does not map errors to HTTP statuses itself; it signals the
//! classification through [`ErrorClass`] and leaves the wire mapping to the
//! transport layer.

use thiserror::Error;

use corral_model::{ModelError, RecordId, StoreError, StoreErrorKind};

/// Result type alias for blueprint operations
pub type BlueprintResult<T> = Result<T, BlueprintError>;

/// How a failure should be reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The caller's input is at fault
    BadRequest,
    /// The addressed record does not exist
    NotFound,
    /// Opaque server-side failure
    Internal,
}

/// Errors surfaced by blueprint operations.
///
/// A duplicate link is deliberately absent: the pipeline tolerates it and
/// completes successfully, it never reaches the caller as an error.
#[derive(Error, Debug, Clone)]
pub enum BlueprintError {
    /// Relation alias or schema mapping is missing; a deployment defect
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request named neither an existing child nor field values for a
    /// new one
    #[error(
        "You must specify the record to add (either the primary key of an \
         existing record to link, or a new object without a primary key which \
         will be used to create a record then link it)"
    )]
    MissingChildSpec,

    /// The parent record does not exist
    #[error("No '{model}' record found with id {id}")]
    ParentNotFound { model: String, id: RecordId },

    /// The persistence layer rejected the caller's criteria or payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Opaque persistence or transport failure
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl BlueprintError {
    /// The classification this error signals to the transport layer
    pub fn class(&self) -> ErrorClass {
        match self {
            BlueprintError::Configuration(_) => ErrorClass::Internal,
            BlueprintError::MissingChildSpec => ErrorClass::BadRequest,
            BlueprintError::ParentNotFound { .. } => ErrorClass::NotFound,
            BlueprintError::Validation(_) => ErrorClass::BadRequest,
            BlueprintError::Infrastructure(_) => ErrorClass::Internal,
        }
    }
}

impl From<ModelError> for BlueprintError {
    fn from(err: ModelError) -> Self {
        BlueprintError::Configuration(err.to_string())
    }
}

impl From<StoreError> for BlueprintError {
    fn from(err: StoreError) -> Self {
        match err.kind() {
            StoreErrorKind::Usage => BlueprintError::Validation(err.to_string()),
            _ => BlueprintError::Infrastructure(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(
            BlueprintError::Configuration("x".into()).class(),
            ErrorClass::Internal
        );
        assert_eq!(BlueprintError::MissingChildSpec.class(), ErrorClass::BadRequest);
        assert_eq!(
            BlueprintError::ParentNotFound {
                model: "farm".into(),
                id: RecordId::Int(1)
            }
            .class(),
            ErrorClass::NotFound
        );
        assert_eq!(
            BlueprintError::Validation("x".into()).class(),
            ErrorClass::BadRequest
        );
        assert_eq!(
            BlueprintError::Infrastructure("x".into()).class(),
            ErrorClass::Internal
        );
    }

    #[test]
    fn test_store_errors_map_by_kind() {
        let err: BlueprintError = StoreError::usage("bad criteria").into();
        assert!(matches!(err, BlueprintError::Validation(_)));

        let err: BlueprintError = StoreError::backend("connection reset").into();
        assert!(matches!(err, BlueprintError::Infrastructure(_)));
    }

    #[test]
    fn test_model_errors_are_configuration() {
        let err: BlueprintError = ModelError::UnknownModel("ghost".into()).into();
        assert!(matches!(err, BlueprintError::Configuration(_)));
    }
}
