//! # Error Types
//!
//! Structured error types for mech_core. Only caller mistakes surface here:
//! "nothing to do" outcomes (a trait already in its default unit, a fibre row
//! missing a field, an empty bundle) are modelled as values, not errors.
//!
//! ## Example
//!
//! ```rust
//! use mech_core::errors::{MechError, MechResult};
//!
//! fn validate_shape(shape: f64) -> MechResult<()> {
//!     if shape <= 0.0 {
//!         return Err(MechError::invalid_input(
//!             "weibullShape",
//!             shape.to_string(),
//!             "Shape must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for mech_core operations
pub type MechResult<T> = Result<T, MechError>;

/// Structured error type for engine operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details", rename_all_fields = "camelCase")]
pub enum MechError {
    /// An input value is invalid (out of range, wrong type, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// A trait type was requested by name but is not configured
    #[error("Unknown trait type: {trait_type}")]
    UnknownTraitType { trait_type: String },

    /// A conversion workflow action is not allowed in the current state
    #[error("Cannot {action} while {from}")]
    InvalidTransition { from: String, action: String },

    /// Calculation could not be carried out
    #[error("Calculation failed: {calculation_type} - {reason}")]
    CalculationFailed {
        calculation_type: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON/CSV serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Settings schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl MechError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        MechError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        MechError::MissingField {
            field: field.into(),
        }
    }

    /// Create an UnknownTraitType error
    pub fn unknown_trait_type(trait_type: impl Into<String>) -> Self {
        MechError::UnknownTraitType {
            trait_type: trait_type.into(),
        }
    }

    /// Create an InvalidTransition error
    pub fn invalid_transition(from: impl Into<String>, action: impl Into<String>) -> Self {
        MechError::InvalidTransition {
            from: from.into(),
            action: action.into(),
        }
    }

    /// Create a CalculationFailed error
    pub fn calculation_failed(calculation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        MechError::CalculationFailed {
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        MechError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        MechError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            MechError::InvalidInput { .. } => "INVALID_INPUT",
            MechError::MissingField { .. } => "MISSING_FIELD",
            MechError::UnknownTraitType { .. } => "UNKNOWN_TRAIT_TYPE",
            MechError::InvalidTransition { .. } => "INVALID_TRANSITION",
            MechError::CalculationFailed { .. } => "CALCULATION_FAILED",
            MechError::FileError { .. } => "FILE_ERROR",
            MechError::SerializationError { .. } => "SERIALIZATION_ERROR",
            MechError::VersionMismatch { .. } => "VERSION_MISMATCH",
            MechError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for MechError {
    fn from(e: serde_json::Error) -> Self {
        MechError::serialization(e.to_string())
    }
}

impl From<csv::Error> for MechError {
    fn from(e: csv::Error) -> Self {
        MechError::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = MechError::invalid_input("hardPoint", "0.1", "hardPoint must exceed yieldPoint");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidInput\""));
        let roundtrip: MechError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_camel_case_details() {
        let error = MechError::unknown_trait_type("wingspan");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("traitType"));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(MechError::missing_field("diameter").error_code(), "MISSING_FIELD");
        assert_eq!(
            MechError::invalid_transition("Idle", "apply").error_code(),
            "INVALID_TRANSITION"
        );
    }

    #[test]
    fn test_display_messages() {
        let error = MechError::invalid_transition("Idle", "apply");
        assert_eq!(error.to_string(), "Cannot apply while Idle");
    }
}
