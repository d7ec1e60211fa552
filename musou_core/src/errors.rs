//! # Error Types
//!
//! Structured error types for musou_core.
//!
//! The compliance engine itself never returns an error: missing numbers become
//! zero and missing configuration resolves to a documented fallback profile.
//! Errors only come from the edges of the crate, namely settings validation,
//! room book edits and the record store.
//!
//! ## Example
//!
//! ```rust
//! use musou_core::errors::{CalcError, CalcResult};
//!
//! fn validate_divisor(name: &str, divisor: f64) -> CalcResult<()> {
//!     if !(divisor > 0.0) {
//!         return Err(CalcError::invalid_input(
//!             format!("room_use_divisors.{}", name),
//!             divisor.to_string(),
//!             "Divisor must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! assert!(validate_divisor("住宅の居室", 7.0).is_ok());
//! assert!(validate_divisor("住宅の居室", 0.0).is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for musou_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for settings, room book and storage operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// A settings or input value is out of range
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// No room with the given id exists in the room book
    #[error("Room not found: {room_id}")]
    RoomNotFound { room_id: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// The store is being written by another process
    #[error("Store locked: '{path}' - {reason}")]
    FileLocked { path: String, reason: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Record version is not readable by this build
    #[error("Version mismatch: record version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a RoomNotFound error
    pub fn room_not_found(room_id: impl Into<String>) -> Self {
        CalcError::RoomNotFound {
            room_id: room_id.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError from any displayable cause
    pub fn serialization(reason: impl std::fmt::Display) -> Self {
        CalcError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::RoomNotFound { .. } => "ROOM_NOT_FOUND",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = CalcError::invalid_input("eaves_reduction_factor", "1.5", "Must be in (0, 1]");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"type\":\"InvalidInput\""));
        let roundtrip: CalcError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(CalcError::room_not_found("r-1").error_code(), "ROOM_NOT_FOUND");
        assert_eq!(CalcError::serialization("bad json").error_code(), "SERIALIZATION_ERROR");
        assert!(CalcError::file_locked("/tmp/store", "busy").is_recoverable());
        assert!(!CalcError::room_not_found("r-1").is_recoverable());
    }
}
