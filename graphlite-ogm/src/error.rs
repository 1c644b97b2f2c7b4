// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the object-graph mapper

use std::fmt;
use thiserror::Error;

/// Failure reported by the store driver while running a statement
///
/// Keeps the store's error code (constraint violation, syntax error, ...)
/// so callers can branch on it after propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub code: Option<String>,
    pub message: String,
}

impl StoreError {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code<C: Into<String>, T: Into<String>>(code: C, message: T) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors raised by graph cache, lifecycle and query operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        Error::NotFound(msg.into())
    }

    pub fn invalid_state<T: Into<String>>(msg: T) -> Self {
        Error::InvalidState(msg.into())
    }

    pub fn invalid_argument<T: Into<String>>(msg: T) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// The instance has no stable id (never saved, or already deleted)
    pub fn missing_identity() -> Self {
        Error::InvalidState("missing identity".to_string())
    }

    /// Store error code, when the failure came from the driver
    pub fn store_code(&self) -> Option<&str> {
        match self {
            Error::Store(e) => e.code.as_deref(),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_keeps_code() {
        let err: Error = StoreError::with_code(
            "Neo.ClientError.Schema.ConstraintValidationFailed",
            "already exists",
        )
        .into();

        assert_eq!(
            err.store_code(),
            Some("Neo.ClientError.Schema.ConstraintValidationFailed")
        );
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_missing_identity_message() {
        let err = Error::missing_identity();
        assert!(matches!(err, Error::InvalidState(ref m) if m == "missing identity"));
    }
}
