//! Error types for repsync-core

use std::fmt;

use thiserror::Error;

use crate::models::EntityKind;

/// Result type alias using repsync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in repsync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record in a batch failed validation; nothing from the batch was applied
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Network transport failure (push/pull/probe)
    #[error("Sync transport error: {0}")]
    Transport(String),

    /// Snapshot document cannot be restored by this build
    #[error("Unsupported snapshot: {0}")]
    UnsupportedSnapshot(String),
}

impl Error {
    /// Whether this error is a batch validation failure.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Identifies the record that caused a batch to be rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: EntityKind,
    pub client_id: String,
    pub reason: ValidationReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReason {
    /// Client identifier is empty or whitespace
    EmptyClientId,
    /// Parent record is neither in the store nor merged earlier in the batch
    MissingParent {
        kind: EntityKind,
        client_id: String,
    },
}

impl ValidationError {
    pub fn new(kind: EntityKind, client_id: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            kind,
            client_id: client_id.into(),
            reason,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            ValidationReason::EmptyClientId => {
                write!(f, "{} record has an empty clientId", self.kind)
            }
            ValidationReason::MissingParent { kind, client_id } => write!(
                f,
                "{} '{}' references missing {} '{}'",
                self.kind, self.client_id, kind, client_id
            ),
        }
    }
}

impl std::error::Error for ValidationError {}
