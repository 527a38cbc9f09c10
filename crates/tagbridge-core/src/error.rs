// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Unified error hierarchy for tagbridge.
//!
//! Errors are grouped by the boundary they originate from, which also decides
//! how far they propagate:
//!
//! ```text
//! BridgeError (root)
//! ├── SourceError     - Snapshot pull failed or timed out (fails the cycle)
//! ├── TransformError  - One record could not be converted (record dropped)
//! ├── WriteError      - One writeback record failed (record isolated)
//! ├── PublishError    - Publish collaborator rejected a batch
//! └── StateError      - Snapshot persistence failed
//! ```
//!
//! # Examples
//!
//! ```
//! use tagbridge_core::error::{BridgeError, SourceError};
//! use std::time::Duration;
//!
//! let error = SourceError::timeout(Duration::from_secs(5));
//! assert!(error.is_retryable());
//!
//! let bridge_error: BridgeError = error.into();
//! assert_eq!(bridge_error.error_type(), "source");
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// BridgeError - Root Error Type
// =============================================================================

/// The root error type for tagbridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The source snapshot could not be pulled.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// A record could not be transformed.
    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    /// A writeback record failed.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// A batch could not be published.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// The state snapshot could not be persisted.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// A reconciliation cycle is already running.
    #[error("A reconciliation cycle is already in progress")]
    CycleInProgress,

    /// The engine was cancelled before the cycle started.
    #[error("Engine cancelled")]
    Cancelled,
}

impl BridgeError {
    /// Returns `true` if the failed operation may succeed on the next tick.
    pub fn is_retryable(&self) -> bool {
        match self {
            BridgeError::Source(e) => e.is_retryable(),
            BridgeError::Publish(_) => true,
            BridgeError::State(e) => e.is_retryable(),
            BridgeError::CycleInProgress => true,
            _ => false,
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            BridgeError::Source(_) => "source",
            BridgeError::Transform(e) => e.error_type(),
            BridgeError::Write(_) => "write",
            BridgeError::Publish(_) => "publish",
            BridgeError::State(_) => "state",
            BridgeError::CycleInProgress => "cycle_in_progress",
            BridgeError::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// SourceError
// =============================================================================

/// Errors raised while pulling a snapshot from the tag source.
///
/// A timed-out pull is reported as [`SourceError::Timeout`] and handled exactly
/// like [`SourceError::Unavailable`]: the cycle fails and is retried on the
/// next tick.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached or the query failed.
    #[error("Source unavailable: {message}")]
    Unavailable {
        /// Error message.
        message: String,
        /// Underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The pull did not complete within the configured timeout.
    #[error("Source pull timed out after {duration:?}")]
    Timeout {
        /// The timeout duration.
        duration: Duration,
    },
}

impl SourceError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unavailable error with a source.
    pub fn unavailable_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }

    /// Source errors are always retried on the next scheduled tick.
    pub fn is_retryable(&self) -> bool {
        true
    }
}

// =============================================================================
// TransformError
// =============================================================================

/// Errors raised while converting a single record between the two models.
///
/// These never abort a batch. The offending record is dropped and logged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    /// No type-table entry exists for the given type.
    #[error("Unsupported type: {type_name}")]
    UnsupportedType {
        /// The type name or code that has no mapping.
        type_name: String,
    },

    /// A name could not be decomposed.
    #[error("Malformed name '{name}': {reason}")]
    MalformedName {
        /// The offending name.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// A value could not be parsed as the resolved target type.
    #[error("Invalid value '{value}' for {data_type} tag '{name}'")]
    InvalidValue {
        /// The record name.
        name: String,
        /// The raw value.
        value: String,
        /// The target type name.
        data_type: String,
    },
}

impl TransformError {
    /// Creates an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
        }
    }

    /// Creates a malformed name error.
    pub fn malformed_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(
        name: impl Into<String>,
        value: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name: name.into(),
            value: value.into(),
            data_type: data_type.into(),
        }
    }

    /// Returns the error type as a string for logging.
    pub fn error_type(&self) -> &'static str {
        match self {
            TransformError::UnsupportedType { .. } => "unsupported_type",
            TransformError::MalformedName { .. } => "malformed_name",
            TransformError::InvalidValue { .. } => "invalid_value",
        }
    }
}

// =============================================================================
// WriteError
// =============================================================================

/// A single writeback record failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Write failed for '{name}': {message}")]
pub struct WriteError {
    /// The tag name that failed.
    pub name: String,
    /// Error message.
    pub message: String,
}

impl WriteError {
    /// Creates a write error.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// PublishError
// =============================================================================

/// The publish collaborator rejected a batch.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The session is not connected.
    #[error("Publisher is not connected")]
    NotConnected,

    /// The publish itself failed.
    #[error("Publish failed: {message}")]
    Failed {
        /// Error message.
        message: String,
    },
}

impl PublishError {
    /// Creates a publish failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

// =============================================================================
// StateError
// =============================================================================

/// Errors raised while persisting the state snapshot.
#[derive(Debug, Error)]
pub enum StateError {
    /// Filesystem operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("Failed to serialize state snapshot: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StateError {
    /// Creates an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if retrying the save may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StateError::Io { .. })
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for tagbridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Result type for source pulls.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for record transforms.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for state persistence.
pub type StateResult<T> = Result<T, StateError>;
