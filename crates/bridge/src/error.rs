//! Error envelope returned across the capability boundary.

use serde::Serialize;

use labelprint_session::{ErrorCategory, SessionError};

/// Message used for every call made before `initialize`.
pub const NOT_INITIALIZED_MESSAGE: &str = "Printer not initialized. Call initialize() first.";

/// Stable error codes seen by the host.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A call other than `initialize`/`isInitialized` came first.
    NotInitialized,
    /// Empty or malformed input.
    ValidationError,
    /// Printer unreachable or rejected the connection.
    ConnectError,
    /// No open connection.
    TransportError,
    /// The printer refused a draw command.
    DrawError,
    /// The transaction did not close cleanly.
    TransactionError,
    /// Link or collaborator failure.
    IoError,
    /// Discovery could not start or is already running.
    DiscoveryError,
    /// Unexpected failure inside the bridge.
    InternalError,
}

impl From<ErrorCategory> for ErrorCode {
    fn from(category: ErrorCategory) -> Self {
        match category {
            ErrorCategory::Validation => ErrorCode::ValidationError,
            ErrorCategory::Connect => ErrorCode::ConnectError,
            ErrorCategory::Transport => ErrorCode::TransportError,
            ErrorCategory::Draw => ErrorCode::DrawError,
            ErrorCategory::Transaction => ErrorCode::TransactionError,
            ErrorCategory::Io => ErrorCode::IoError,
            ErrorCategory::Discovery => ErrorCode::DiscoveryError,
            _ => ErrorCode::InternalError,
        }
    }
}

/// `{ code, message }` error returned by every failing bridge call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct BridgeError {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
}

impl BridgeError {
    /// Build an error from parts.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// The error for calls made before `initialize`.
    pub fn not_initialized() -> Self {
        Self::new(ErrorCode::NotInitialized, NOT_INITIALIZED_MESSAGE)
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<SessionError> for BridgeError {
    fn from(err: SessionError) -> Self {
        Self::new(err.category().into(), err.to_string())
    }
}
