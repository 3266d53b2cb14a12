//! Error types for the check-in service.
//!
//! Each module has its own error enum; [`ServiceError`] folds them together
//! for the HTTP layer, which maps every variant to a fixed [`ErrorCode`].
//! Public messages come from the code table only, so storage details and
//! the reason behind a signature failure never reach a caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Failures of token issuance and verification.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// No signing secret is available.
    #[error("Signing secret not configured")]
    Unconfigured,

    /// Identifier was empty after normalization.
    #[error("Identifier is empty")]
    EmptyIdentifier,

    /// Token is empty or has no delimiter.
    #[error("Token is malformed")]
    InvalidToken,

    /// Signature does not match the payload under the configured secret.
    #[error("Token signature mismatch")]
    SignatureMismatch,

    /// Token is older than the freshness window.
    #[error("Token expired")]
    Expired,

    /// Payload could not be decoded or lacks required fields.
    #[error("Token payload invalid")]
    InvalidPayload,

    /// Payload could not be serialized while issuing.
    #[error("Token payload encoding failed")]
    Encoding,
}

impl TokenError {
    /// Short label used for metrics and log fields.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unconfigured => "unconfigured",
            Self::EmptyIdentifier => "empty_identifier",
            Self::InvalidToken => "invalid_token",
            Self::SignatureMismatch => "signature_mismatch",
            Self::Expired => "expired",
            Self::InvalidPayload => "invalid_payload",
            Self::Encoding => "encoding",
        }
    }

    /// Only a missing secret can be fixed without re-issuing the code.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Unconfigured)
    }
}

/// Roster storage and validation failures.
#[derive(Error, Debug)]
pub enum RosterError {
    /// Two entries normalize to the same identifier.
    #[error("Duplicate enrollment number: {0}")]
    DuplicateIdentifier(String),

    /// An entry is missing required data.
    #[error("Invalid roster entry at index {index}: {reason}")]
    InvalidEntry {
        /// Position in the submitted list
        index: usize,
        /// What is wrong with it
        reason: String,
    },

    /// Backing store failed.
    #[error("Roster storage error: {0}")]
    Storage(String),

    /// Stored data could not be (de)serialized.
    #[error("Roster serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RosterError {
    /// Create a storage error with the given message.
    #[must_use]
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<redis::RedisError> for RosterError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Verification ledger storage failures.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Backing store failed.
    #[error("Ledger storage error: {0}")]
    Storage(String),

    /// Stored record could not be (de)serialized.
    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<redis::RedisError> for LedgerError {
    fn from(err: redis::RedisError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Top-level error returned by request handlers.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Token issuance or verification failed
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Roster operation failed
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Ledger operation failed
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Request is missing a parameter or has the wrong shape
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Admin secret missing or wrong
    #[error("Admin secret required")]
    Unauthorized,

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Token(e) => match e {
                TokenError::Unconfigured => ErrorCode::SigningUnconfigured,
                TokenError::EmptyIdentifier => ErrorCode::MissingParameter,
                TokenError::InvalidToken => ErrorCode::InvalidToken,
                TokenError::SignatureMismatch => ErrorCode::SignatureMismatch,
                TokenError::Expired => ErrorCode::TokenExpired,
                TokenError::InvalidPayload => ErrorCode::InvalidPayload,
                TokenError::Encoding => ErrorCode::Internal,
            },
            Self::Roster(RosterError::DuplicateIdentifier(_) | RosterError::InvalidEntry { .. }) => {
                ErrorCode::InvalidRoster
            }
            Self::Roster(_) | Self::Ledger(_) => ErrorCode::StorageUnavailable,
            Self::BadRequest(_) => ErrorCode::MissingParameter,
            Self::Unauthorized => ErrorCode::Unauthorized,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Message safe to return to a caller.
    ///
    /// Validation errors echo the caller's own input problem; everything
    /// else uses the fixed text of its code.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::BadRequest(msg) => msg.clone(),
            Self::Roster(e @ (RosterError::DuplicateIdentifier(_) | RosterError::InvalidEntry { .. })) => {
                e.to_string()
            }
            _ => self.code().message().to_string(),
        }
    }
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    MissingParameter,
    InvalidToken,
    InvalidPayload,
    SignatureMismatch,
    TokenExpired,
    SigningUnconfigured,
    InvalidRoster,
    Unauthorized,
    StorageUnavailable,
    Internal,
}

impl ErrorCode {
    /// String representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::InvalidToken => "TOKEN_INVALID",
            Self::InvalidPayload => "TOKEN_PAYLOAD_INVALID",
            Self::SignatureMismatch => "TOKEN_SIGNATURE_MISMATCH",
            Self::TokenExpired => "TOKEN_EXPIRED",
            Self::SigningUnconfigured => "SIGNING_UNCONFIGURED",
            Self::InvalidRoster => "ROSTER_INVALID",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::StorageUnavailable => "STORAGE_UNAVAILABLE",
            Self::Internal => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::MissingParameter | Self::InvalidToken | Self::InvalidPayload | Self::InvalidRoster => {
                StatusCode::BAD_REQUEST
            }
            Self::SignatureMismatch | Self::TokenExpired | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::SigningUnconfigured | Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Fixed public message.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MissingParameter => "Missing or invalid parameter",
            Self::InvalidToken => "Invalid token",
            Self::InvalidPayload => "Invalid payload",
            Self::SignatureMismatch => "Signature mismatch",
            Self::TokenExpired => "Token expired",
            Self::SigningUnconfigured => "Signing not configured",
            Self::InvalidRoster => "Invalid roster data",
            Self::Unauthorized => "Admin secret required",
            Self::StorageUnavailable => "Storage unavailable",
            Self::Internal => "Internal error",
        }
    }
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    /// Human-readable message (sanitized)
    pub error: String,
    /// Code for programmatic handling
    pub code: &'static str,
    /// Correlates the response with server logs
    pub correlation_id: Uuid,
}

impl ErrorResponse {
    /// Build a response body from a service error.
    #[must_use]
    pub fn from_error(error: &ServiceError, correlation_id: Uuid) -> Self {
        Self {
            error: error.public_message(),
            code: error.code().as_str(),
            correlation_id,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let correlation_id = Uuid::new_v4();
        let code = self.code();
        match code {
            ErrorCode::Internal | ErrorCode::StorageUnavailable => {
                tracing::error!(%correlation_id, code = code.as_str(), error = %self, "Request failed");
            }
            _ => {
                tracing::debug!(%correlation_id, code = code.as_str(), error = %self, "Request rejected");
            }
        }
        let body = ErrorResponse::from_error(&self, correlation_id);
        (code.http_status(), Json(body)).into_response()
    }
}
