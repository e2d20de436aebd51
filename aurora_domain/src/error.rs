// /////////////////////////////////////////////////////////////////////////////
// Aurora AV Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error hierarchy for the aurora domain. Failures
//! are categorized so callers can decide between retry, skip, and abort
//! without string matching.
//!
//! Two layers exist side by side:
//!
//! - [`AuroraError`] — the crate-wide error type carried through `Result`s.
//!   Variants are string-payload categories in the style of the pipeline's
//!   other services; conversions from `std::io::Error` and `serde_json`
//!   errors are provided.
//! - [`ChatErrorKind`] — the LLM provider error taxonomy. A `ChatErrorKind`
//!   is data, not an error value: providers never fail out-of-band, they
//!   return a `ChatResult` carrying one of these kinds. Each kind knows
//!   whether it is retryable and whether it must trip the provider's
//!   circuit breaker.
//!
//! ## Recoverable Errors
//!
//! `TimeoutError`, `IoError` and `ResourceExhausted` indicate temporary
//! conditions; everything else requires intervention (bad configuration,
//! constraint violations, cancelled runs).

use thiserror::Error;

/// Domain-specific errors for the aurora pipeline.
///
/// Each variant represents a failure category with a descriptive message.
/// Stage execution maps these onto stage statuses; non-stage fatal
/// conditions abort the movie's transaction.
#[derive(Error, Debug, Clone)]
pub enum AuroraError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid AV code: {0}")]
    InvalidCode(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Unsupported video suffix: {0}")]
    UnsupportedSuffix(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),

    #[error("Scrape error: {0}")]
    ScrapeError(String),

    #[error("Subtitle error: {0}")]
    SubtitleError(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Movie not found: {0}")]
    MovieNotFound(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuroraError {
    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Creates a new processing error
    pub fn processing_failed(msg: impl Into<String>) -> Self {
        Self::ProcessingFailed(msg.into())
    }

    /// Creates a new IO error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::IoError(msg.into())
    }

    /// Creates a new database error
    pub fn database_error(msg: impl Into<String>) -> Self {
        Self::DatabaseError(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AuroraError::TimeoutError(_) | AuroraError::ResourceExhausted(_) | AuroraError::IoError(_)
        )
    }

    /// Gets the error category
    pub fn category(&self) -> &'static str {
        match self {
            AuroraError::InvalidConfiguration(_) => "configuration",
            AuroraError::ValidationError(_) => "validation",
            AuroraError::InvalidCode(_) => "validation",
            AuroraError::InvalidFingerprint(_) => "validation",
            AuroraError::UnsupportedSuffix(_) => "validation",
            AuroraError::ProcessingFailed(_) => "processing",
            AuroraError::ScrapeError(_) => "scrape",
            AuroraError::SubtitleError(_) => "subtitle",
            AuroraError::ResourceExhausted(_) => "resource",
            AuroraError::IoError(_) => "io",
            AuroraError::DatabaseError(_) => "database",
            AuroraError::SerializationError(_) => "serialization",
            AuroraError::TimeoutError(_) => "timeout",
            AuroraError::Cancelled(_) => "cancellation",
            AuroraError::MovieNotFound(_) => "movie",
            AuroraError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for AuroraError {
    fn from(err: std::io::Error) -> Self {
        AuroraError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for AuroraError {
    fn from(err: serde_json::Error) -> Self {
        AuroraError::SerializationError(err.to_string())
    }
}

// NOTE: sqlx and reqwest conversions live in the infrastructure crate.
// The domain only depends on std and serde_json.

/// Error taxonomy for one LLM chat call.
///
/// Classification drives two independent decisions at the provider:
/// retry the attempt, and trip the process-wide circuit breaker. The
/// matrix follows the provider contract:
///
/// | Kind | Retry | Circuit-break |
/// |---|---|---|
/// | `AuthenticationError` | no | yes |
/// | `PermissionDenied` | no | yes |
/// | `InsufficientQuota` | no | yes |
/// | `NotFound` | no | yes |
/// | `ContentFilter` | no | no |
/// | `UnprocessableEntity` | no | no |
/// | `PayloadTooLarge` | no | no |
/// | `LengthLimit` | no (strategy splits) | no |
/// | `RateLimit` | yes | no |
/// | `ConnectionError` | yes | no |
/// | `Timeout` | yes | no |
/// | `Other` | yes | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChatErrorKind {
    AuthenticationError,
    PermissionDenied,
    InsufficientQuota,
    NotFound,
    ContentFilter,
    UnprocessableEntity,
    PayloadTooLarge,
    LengthLimit,
    RateLimit,
    ConnectionError,
    Timeout,
    Other,
}

impl ChatErrorKind {
    /// Whether the provider may retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatErrorKind::RateLimit
                | ChatErrorKind::ConnectionError
                | ChatErrorKind::Timeout
                | ChatErrorKind::Other
        )
    }

    /// Whether the error disables the provider for the rest of the process.
    ///
    /// The transition is monotonic: a tripped breaker never closes again.
    pub fn is_circuit_breaking(&self) -> bool {
        matches!(
            self,
            ChatErrorKind::AuthenticationError
                | ChatErrorKind::PermissionDenied
                | ChatErrorKind::InsufficientQuota
                | ChatErrorKind::NotFound
        )
    }
}

impl std::fmt::Display for ChatErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ChatErrorKind::AuthenticationError => "authentication_error",
            ChatErrorKind::PermissionDenied => "permission_denied",
            ChatErrorKind::InsufficientQuota => "insufficient_quota",
            ChatErrorKind::NotFound => "not_found",
            ChatErrorKind::ContentFilter => "content_filter",
            ChatErrorKind::UnprocessableEntity => "unprocessable_entity",
            ChatErrorKind::PayloadTooLarge => "payload_too_large",
            ChatErrorKind::LengthLimit => "length_limit",
            ChatErrorKind::RateLimit => "rate_limit",
            ChatErrorKind::ConnectionError => "connection_error",
            ChatErrorKind::Timeout => "timeout",
            ChatErrorKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(ChatErrorKind::Timeout.is_retryable());
        assert!(ChatErrorKind::ConnectionError.is_retryable());
        assert!(ChatErrorKind::RateLimit.is_retryable());
        assert!(ChatErrorKind::Other.is_retryable());
        assert!(!ChatErrorKind::LengthLimit.is_retryable());
        assert!(!ChatErrorKind::ContentFilter.is_retryable());
        assert!(!ChatErrorKind::AuthenticationError.is_retryable());
    }

    #[test]
    fn test_circuit_breaking_kinds() {
        assert!(ChatErrorKind::AuthenticationError.is_circuit_breaking());
        assert!(ChatErrorKind::PermissionDenied.is_circuit_breaking());
        assert!(ChatErrorKind::InsufficientQuota.is_circuit_breaking());
        assert!(ChatErrorKind::NotFound.is_circuit_breaking());
        assert!(!ChatErrorKind::RateLimit.is_circuit_breaking());
        assert!(!ChatErrorKind::UnprocessableEntity.is_circuit_breaking());
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(AuroraError::invalid_config("x").category(), "configuration");
        assert_eq!(AuroraError::database_error("x").category(), "database");
        assert_eq!(AuroraError::InvalidCode("x".into()).category(), "validation");
    }

    #[test]
    fn test_recoverable() {
        assert!(AuroraError::TimeoutError("t".into()).is_recoverable());
        assert!(!AuroraError::ValidationError("v".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: AuroraError = io.into();
        assert_eq!(err.category(), "io");
    }
}
