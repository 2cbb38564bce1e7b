// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

use snpdb_core::ErrorCode;
use snpdb_store::{StoreError, StoreErrorCode};

use crate::formats::FormatError;

#[derive(Debug)]
#[non_exhaustive]
pub enum ImportError {
    /// Conflicting or unusable options, rejected before any I/O.
    Configuration(String),
    /// Duplicate map name or sample key, rejected before any write.
    Uniqueness(String),
    Validation(String),
    NotFound(String),
    /// A decision handler answered with an option it was not offered.
    InvalidDecision(String),
    /// A conflict needed a decision and the strategy refuses to make one.
    DecisionRequired(String),
    UserAborted(String),
    Integrity(String),
    Format(FormatError),
    Store(StoreError),
}

impl ImportError {
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Configuration(_) => ErrorCode::ConfigError,
            Self::Uniqueness(_) => ErrorCode::UniquenessViolation,
            Self::Validation(_) | Self::InvalidDecision(_) => ErrorCode::ValidationError,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::DecisionRequired(_) | Self::UserAborted(_) => ErrorCode::UserAborted,
            Self::Integrity(_) => ErrorCode::InternalError,
            Self::Format(_) => ErrorCode::FormatError,
            Self::Store(err) => match err.code {
                StoreErrorCode::NotFound => ErrorCode::NotFound,
                StoreErrorCode::Conflict => ErrorCode::UniquenessViolation,
                StoreErrorCode::Validation => ErrorCode::ValidationError,
                _ => ErrorCode::StoreFailure,
            },
        }
    }
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::Uniqueness(msg) => write!(f, "uniqueness violation: {msg}"),
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvalidDecision(msg) => write!(f, "invalid decision: {msg}"),
            Self::DecisionRequired(msg) => write!(f, "decision required: {msg}"),
            Self::UserAborted(msg) => write!(f, "aborted: {msg}"),
            Self::Integrity(msg) => write!(f, "data integrity error: {msg}"),
            Self::Format(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "store error: {err}"),
        }
    }
}

impl std::error::Error for ImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Format(err) => Some(err),
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ImportError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<FormatError> for ImportError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<snpdb_model::ValidationError> for ImportError {
    fn from(value: snpdb_model::ValidationError) -> Self {
        Self::Validation(value.0)
    }
}
