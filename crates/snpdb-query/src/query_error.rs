// SPDX-License-Identifier: Apache-2.0

use snpdb_core::ErrorCode;
use snpdb_ingest::{FormatError, ImportError};
use snpdb_store::{StoreError, StoreErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum QueryErrorCode {
    Validation,
    NotFound,
    Integrity,
    Format,
    Store,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    pub code: QueryErrorCode,
    pub message: String,
}

impl QueryError {
    #[must_use]
    pub fn new(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::NotFound, message)
    }

    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self.code {
            QueryErrorCode::Validation => ErrorCode::ValidationError,
            QueryErrorCode::NotFound => ErrorCode::NotFound,
            QueryErrorCode::Integrity => ErrorCode::InternalError,
            QueryErrorCode::Format => ErrorCode::FormatError,
            QueryErrorCode::Store => ErrorCode::StoreFailure,
        }
    }
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}
impl std::error::Error for QueryError {}

impl From<StoreError> for QueryError {
    fn from(value: StoreError) -> Self {
        let code = match value.code {
            StoreErrorCode::NotFound => QueryErrorCode::NotFound,
            StoreErrorCode::Validation => QueryErrorCode::Validation,
            _ => QueryErrorCode::Store,
        };
        Self::new(code, value.to_string())
    }
}

impl From<FormatError> for QueryError {
    fn from(value: FormatError) -> Self {
        Self::new(QueryErrorCode::Format, value.to_string())
    }
}

impl From<ImportError> for QueryError {
    fn from(value: ImportError) -> Self {
        match value {
            ImportError::Store(err) => err.into(),
            ImportError::Format(err) => err.into(),
            ImportError::NotFound(msg) => Self::new(QueryErrorCode::NotFound, msg),
            ImportError::Integrity(msg) => Self::new(QueryErrorCode::Integrity, msg),
            other => Self::new(QueryErrorCode::Validation, other.to_string()),
        }
    }
}
