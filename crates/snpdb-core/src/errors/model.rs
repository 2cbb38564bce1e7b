// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Validation = 3,
    DependencyFailure = 4,
    NotFound = 5,
    Conflict = 6,
    Aborted = 7,
    Internal = 10,
}

impl ExitCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Usage => "usage",
            Self::Validation => "validation",
            Self::DependencyFailure => "dependency_failure",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Aborted => "aborted",
            Self::Internal => "internal",
        }
    }
}

/// Stable machine codes shared by every crate in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ErrorCode {
    UsageError,
    ConfigError,
    ValidationError,
    UniquenessViolation,
    NotFound,
    UserAborted,
    StoreFailure,
    FormatError,
    InternalError,
}

pub const ERROR_CODES: &[ErrorCode] = &[
    ErrorCode::UsageError,
    ErrorCode::ConfigError,
    ErrorCode::ValidationError,
    ErrorCode::UniquenessViolation,
    ErrorCode::NotFound,
    ErrorCode::UserAborted,
    ErrorCode::StoreFailure,
    ErrorCode::FormatError,
    ErrorCode::InternalError,
];

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UsageError => "usage_error",
            Self::ConfigError => "config_error",
            Self::ValidationError => "validation_error",
            Self::UniquenessViolation => "uniqueness_violation",
            Self::NotFound => "not_found",
            Self::UserAborted => "user_aborted",
            Self::StoreFailure => "store_failure",
            Self::FormatError => "format_error",
            Self::InternalError => "internal_error",
        }
    }

    #[must_use]
    pub const fn exit_code(self) -> ExitCode {
        match self {
            Self::UsageError | Self::ConfigError => ExitCode::Usage,
            Self::ValidationError | Self::FormatError => ExitCode::Validation,
            Self::UniquenessViolation => ExitCode::Conflict,
            Self::NotFound => ExitCode::NotFound,
            Self::UserAborted => ExitCode::Aborted,
            Self::StoreFailure => ExitCode::DependencyFailure,
            Self::InternalError => ExitCode::Internal,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigPathScope {
    User,
    Workspace,
}

#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    SerdeJson(serde_json::Error),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    InvalidConfig {
        key: &'static str,
        reason: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SerdeJson(err) => write!(f, "config json error: {err}"),
            Self::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::InvalidConfig { key, reason } => write!(f, "invalid config `{key}`: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SerdeJson(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::InvalidConfig { .. } => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::SerdeJson(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MachineError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl MachineError {
    #[must_use]
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_code(code: ErrorCode, message: &str) -> Self {
        Self::new(code.as_str(), message)
    }

    #[must_use]
    pub fn with_detail(mut self, key: &str, value: &str) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for MachineError {}
