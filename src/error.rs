use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::utils::validation::ValidationError;

/// Machine-readable code carried by [`UploadError::Domain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    Forbidden,
    InternalServerError,
    InternalClientError,
    TooLarge,
    TooSmall,
    TooManyFiles,
    KeyTooLong,
    UrlGenerationFailed,
    UploadFailed,
    MissingEnv,
    InvalidServerConfig,
    FileLimitExceeded,
}

impl ErrorCode {
    /// HTTP status the code corresponds to.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::BadRequest
            | ErrorCode::TooSmall
            | ErrorCode::TooManyFiles
            | ErrorCode::KeyTooLong => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::TooLarge => 413,
            ErrorCode::InternalServerError
            | ErrorCode::InternalClientError
            | ErrorCode::UrlGenerationFailed
            | ErrorCode::UploadFailed
            | ErrorCode::MissingEnv
            | ErrorCode::InvalidServerConfig
            | ErrorCode::FileLimitExceeded => 500,
        }
    }

    /// Maps a response status onto the first code declared for it.
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => ErrorCode::BadRequest,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            413 => ErrorCode::TooLarge,
            _ => ErrorCode::InternalServerError,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Forbidden => "FORBIDDEN",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorCode::InternalClientError => "INTERNAL_CLIENT_ERROR",
            ErrorCode::TooLarge => "TOO_LARGE",
            ErrorCode::TooSmall => "TOO_SMALL",
            ErrorCode::TooManyFiles => "TOO_MANY_FILES",
            ErrorCode::KeyTooLong => "KEY_TOO_LONG",
            ErrorCode::UrlGenerationFailed => "URL_GENERATION_FAILED",
            ErrorCode::UploadFailed => "UPLOAD_FAILED",
            ErrorCode::MissingEnv => "MISSING_ENV",
            ErrorCode::InvalidServerConfig => "INVALID_SERVER_CONFIG",
            ErrorCode::FileLimitExceeded => "FILE_LIMIT_EXCEEDED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{code}: {message}")]
    Domain {
        code: ErrorCode,
        message: String,
        cause: Option<String>,
    },

    #[error("Request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Upload aborted")]
    Aborted,
}

impl UploadError {
    pub fn domain(code: ErrorCode, message: impl Into<String>) -> Self {
        UploadError::Domain {
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn domain_with_cause(
        code: ErrorCode,
        message: impl Into<String>,
        cause: impl Into<String>,
    ) -> Self {
        UploadError::Domain {
            code,
            message: message.into(),
            cause: Some(cause.into()),
        }
    }

    pub fn fetch(url: impl Into<String>, source: reqwest::Error) -> Self {
        UploadError::Fetch {
            url: url.into(),
            source,
        }
    }

    /// Code of a domain error, `None` for every other kind.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            UploadError::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, UploadError::Aborted)
    }
}
