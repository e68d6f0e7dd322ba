//! Application-wide error types.
//!
//! [`ApiError`] is the single error value every backend call normalises to.
//! Stores keep a clone of it in their error slot and also return it to the
//! caller, so it must stay `Clone` and carry only owned strings.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout: no HTTP response at all.
    #[error("request failed: {0}")]
    Transport(String),

    /// Backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// A required path parameter was missing or blank.
    #[error("{0} is missing")]
    MissingParam(String),
}

impl ApiError {
    /// HTTP status code, when the backend produced one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if e.is_builder() {
            ApiError::InvalidUrl(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Usage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
