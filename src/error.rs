use thiserror::Error;

/// Failure kinds surfaced by the advisory client.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
    #[error("Model returned no usable text")]
    EmptyResponse,
    #[error("Malformed model response: {0}")]
    MalformedResponse(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Stable discriminant so callers can render a distinct message per failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    Upstream,
    EmptyResponse,
    MalformedResponse,
    InvalidInput,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::Upstream => "upstream",
            ErrorKind::EmptyResponse => "empty_response",
            ErrorKind::MalformedResponse => "malformed_response",
            ErrorKind::InvalidInput => "invalid_input",
        }
    }
}

impl AdvisorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AdvisorError::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            AdvisorError::Upstream(_) => ErrorKind::Upstream,
            AdvisorError::EmptyResponse => ErrorKind::EmptyResponse,
            AdvisorError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            AdvisorError::InvalidInput(_) => ErrorKind::InvalidInput,
        }
    }
}

impl From<reqwest::Error> for AdvisorError {
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            AdvisorError::Upstream(format!("request timed out: {}", err))
        } else {
            AdvisorError::Upstream(err.to_string())
        }
    }
}
