use thiserror::Error;

/// Failures raised by an [`HttpExecutor`](crate::gemini::HttpExecutor).
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("read response body: {0}")]
    Body(String),
}

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid generation parameters: {0}")]
    Validation(String),

    #[error("marshal request: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("do request: {0}")]
    Transport(#[from] TransportError),

    #[error("response exceeds {limit} byte limit")]
    ResponseTooLarge { limit: usize },

    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("unmarshal response: {0}")]
    Deserialize(#[source] serde_json::Error),
}

impl GeminiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Cancelled))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout))
    }

    /// HTTP status of a rejected request, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GeminiError>;
