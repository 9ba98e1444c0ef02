use serde_json::Value;
use thiserror::Error;

/// Errors from attribute API calls.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never reached the server or no response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("request rejected ({status}): {body}")]
    Rejected {
        status: u16,
        /// Response body, parsed as JSON when possible.
        body: Value,
    },

    /// A 2xx response whose body does not match the model.
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ApiError {
    pub fn rejected(status: u16, body: impl Into<Value>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;
