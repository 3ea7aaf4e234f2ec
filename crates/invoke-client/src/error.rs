use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, InvokeError>;

/// Failure raised by a [`crate::Transport`] before a response was produced.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to retrieve {url}: {reason}")]
    Retrieval {
        url: String,
        status: Option<u16>,
        reason: String,
        #[source]
        source: Option<TransportError>,
    },
    #[error("call failed with status code {status} {reason}")]
    Status { status: u16, reason: String },
    #[error("could not deserialize the response: {0}")]
    Deserialization(String),
    #[error("failed to encode request body: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("call timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("call cancelled before it settled")]
    Cancelled,
}

/// Coarse error category, used to bucket failures in run summaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    Retrieval,
    Status,
    Deserialization,
    Serialize,
    Transport,
    Timeout,
    Cancelled,
}

impl InvokeError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn deserialization(message: impl Into<String>) -> Self {
        Self::Deserialization(message.into())
    }

    pub fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Retrieval { .. } => ErrorKind::Retrieval,
            Self::Status { .. } => ErrorKind::Status,
            Self::Deserialization(_) => ErrorKind::Deserialization,
            Self::Serialize(_) => ErrorKind::Serialize,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HTTP status code, when the failure carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Retrieval { status, .. } => *status,
            _ => None,
        }
    }

    pub fn format_chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = std::error::Error::source(err);
        }
        chain.join(" | caused by: ")
    }
}
