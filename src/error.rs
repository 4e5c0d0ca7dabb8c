use thiserror::Error;

/// Ways a chat exchange with the remote service can fail.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The configured endpoint is not an absolute http(s) URL
    #[error("invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// Connection, DNS, TLS or timeout failure before a status was received
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with a non-success status code
    #[error("API request failed with status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    /// The body did not match the expected JSON shape
    #[error("malformed response ({source}). Raw response: {body}")]
    Decode {
        body: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ChatError {
    /// The HTTP status, if the service got far enough to send one.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            ChatError::Status { status, .. } => Some(*status),
            ChatError::Transport(err) => err.status(),
            _ => None,
        }
    }
}
