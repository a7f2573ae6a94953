//! Client error taxonomy.
//!
//! Only failures of the client API surface live here. A line inside a stream
//! that fails to parse as JSON is logged and skipped, never surfaced; an
//! `ERROR` event from the backend is data (a terminal [`crate::events::AgentEvent`]),
//! not a Rust error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    /// Connection could not be established or dropped before a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("server returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// A one-shot response body was not the expected JSON shape.
    #[error("invalid response payload: {0}")]
    Parse(String),

    /// A streaming session is already in flight for this client.
    #[error("a streaming session is already active")]
    SessionActive,

    /// The configured base URL and path could not be combined.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),
}

impl StreamError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StreamError::Transport(format!("request timeout: {}", err))
        } else if err.is_connect() {
            StreamError::Transport(format!("connection failed: {}", err))
        } else {
            StreamError::Transport(format!("request failed: {}", err))
        }
    }
}
