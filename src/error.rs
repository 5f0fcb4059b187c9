use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlayError>;

#[derive(Debug, Error)]
pub enum PlayError {
    #[error("invalid argument: {0}")]
    Argument(String),
    #[error("failed to open {path}: {source}")]
    Open { path: String, source: io::Error },
    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("failed to resolve host {host}")]
    Resolve {
        host: String,
        #[source]
        source: Option<io::Error>,
    },
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("malformed response: {0}")]
    Protocol(String),
    #[error("invalid response status {0}")]
    Status(u16),
    #[error("response headers exceed {limit} bytes")]
    HeaderOverflow { limit: usize },
    #[error("unsupported or unresolved audio format for {0}")]
    UnresolvedFormat(String),
    #[error("output device error: {0:#}")]
    Sink(anyhow::Error),
    #[error("output write failed: {0}")]
    Write(io::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PlayError {
    /// Process exit status reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlayError::Argument(_) => 2,
            PlayError::Open { .. }
            | PlayError::Url { .. }
            | PlayError::Resolve { .. }
            | PlayError::Connect { .. } => 3,
            PlayError::Protocol(_) | PlayError::Status(_) | PlayError::HeaderOverflow { .. } => 4,
            PlayError::UnresolvedFormat(_) => 5,
            PlayError::Sink(_) | PlayError::Write(_) | PlayError::Io(_) => 6,
        }
    }
}
