//! Error types for synchronization

use thiserror::Error;

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors that can occur while talking to the remote message store
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Access token rejected")]
    Unauthorized,
    #[error("Access forbidden")]
    Forbidden,
    #[error("Request timed out")]
    Timeout,
    #[error("Request cancelled")]
    Cancelled,
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("Unexpected status {0}")]
    Status(u16),
    #[error("Invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("Invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),
    #[error(transparent)]
    Link(#[from] parentline_links::LinkError),
    #[error("Page fetch already running for student {0}")]
    FetchInFlight(i64),
    #[error("Message not found: {0}")]
    MessageNotFound(i64),
    #[error("Student not found: {0}")]
    StudentNotFound(i64),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout
        } else {
            SyncError::Http(err)
        }
    }
}

/// Error taxonomy used for recovery decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Offline, timeout or transport failure; retried later
    Connectivity,
    /// 401 (refresh and retry) or 403 (sign out)
    Authorization,
    /// Requested message or student absent
    DataIntegrity,
    /// Unparseable input or response
    MalformedInput,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Unauthorized | SyncError::Forbidden => ErrorKind::Authorization,
            SyncError::Timeout
            | SyncError::Cancelled
            | SyncError::Http(_)
            | SyncError::Status(_)
            | SyncError::FetchInFlight(_) => ErrorKind::Connectivity,
            SyncError::InvalidResponse(_)
            | SyncError::InvalidBaseUrl(_)
            | SyncError::InvalidConfig(_)
            | SyncError::Link(_) => ErrorKind::MalformedInput,
            SyncError::MessageNotFound(_)
            | SyncError::StudentNotFound(_)
            | SyncError::Store(_) => ErrorKind::DataIntegrity,
        }
    }

    /// Whether repeating the same request can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Unauthorized => true,
            other => other.kind() == ErrorKind::Connectivity,
        }
    }
}
