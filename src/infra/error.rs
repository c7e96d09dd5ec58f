//! Error types for the content store and crate-level plumbing

use thiserror::Error;

use crate::domain::InvalidIdentifier;

/// Errors that can occur outside the scheme itself (configuration, anchoring)
#[derive(Error, Debug)]
pub enum VaultError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// On-chain anchoring error
    #[error("anchor error: {0}")]
    Anchor(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for crate-level operations
pub type Result<T> = std::result::Result<T, VaultError>;

/// Upload to the content store failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// Connection-level failure
    #[error("network error: {0}")]
    Network(String),

    /// API key/secret rejected
    #[error("content store rejected credentials (status {status})")]
    Auth { status: u16 },

    /// Payload over the configured or server-side limit
    #[error("upload of {size} bytes exceeds the size limit")]
    SizeLimit { size: u64 },

    /// Request or caller-side timeout
    #[error("upload timed out")]
    Timeout,

    /// Any other non-success status
    #[error("content store rejected upload (status {status}): {body}")]
    Rejected { status: u16, body: String },

    /// Request could not be built
    #[error("invalid upload request: {0}")]
    InvalidRequest(String),

    /// Response missing or carrying an invalid identifier
    #[error("invalid response from content store: {0}")]
    InvalidResponse(String),
}

impl UploadError {
    /// Whether a retry could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            UploadError::Network(_) | UploadError::Timeout => true,
            UploadError::Rejected { status, .. } => *status >= 500 || *status == 429,
            UploadError::Auth { .. }
            | UploadError::SizeLimit { .. }
            | UploadError::InvalidRequest(_)
            | UploadError::InvalidResponse(_) => false,
        }
    }
}

/// Fetch from the content store failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Nothing stored (or reachable) under this identifier
    #[error("content not found")]
    NotFound,

    /// Request or caller-side timeout
    #[error("fetch timed out")]
    Timeout,

    /// Connection failure or unexpected gateway status
    #[error("transport error: {0}")]
    Transport(String),

    /// Identifier failed validation; no request was made
    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidIdentifier),
}

impl FetchError {
    /// Timeouts and transport failures are retried; the rest are final
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::Transport(_))
    }
}
