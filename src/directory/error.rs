use std::time::Duration;

/// Errors returned by directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Token acquisition failed.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The directory rejected the request.
    #[error("Graph API error: {status} {code} - {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport failure talking to the directory.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with something we could not interpret.
    #[error("Invalid directory response: {0}")]
    InvalidResponse(String),

    /// Building the client failed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The call did not finish within the configured deadline.
    #[error("Directory call exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The call was cancelled before it finished.
    #[error("Directory call cancelled")]
    Cancelled,
}

impl DirectoryError {
    /// Whether the directory reported the object as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DirectoryError::Api { status: 404, .. })
    }
}
