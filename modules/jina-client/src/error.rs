use thiserror::Error;

pub type Result<T> = std::result::Result<T, JinaError>;

#[derive(Debug, Error)]
pub enum JinaError {
    #[error("Reader API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl JinaError {
    /// Whether a retry of the same request might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            JinaError::Api { status, .. } => *status == 429 || *status >= 500,
            JinaError::Http(e) => e.is_timeout() || e.is_connect(),
        }
    }
}
