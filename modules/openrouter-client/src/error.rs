use thiserror::Error;

pub type Result<T> = std::result::Result<T, OpenRouterError>;

#[derive(Debug, Error)]
pub enum OpenRouterError {
    #[error("OpenRouter API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed model response: {0}")]
    Malformed(String),
}

impl OpenRouterError {
    /// Whether a retry of the same request might succeed.
    ///
    /// Malformed responses are deliberately excluded: retrying those is a
    /// caller policy decision, not a transport concern.
    pub fn is_transient(&self) -> bool {
        match self {
            OpenRouterError::Api { status, .. } => *status == 429 || *status >= 500,
            OpenRouterError::Http(e) => e.is_timeout() || e.is_connect(),
            OpenRouterError::Malformed(_) => false,
        }
    }
}
