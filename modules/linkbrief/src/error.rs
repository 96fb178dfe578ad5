/// Result type alias for fatal, run-level errors. Per-item failures never use
/// this — they are recorded in the index instead.
pub type Result<T> = std::result::Result<T, LinkbriefError>;

#[derive(Debug, thiserror::Error)]
pub enum LinkbriefError {
    #[error("Cannot read input {path}: {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },

    #[error("Index store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Corrupt index row for {url}: unknown status {status:?}")]
    CorruptRow { url: String, status: String },

    #[error("Cache error: {0}")]
    Cache(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
