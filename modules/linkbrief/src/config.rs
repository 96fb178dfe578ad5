use std::env;
use std::path::PathBuf;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Collaborator credentials
    pub openrouter_api_key: String,
    pub jina_api_key: String,

    // Locations
    pub input_path: PathBuf,
    pub index_path: PathBuf,
    pub cache_dir: PathBuf,

    // Pipeline tuning
    pub concurrency: usize,
    pub model: String,
    pub max_chars: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            openrouter_api_key: required_env("OPENROUTER_API_KEY"),
            jina_api_key: required_env("JINA_API_KEY"),
            input_path: env::var("LINKBRIEF_INPUT")
                .unwrap_or_else(|_| "toprocess.txt".to_string())
                .into(),
            index_path: env::var("LINKBRIEF_INDEX")
                .unwrap_or_else(|_| "linkbrief.db".to_string())
                .into(),
            cache_dir: env::var("LINKBRIEF_CACHE_DIR")
                .unwrap_or_else(|_| "cache".to_string())
                .into(),
            concurrency: env::var("LINKBRIEF_CONCURRENCY")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .expect("LINKBRIEF_CONCURRENCY must be a number"),
            model: env::var("LINKBRIEF_MODEL")
                .unwrap_or_else(|_| "openai/gpt-4.1-mini".to_string()),
            max_chars: env::var("LINKBRIEF_MAX_CHARS")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .expect("LINKBRIEF_MAX_CHARS must be a number"),
        }
    }

    /// Log the non-secret configuration surface.
    pub fn log_redacted(&self) {
        info!(
            input = %self.input_path.display(),
            index = %self.index_path.display(),
            cache_dir = %self.cache_dir.display(),
            concurrency = self.concurrency,
            model = %self.model,
            max_chars = self.max_chars,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
