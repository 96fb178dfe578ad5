pub mod error;

pub use error::{JinaError, Result};

use std::time::Duration;

use tracing::debug;

const JINA_READER_URL: &str = "https://r.jina.ai";

/// Client for the Jina Reader API, which renders a page and returns its
/// textual content.
pub struct JinaClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl JinaClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: JINA_READER_URL.to_string(),
            api_key: api_key.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Fetch the plain-text rendering of `url`.
    ///
    /// The reader endpoint takes the target URL as a path suffix and honors
    /// `X-Return-Format: text` to skip markdown conversion.
    pub async fn text(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/{}", self.base_url, url);

        debug!(url, "Jina Reader request");

        let resp = self
            .client
            .get(&endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("X-Return-Format", "text")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(JinaError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let rate_limited = JinaError::Api {
            status: 429,
            message: String::new(),
        };
        assert!(rate_limited.is_transient());

        let unavailable = JinaError::Api {
            status: 503,
            message: String::new(),
        };
        assert!(unavailable.is_transient());

        let forbidden = JinaError::Api {
            status: 403,
            message: String::new(),
        };
        assert!(!forbidden.is_transient());
    }
}
