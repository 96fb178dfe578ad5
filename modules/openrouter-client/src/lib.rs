pub mod error;
pub mod schema;
pub mod types;

pub use error::{OpenRouterError, Result};
pub use schema::StructuredOutput;
pub use types::{ChatRequest, ChatResponse, ResponseFormat, WireMessage};

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

/// Client for the OpenRouter chat-completions API.
pub struct OpenRouter {
    api_key: String,
    http: reqwest::Client,
    base_url: String,
    app_name: Option<String>,
}

impl OpenRouter {
    pub fn new(api_key: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            http,
            base_url: OPENROUTER_API_URL.to_string(),
            app_name: None,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    /// Set the `X-Title` attribution header OpenRouter shows in usage logs.
    pub fn with_app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| OpenRouterError::Malformed(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(ref name) = self.app_name {
            if let Ok(val) = HeaderValue::from_str(name) {
                headers.insert("X-Title", val);
            }
        }

        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(model = %request.model, "OpenRouter chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(OpenRouterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    /// Ask the model for a response constrained to `T`'s JSON schema and
    /// deserialize it.
    pub async fn extract<T: StructuredOutput>(&self, request: ChatRequest) -> Result<T> {
        let request = request.response_format(ResponseFormat::json_schema(
            T::output_name(),
            T::response_schema(),
        ));

        let response = self.chat(&request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OpenRouterError::Malformed("no choices in response".into()))?;

        let payload = strip_code_fences(&content);
        serde_json::from_str(payload)
            .map_err(|e| OpenRouterError::Malformed(format!("{e}: {payload}")))
    }
}

/// Some models wrap JSON output in a markdown code fence even when a schema
/// was requested. Unwrap ```json ... ``` blocks before parsing.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop a language tag like "json" on the opening fence line.
    match rest.split_once('\n') {
        Some((first, body)) if !first.trim_start().starts_with('{') => body.trim(),
        _ => rest.trim(),
    }
}
