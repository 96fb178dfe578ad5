use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{cache_key, CacheStore};
use crate::retry::{with_backoff, BackoffPolicy};
use crate::types::{FetchResult, FetchStatus};

/// Scraping collaborator seam (mockable in tests).
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String>;
}

#[async_trait]
impl PageFetcher for jina_client::JinaClient {
    async fn fetch_page(&self, url: &str) -> Result<String> {
        Ok(self.text(url).await?)
    }
}

fn transient_fetch_error(err: &anyhow::Error) -> bool {
    err.downcast_ref::<jina_client::JinaError>()
        .is_some_and(jina_client::JinaError::is_transient)
}

/// Cache-first page fetcher.
///
/// The cache is authoritative and immutable: a hit of any status (ok, empty,
/// error) is returned without touching the collaborator. Error results are
/// cached too, so a permanently-broken URL costs one network call ever;
/// re-fetching it means deleting the cache entry.
pub struct ContentFetcher {
    client: Arc<dyn PageFetcher>,
    cache: Arc<dyn CacheStore>,
    max_chars: usize,
    policy: BackoffPolicy,
}

impl ContentFetcher {
    pub fn new(client: Arc<dyn PageFetcher>, cache: Arc<dyn CacheStore>, max_chars: usize) -> Self {
        Self {
            client,
            cache,
            max_chars,
            policy: BackoffPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn fetch(&self, url: &str) -> crate::error::Result<FetchResult> {
        let key = cache_key(url);
        if let Some(raw) = self.cache.get(&key).await? {
            match serde_json::from_str::<FetchResult>(&raw) {
                Ok(cached) => {
                    debug!(url, status = ?cached.status, "Fetch cache hit");
                    return Ok(cached);
                }
                Err(e) => {
                    // Unreadable entry: refetch rather than fail the item.
                    warn!(url, error = %e, "Discarding unreadable fetch cache entry");
                }
            }
        }

        let result = self.fetch_uncached(url).await;
        let entry = serde_json::to_string(&result).map_err(anyhow::Error::from)?;
        self.cache.put(&key, &entry).await?;
        Ok(result)
    }

    async fn fetch_uncached(&self, url: &str) -> FetchResult {
        if let Err(e) = validate_url(url) {
            warn!(url, error = %e, "Rejected URL");
            return FetchResult {
                url: url.to_string(),
                raw_text: String::new(),
                fetched_at: Utc::now(),
                status: FetchStatus::Error,
                error: Some(e.to_string()),
            };
        }

        info!(url, "Fetching page");
        let fetched = with_backoff(self.policy, "fetch_page", transient_fetch_error, || {
            self.client.fetch_page(url)
        })
        .await;

        match fetched {
            Ok(text) => {
                let text = truncate_chars(&text, self.max_chars);
                if text.trim().is_empty() {
                    info!(url, "Empty page content");
                    FetchResult {
                        url: url.to_string(),
                        raw_text: String::new(),
                        fetched_at: Utc::now(),
                        status: FetchStatus::Empty,
                        error: None,
                    }
                } else {
                    info!(url, bytes = text.len(), "Fetched successfully");
                    FetchResult {
                        url: url.to_string(),
                        raw_text: text.into_owned(),
                        fetched_at: Utc::now(),
                        status: FetchStatus::Ok,
                        error: None,
                    }
                }
            }
            Err(e) => {
                warn!(url, error = format!("{e:#}"), "Page fetch failed");
                FetchResult {
                    url: url.to_string(),
                    raw_text: String::new(),
                    fetched_at: Utc::now(),
                    status: FetchStatus::Error,
                    error: Some(format!("{e:#}")),
                }
            }
        }
    }
}

fn validate_url(url: &str) -> Result<()> {
    let parsed = url::Url::parse(url)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("only http/https URLs allowed, got: {}", parsed.scheme());
    }
    Ok(())
}

/// Bound downstream cost: cut at `max_chars`, backing up to a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> std::borrow::Cow<'_, str> {
    if text.len() <= max_chars {
        return text.into();
    }
    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].into()
}
