use anyhow::Result;
use tracing::warn;

use crate::fetcher::ContentFetcher;
use crate::summarizer::RelevanceSummarizer;
use crate::types::{FetchStatus, IndexRecord, WorkItem};

/// Per-item orchestration: fetch, then judge, then map the outcome to one
/// index record. No caching of its own.
pub struct ItemPipeline {
    fetcher: ContentFetcher,
    summarizer: RelevanceSummarizer,
}

impl ItemPipeline {
    pub fn new(fetcher: ContentFetcher, summarizer: RelevanceSummarizer) -> Self {
        Self {
            fetcher,
            summarizer,
        }
    }

    /// Run one item to a terminal record.
    ///
    /// Infallible by design: every error from either stage is caught here and
    /// becomes a failed record, so a single item can never abort the batch.
    pub async fn process(&self, item: &WorkItem) -> IndexRecord {
        match self.run_stages(item).await {
            Ok(record) => record,
            Err(e) => {
                warn!(url = item.url, error = format!("{e:#}"), "Item failed");
                IndexRecord::failed(item, format!("{e:#}"))
            }
        }
    }

    async fn run_stages(&self, item: &WorkItem) -> Result<IndexRecord> {
        let fetched = self.fetcher.fetch(&item.url).await?;

        match fetched.status {
            // Fetch errors prove nothing about the content: failed, retryable.
            FetchStatus::Error => Ok(IndexRecord::failed(
                item,
                fetched
                    .error
                    .unwrap_or_else(|| "page fetch failed".to_string()),
            )),
            // An empty page is a permanent content issue: skipped, settled.
            FetchStatus::Empty => Ok(IndexRecord::skipped(item)),
            FetchStatus::Ok => {
                let judgment = self
                    .summarizer
                    .judge(&item.url, &fetched.raw_text, &item.label)
                    .await?;
                if judgment.is_meaningful {
                    Ok(IndexRecord::done(item, judgment.summary))
                } else {
                    Ok(IndexRecord::skipped(item))
                }
            }
        }
    }
}
