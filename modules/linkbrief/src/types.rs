use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One requested unit of work: a URL plus its free-text label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
    pub label: String,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            label: label.into(),
        }
    }
}

/// Outcome classification for a page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    Ok,
    Empty,
    Error,
}

/// Cached output of the content fetcher. Immutable once written: a URL that
/// has a cache entry is never fetched again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub url: String,
    pub raw_text: String,
    pub fetched_at: DateTime<Utc>,
    pub status: FetchStatus,
    /// Collaborator error text, present only when `status` is `Error`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cached output of the relevance summarizer. Only well-formed judgments are
/// written, so a malformed or failed judgment is retried on a later run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgmentResult {
    pub url: String,
    pub is_meaningful: bool,
    /// Exactly three sentences when `is_meaningful`, otherwise empty.
    pub summary: String,
    pub judged_at: DateTime<Utc>,
}

/// Terminal status of an index row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Done,
    SkippedNotMeaningful,
    Failed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Done => "done",
            RecordStatus::SkippedNotMeaningful => "skipped_not_meaningful",
            RecordStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "done" => Some(RecordStatus::Done),
            "skipped_not_meaningful" => Some(RecordStatus::SkippedNotMeaningful),
            "failed" => Some(RecordStatus::Failed),
            _ => None,
        }
    }

    /// Terminal across runs: the catalog never re-queues these.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            RecordStatus::Done | RecordStatus::SkippedNotMeaningful
        )
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the durable index; the unit of resumability.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub url: String,
    pub label: String,
    pub status: RecordStatus,
    /// Empty unless `status` is `Done`.
    pub summary: String,
    /// Present only when `status` is `Failed`.
    pub error_detail: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl IndexRecord {
    pub fn done(item: &WorkItem, summary: String) -> Self {
        Self {
            url: item.url.clone(),
            label: item.label.clone(),
            status: RecordStatus::Done,
            summary,
            error_detail: None,
            updated_at: Utc::now(),
        }
    }

    pub fn skipped(item: &WorkItem) -> Self {
        Self {
            url: item.url.clone(),
            label: item.label.clone(),
            status: RecordStatus::SkippedNotMeaningful,
            summary: String::new(),
            error_detail: None,
            updated_at: Utc::now(),
        }
    }

    pub fn failed(item: &WorkItem, detail: impl Into<String>) -> Self {
        Self {
            url: item.url.clone(),
            label: item.label.clone(),
            status: RecordStatus::Failed,
            summary: String::new(),
            error_detail: Some(detail.into()),
            updated_at: Utc::now(),
        }
    }
}

/// Counters for a completed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunStats {
    pub done: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl RunStats {
    pub fn record(&mut self, status: RecordStatus) {
        match status {
            RecordStatus::Done => self.done += 1,
            RecordStatus::SkippedNotMeaningful => self.skipped += 1,
            RecordStatus::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.done + self.skipped + self.failed
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} done, {} skipped, {} failed",
            self.done, self.skipped, self.failed
        )
    }
}
