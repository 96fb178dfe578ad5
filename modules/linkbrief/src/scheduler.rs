use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::error::Result;
use crate::pipeline::ItemPipeline;
use crate::store::ResultStore;
use crate::types::{RecordStatus, RunStats, WorkItem};

/// Outcome of one run over the pending set.
#[derive(Debug, Clone, Copy)]
pub struct RunReport {
    pub stats: RunStats,
    /// Items left undispatched because shutdown was requested.
    pub not_dispatched: usize,
}

impl RunReport {
    pub fn interrupted(&self) -> bool {
        self.not_dispatched > 0
    }
}

/// Runs the item pipeline over all pending items with bounded concurrency.
///
/// Each completed record is written to the store as soon as it is ready, not
/// batched at the end: interrupting the process loses only in-flight items.
pub struct Scheduler {
    pipeline: Arc<ItemPipeline>,
    store: Arc<ResultStore>,
    concurrency: usize,
    shutdown: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn new(
        pipeline: Arc<ItemPipeline>,
        store: Arc<ResultStore>,
        concurrency: usize,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            pipeline,
            store,
            concurrency: concurrency.max(1),
            shutdown,
        }
    }

    /// Process every item exactly once. Completion order is unconstrained:
    /// first finished, first written.
    pub async fn run(&self, items: Vec<WorkItem>) -> Result<RunReport> {
        info!(
            pending = items.len(),
            concurrency = self.concurrency,
            "Dispatching pipeline"
        );

        let outcomes: Vec<Result<Option<RecordStatus>>> =
            stream::iter(items.into_iter().map(|item| {
                let pipeline = Arc::clone(&self.pipeline);
                let store = Arc::clone(&self.store);
                let shutdown = Arc::clone(&self.shutdown);
                async move {
                    if shutdown.load(Ordering::Relaxed) {
                        debug!(url = item.url, "Shutdown requested, leaving item for next run");
                        return Ok(None);
                    }

                    let record = pipeline.process(&item).await;
                    let status = record.status;
                    // A store failure here is fatal for the run: losing
                    // completed work silently is worse than aborting.
                    store.upsert(&record)?;
                    info!(url = item.url, status = %status, "Item resolved");
                    Ok(Some(status))
                }
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut stats = RunStats::default();
        let mut not_dispatched = 0usize;
        for outcome in outcomes {
            match outcome? {
                Some(status) => stats.record(status),
                None => not_dispatched += 1,
            }
        }

        if not_dispatched > 0 {
            info!(not_dispatched, "Run stopped early by shutdown request");
        }

        Ok(RunReport {
            stats,
            not_dispatched,
        })
    }
}
