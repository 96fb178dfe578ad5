use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkbrief::cache::FsCache;
use linkbrief::catalog;
use linkbrief::fetcher::ContentFetcher;
use linkbrief::input;
use linkbrief::pipeline::ItemPipeline;
use linkbrief::scheduler::Scheduler;
use linkbrief::store::ResultStore;
use linkbrief::summarizer::{OpenRouterJudge, RelevanceSummarizer};
use linkbrief::Config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("linkbrief=info".parse()?))
        .init();

    info!("Linkbrief starting...");

    let config = Config::from_env();
    config.log_redacted();

    // Store or input problems are fatal; item problems never are.
    let store = Arc::new(ResultStore::open(&config.index_path)?);
    let existing = store.load()?;
    let requested = input::read_items(&config.input_path)?;
    let pending = catalog::pending_items(requested, &existing);

    info!(
        indexed = existing.len(),
        pending = pending.len(),
        "Work catalog ready"
    );

    if pending.is_empty() {
        info!("Nothing to do");
        return Ok(());
    }

    let fetch_cache = Arc::new(FsCache::open(config.cache_dir.join("sources"))?);
    let judgment_cache = Arc::new(FsCache::open(config.cache_dir.join("judgments"))?);

    let fetcher = ContentFetcher::new(
        Arc::new(jina_client::JinaClient::new(&config.jina_api_key)),
        fetch_cache,
        config.max_chars,
    );
    let judge = OpenRouterJudge::new(
        openrouter_client::OpenRouter::new(&config.openrouter_api_key)
            .with_app_name("linkbrief"),
        &config.model,
    );
    let summarizer = RelevanceSummarizer::new(Arc::new(judge), judgment_cache);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received; finishing in-flight items, dispatching no more");
                shutdown.store(true, Ordering::Relaxed);
            }
        });
    }

    let scheduler = Scheduler::new(
        Arc::new(ItemPipeline::new(fetcher, summarizer)),
        store,
        config.concurrency,
        shutdown,
    );

    let report = scheduler.run(pending).await?;
    info!("Run complete. {}", report.stats);

    if report.interrupted() {
        anyhow::bail!(
            "interrupted with {} items left unprocessed; rerun to resume",
            report.not_dispatched
        );
    }

    Ok(())
}
