//! Scheduler engine — per-tier cycles, the claim loop, and the sweep loop.
//!
//! Each tier ticks on its own tokio interval; within a cycle, due sources
//! are crawled sequentially. A cycle that finds its guard held returns a
//! zero summary immediately. Only discovery failures (no source list) abort
//! a cycle; everything per-source is isolated.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use clipwatch_core::config::SchedulerConfig;
use clipwatch_core::error::{ClipwatchError, Result};
use clipwatch_core::traits::{EventSink, SourceStore};
use clipwatch_core::types::{ClaimSummary, CycleSummary, RunEvent, SweepSummary, Tier};

use crate::claimer::MentionClaimer;
use crate::crawl::{CrawlOrchestrator, CrawlResult};
use crate::guard::{JobKey, RunGuard};
use crate::sweeper::ExpirationSweeper;

/// The scheduler engine — owns the guard and drives every periodic job.
pub struct SchedulerEngine {
    sources: Arc<dyn SourceStore>,
    crawler: CrawlOrchestrator,
    claimer: MentionClaimer,
    sweeper: ExpirationSweeper,
    guard: RunGuard,
    sink: Arc<dyn EventSink>,
}

impl SchedulerEngine {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        crawler: CrawlOrchestrator,
        claimer: MentionClaimer,
        sweeper: ExpirationSweeper,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            sources,
            crawler,
            claimer,
            sweeper,
            guard: RunGuard::new(),
            sink,
        }
    }

    /// Run one crawl cycle for `tier`.
    ///
    /// Guard held by a prior invocation: zero summary, immediately, no
    /// second execution. Failure to fetch the due list aborts the cycle.
    /// Everything else is counted and contained per source.
    pub async fn run_cycle(&self, tier: Tier) -> Result<CycleSummary> {
        let Some(_permit) = self.guard.try_acquire(JobKey::Tier(tier)) else {
            debug!("⏭️ Cycle {tier} already running, skipping");
            return Ok(CycleSummary::default());
        };

        let now = Utc::now();
        let due = self.sources.find_due(tier, now).await?;
        let mut summary = CycleSummary::default();

        for source in &due {
            summary.total += 1;
            match self.crawler.crawl_source(source, Utc::now()).await {
                Ok(CrawlResult::Succeeded { mentions_found }) => {
                    summary.successful += 1;
                    summary.mentions_found += mentions_found;
                }
                Ok(CrawlResult::Failed) => summary.failed += 1,
                Ok(CrawlResult::Skipped) => summary.skipped += 1,
                Err(e) => {
                    // Store hiccup on one source never aborts its siblings.
                    warn!("⚠️ Cycle {tier}: source '{}' errored: {e}", source.name);
                    summary.failed += 1;
                }
            }
        }

        if summary.total > 0 {
            info!(
                "🔄 Cycle {tier}: {}/{} ok, {} failed, {} skipped, {} mentions",
                summary.successful, summary.total, summary.failed, summary.skipped,
                summary.mentions_found
            );
        }
        let event = RunEvent::CycleFinished { tier, summary };
        if let Err(e) = self.sink.emit(event).await {
            debug!("Event sink dropped CycleFinished: {e}");
        }
        Ok(summary)
    }

    /// Manually crawl one source, bypassing the tier guard (diagnostic runs).
    pub async fn run_source(&self, source_id: &str) -> Result<CrawlResult> {
        let source = self
            .sources
            .find_by_id(source_id)
            .await?
            .ok_or_else(|| ClipwatchError::Store(format!("source {source_id} not found")))?;
        self.crawler.crawl_source(&source, Utc::now()).await
    }

    /// One guarded claim cycle.
    pub async fn run_claim_cycle(&self) -> Result<ClaimSummary> {
        let Some(_permit) = self.guard.try_acquire(JobKey::Claim) else {
            debug!("⏭️ Claim cycle already running, skipping");
            return Ok(ClaimSummary::default());
        };
        self.claimer.process_pending().await
    }

    /// One guarded sweep.
    pub async fn run_sweep(&self) -> SweepSummary {
        let Some(_permit) = self.guard.try_acquire(JobKey::Sweep) else {
            debug!("⏭️ Sweep already running, skipping");
            return SweepSummary::default();
        };
        let summary = self.sweeper.sweep(Utc::now()).await;
        let event = RunEvent::SweepFinished { summary };
        if let Err(e) = self.sink.emit(event).await {
            debug!("Event sink dropped SweepFinished: {e}");
        }
        summary
    }

    /// Current guard state per job (status endpoint / CLI).
    pub fn status(&self) -> Vec<(JobKey, bool)> {
        self.guard.status()
    }

    #[cfg(test)]
    pub(crate) fn guard(&self) -> &RunGuard {
        &self.guard
    }
}

/// Run every periodic loop until the process stops: one interval per tier,
/// plus the claim loop and the sweep loop.
pub async fn run_forever(engine: Arc<SchedulerEngine>, config: SchedulerConfig) {
    info!(
        "⏰ Scheduler started: tiers {:?}, claim every {}s, sweep every {}s",
        Tier::ALL.map(|t| t.to_string()),
        config.claim_interval_secs,
        config.sweep_interval_secs
    );

    for tier in Tier::ALL {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let period = std::time::Duration::from_secs(60 * tier.minutes() as u64);
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                if let Err(e) = engine.run_cycle(tier).await {
                    warn!("⚠️ Cycle {tier} aborted: {e}");
                }
            }
        });
    }

    {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(std::time::Duration::from_secs(config.claim_interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = engine.run_claim_cycle().await {
                    warn!("⚠️ Claim cycle aborted: {e}");
                }
            }
        });
    }

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(config.sweep_interval_secs));
    loop {
        interval.tick().await;
        engine.run_sweep().await;
    }
}
