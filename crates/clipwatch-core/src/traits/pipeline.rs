//! External collaborator contracts — crawling, analysis, alerting, telemetry.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CrawlOutcome, Mention, Profile, RunEvent, Source, Verdict};

/// The external ingestion service. One invocation crawls one source for one
/// resolved profile and enqueues any detected mentions.
#[async_trait]
pub trait CrawlExecutor: Send + Sync {
    /// Run one crawl attempt. Transport-level failures surface as `Err`;
    /// the orchestrator converts both `Err` and `success: false` outcomes
    /// into a failed attempt on the source.
    async fn run(&self, source: &Source, profile: &Profile) -> Result<CrawlOutcome>;
}

/// The external analysis service. Decides whether a claimed mention is a
/// real hit for the profile and how urgent it is.
#[async_trait]
pub trait MentionAnalyzer: Send + Sync {
    /// Evaluate one mention. An `Err` releases the claim for a later retry.
    async fn evaluate(&self, mention: &Mention, profile: &Profile) -> Result<Verdict>;
}

/// Expedited delivery for urgent mentions, outside normal cadence.
#[async_trait]
pub trait AlertHandler: Send + Sync {
    /// Deliver one urgent alert. Failures here are isolated by the fast
    /// path router and never affect the mention's primary outcome.
    async fn handle(&self, mention: &Mention, profile: &Profile) -> Result<()>;
}

/// Fire-and-forget observability side channel. Callers swallow errors.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emit one event. Must never block the primary flow for long.
    async fn emit(&self, event: RunEvent) -> Result<()>;
}
