//! Crawl orchestrator — resolves a source to a profile, runs the external
//! crawler through the backpressure gate, and writes health back.
//!
//! The source's health fields are mutated exactly once per attempt, here and
//! nowhere else. Executor errors never propagate; they become a failed
//! attempt on the source.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use clipwatch_core::error::Result;
use clipwatch_core::traits::{CrawlExecutor, EventSink, ProfileStore, SourceStore};
use clipwatch_core::types::{Profile, RunEvent, Source, SourceScope};

use crate::gate::{Admission, BackpressureGate, DenyReason};

/// Outcome of one orchestrated crawl attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlResult {
    /// The crawl ran and succeeded.
    Succeeded { mentions_found: u32 },
    /// The crawl ran (or was attempted) and failed; health was updated.
    Failed,
    /// Nothing ran: gate denial or unsupported scope. Health untouched.
    Skipped,
}

/// Orchestrates one source's crawl attempt end to end.
pub struct CrawlOrchestrator {
    sources: Arc<dyn SourceStore>,
    profiles: Arc<dyn ProfileStore>,
    executor: Arc<dyn CrawlExecutor>,
    gate: Arc<BackpressureGate>,
    sink: Arc<dyn EventSink>,
}

impl CrawlOrchestrator {
    pub fn new(
        sources: Arc<dyn SourceStore>,
        profiles: Arc<dyn ProfileStore>,
        executor: Arc<dyn CrawlExecutor>,
        gate: Arc<BackpressureGate>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            sources,
            profiles,
            executor,
            gate,
            sink,
        }
    }

    /// Run one crawl attempt for `source`. Store errors on the resolution
    /// path surface as `Err`; crawl failures are absorbed into `Failed`.
    pub async fn crawl_source(&self, source: &Source, now: DateTime<Utc>) -> Result<CrawlResult> {
        let profile = match self.resolve_profile(source).await? {
            Resolution::Resolved(profile) => profile,
            Resolution::Unsupported => {
                debug!("Source '{}' has unsupported global scope, skipping", source.name);
                return Ok(CrawlResult::Skipped);
            }
            Resolution::Unresolvable(error) => {
                warn!("⚠️ Source '{}': {}", source.name, error);
                self.sources
                    .record_failure(&source.id, &error, Utc::now())
                    .await?;
                return Ok(CrawlResult::Failed);
            }
        };

        match self.gate.can_start(source, now) {
            Admission::Allowed => {}
            Admission::Denied(DenyReason::InFlight) => {
                debug!("⏳ Source '{}' already in flight, skipping", source.name);
                return Ok(CrawlResult::Skipped);
            }
            Admission::Denied(DenyReason::Backoff { retry_at }) => {
                debug!(
                    "⏳ Source '{}' backing off ({} failures), retry at {}",
                    source.name, source.consecutive_failures, retry_at
                );
                return Ok(CrawlResult::Skipped);
            }
        }

        // Matched pair around the executor call: complete runs on every path.
        self.gate.record_start(&source.id);
        let crawl = self.executor.run(source, &profile).await;
        self.gate.record_complete(&source.id);

        let result = match crawl {
            Ok(outcome) if outcome.success => {
                self.sources.record_success(&source.id, Utc::now()).await?;
                debug!(
                    "🕷️ Source '{}' crawled: {} mentions in {}ms",
                    source.name, outcome.mentions_found, outcome.duration_ms
                );
                CrawlResult::Succeeded {
                    mentions_found: outcome.mentions_found,
                }
            }
            Ok(outcome) => {
                let error = outcome.error.unwrap_or_else(|| "crawl failed".to_string());
                warn!("⚠️ Source '{}' crawl failed: {}", source.name, error);
                self.sources
                    .record_failure(&source.id, &error, Utc::now())
                    .await?;
                CrawlResult::Failed
            }
            Err(e) => {
                warn!("⚠️ Source '{}' crawl errored: {}", source.name, e);
                self.sources
                    .record_failure(&source.id, &e.to_string(), Utc::now())
                    .await?;
                CrawlResult::Failed
            }
        };

        let event = RunEvent::SourceCrawled {
            source_id: source.id.clone(),
            success: matches!(result, CrawlResult::Succeeded { .. }),
        };
        if let Err(e) = self.sink.emit(event).await {
            debug!("Event sink dropped SourceCrawled: {e}");
        }
        Ok(result)
    }

    /// Resolve the source's scope to a concrete profile.
    ///
    /// Group scope resolves to the group's *first* active profile only —
    /// inherited behavior, not a deliberate fan-out. Broader scopes are
    /// unsupported and skipped without touching health.
    async fn resolve_profile(&self, source: &Source) -> Result<Resolution> {
        match &source.scope {
            SourceScope::Profile(profile_id) => {
                match self.profiles.find_by_id(profile_id).await? {
                    Some(profile) => Ok(Resolution::Resolved(profile)),
                    None => Ok(Resolution::Unresolvable(format!(
                        "profile {profile_id} not found"
                    ))),
                }
            }
            SourceScope::Group(group_id) => {
                match self.profiles.first_active_in_group(group_id).await? {
                    Some(profile) => Ok(Resolution::Resolved(profile)),
                    None => Ok(Resolution::Unresolvable(format!(
                        "no active profile in group {group_id}"
                    ))),
                }
            }
            SourceScope::Global => Ok(Resolution::Unsupported),
        }
    }
}

enum Resolution {
    Resolved(Profile),
    Unresolvable(String),
    Unsupported,
}
