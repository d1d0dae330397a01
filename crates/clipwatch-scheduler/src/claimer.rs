//! Mention claimer — the correctness-critical claim/analyze loop.
//!
//! Fetches pending mentions grouped by upstream post, claims each one
//! atomically through the store, and hands it to the analyzer. One post's
//! mentions are fully attempted across all interested profiles before the
//! next post starts, so a prolific post cannot starve a quieter one.
//!
//! Losing a claim to another worker is a normal outcome under concurrent
//! runner processes, not an error.

use std::sync::Arc;

use tracing::{debug, info, warn};

use clipwatch_core::error::Result;
use clipwatch_core::traits::{EventSink, MentionAnalyzer, MentionStore, ProfileStore};
use clipwatch_core::types::{ClaimSummary, Mention, MentionStatus, RunEvent, Urgency};

use crate::fastpath::FastPathRouter;

/// Claims and processes pending mentions in fair group order.
pub struct MentionClaimer {
    mentions: Arc<dyn MentionStore>,
    profiles: Arc<dyn ProfileStore>,
    analyzer: Arc<dyn MentionAnalyzer>,
    fastpath: FastPathRouter,
    sink: Arc<dyn EventSink>,
    /// Fresh token per runner instance; recorded on claims for traceability,
    /// plays no role in claim correctness.
    worker_id: String,
    batch_limit: u32,
}

impl MentionClaimer {
    pub fn new(
        mentions: Arc<dyn MentionStore>,
        profiles: Arc<dyn ProfileStore>,
        analyzer: Arc<dyn MentionAnalyzer>,
        fastpath: FastPathRouter,
        sink: Arc<dyn EventSink>,
        batch_limit: u32,
    ) -> Self {
        Self {
            mentions,
            profiles,
            analyzer,
            fastpath,
            sink,
            worker_id: format!("runner-{}", uuid::Uuid::new_v4()),
            batch_limit,
        }
    }

    /// This runner's worker token.
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// One claim cycle: fetch groups, claim and analyze every mention.
    /// A discovery failure aborts the cycle; everything after that is
    /// per-item isolated.
    pub async fn process_pending(&self) -> Result<ClaimSummary> {
        let groups = self.mentions.fetch_pending_grouped(self.batch_limit).await?;
        let mut summary = ClaimSummary {
            groups: groups.len() as u32,
            ..Default::default()
        };

        for group in &groups {
            debug!(
                "📋 Post '{}': {} pending mention(s)",
                group.post_key,
                group.mentions.len()
            );
            for mention in &group.mentions {
                summary.total += 1;
                self.process_one(mention, &mut summary).await;
            }
        }

        if summary.total > 0 {
            info!(
                "✅ Claim cycle [{}]: {}/{} claimed, {} accepted, {} rejected, {} failed, {} contended",
                self.worker_id,
                summary.claimed,
                summary.total,
                summary.accepted,
                summary.rejected,
                summary.failed,
                summary.contended
            );
        }
        let event = RunEvent::ClaimFinished {
            worker: self.worker_id.clone(),
            summary,
        };
        if let Err(e) = self.sink.emit(event).await {
            debug!("Event sink dropped ClaimFinished: {e}");
        }
        Ok(summary)
    }

    /// Claim and analyze one mention; all failures stay local to it.
    async fn process_one(&self, mention: &Mention, summary: &mut ClaimSummary) {
        let claimed = match self.mentions.claim(&mention.id, &self.worker_id).await {
            Ok(Some(claimed)) => claimed,
            Ok(None) => {
                // Another worker won the race. Expected, move on.
                debug!("Mention {} already claimed elsewhere", mention.id);
                summary.contended += 1;
                return;
            }
            Err(e) => {
                warn!("⚠️ Claim failed for mention {}: {}", mention.id, e);
                summary.failed += 1;
                return;
            }
        };
        summary.claimed += 1;

        let profile = match self.profiles.find_by_id(&claimed.profile_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                warn!(
                    "⚠️ Mention {} references missing profile {}, releasing",
                    claimed.id, claimed.profile_id
                );
                self.release_quietly(&claimed.id).await;
                summary.failed += 1;
                return;
            }
            Err(e) => {
                warn!("⚠️ Profile lookup failed for mention {}: {}", claimed.id, e);
                self.release_quietly(&claimed.id).await;
                summary.failed += 1;
                return;
            }
        };

        match self.analyzer.evaluate(&claimed, &profile).await {
            Ok(verdict) => {
                let status = if verdict.accept {
                    MentionStatus::Accepted
                } else {
                    MentionStatus::Rejected
                };
                if let Err(e) = self.mentions.set_status(&claimed.id, status).await {
                    warn!("⚠️ Status write failed for mention {}: {}", claimed.id, e);
                    self.release_quietly(&claimed.id).await;
                    summary.failed += 1;
                    return;
                }
                if verdict.accept {
                    summary.accepted += 1;
                } else {
                    summary.rejected += 1;
                }
                // Urgent accepted mentions bypass normal cadence. Whatever
                // happens in there, the verdict above already stands.
                if verdict.accept && verdict.urgency == Urgency::Urgent {
                    self.fastpath.route_urgent(&claimed, &profile).await;
                }
            }
            Err(e) => {
                warn!(
                    "⚠️ Analysis failed for mention {}, releasing for retry: {}",
                    claimed.id, e
                );
                self.release_quietly(&claimed.id).await;
                summary.failed += 1;
            }
        }
    }

    /// Release a claim back to pending so a later cycle can retry it.
    async fn release_quietly(&self, mention_id: &str) {
        if let Err(e) = self.mentions.release(mention_id).await {
            warn!("⚠️ Release failed for mention {}: {}", mention_id, e);
        }
    }
}
