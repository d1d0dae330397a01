//! Expiration sweeper — two independent best-effort passes.
//!
//! Pass (a) expires clips whose `expires_at` has been reached (inclusive),
//! batched per active profile. Pass (b) expires mentions stuck in pending
//! longer than the TTL, marked individually. An error on one profile or one
//! mention is counted and the sweep continues; nothing here is
//! all-or-nothing.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use clipwatch_core::traits::{ClipStore, MentionStore, ProfileStore};
use clipwatch_core::types::SweepSummary;

/// Sweeps TTL-expired clips and stale pending mentions.
pub struct ExpirationSweeper {
    profiles: Arc<dyn ProfileStore>,
    clips: Arc<dyn ClipStore>,
    mentions: Arc<dyn MentionStore>,
    pending_ttl: Duration,
    batch_limit: u32,
}

impl ExpirationSweeper {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        clips: Arc<dyn ClipStore>,
        mentions: Arc<dyn MentionStore>,
        pending_ttl_hours: u64,
        batch_limit: u32,
    ) -> Self {
        Self {
            profiles,
            clips,
            mentions,
            pending_ttl: Duration::hours(pending_ttl_hours as i64),
            batch_limit,
        }
    }

    /// Run both passes once. Infallible by design: partial failures are
    /// counted in the summary, never raised.
    pub async fn sweep(&self, now: DateTime<Utc>) -> SweepSummary {
        let mut summary = SweepSummary::default();
        self.sweep_clips(now, &mut summary).await;
        self.sweep_stale_mentions(now, &mut summary).await;

        if summary.clips_expired > 0 || summary.mentions_expired > 0 || summary.errors > 0 {
            info!(
                "🧹 Sweep: {} clips expired, {} stale mentions expired, {} errors",
                summary.clips_expired, summary.mentions_expired, summary.errors
            );
        }
        summary
    }

    /// Pass (a): expire clips per active profile, `expires_at <= now`.
    async fn sweep_clips(&self, now: DateTime<Utc>, summary: &mut SweepSummary) {
        let profiles = match self.profiles.list_active().await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("⚠️ Sweep: failed to list profiles, skipping clip pass: {e}");
                summary.errors += 1;
                return;
            }
        };
        for profile in &profiles {
            match self.clips.expire_older_than(&profile.id, now).await {
                Ok(expired) => {
                    if expired > 0 {
                        debug!("🧹 Expired {} clip(s) for profile '{}'", expired, profile.name);
                    }
                    summary.clips_expired += expired;
                }
                Err(e) => {
                    warn!("⚠️ Sweep: clip expiry failed for profile '{}': {e}", profile.name);
                    summary.errors += 1;
                }
            }
        }
    }

    /// Pass (b): expire mentions stuck in pending longer than the TTL.
    async fn sweep_stale_mentions(&self, now: DateTime<Utc>, summary: &mut SweepSummary) {
        let candidates = match self.mentions.fetch_pending(self.batch_limit).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("⚠️ Sweep: failed to fetch pending mentions: {e}");
                summary.errors += 1;
                return;
            }
        };
        let cutoff = now - self.pending_ttl;
        for mention in candidates.iter().filter(|m| m.detected_at <= cutoff) {
            match self.mentions.mark_expired(&mention.id).await {
                Ok(()) => summary.mentions_expired += 1,
                Err(e) => {
                    warn!("⚠️ Sweep: failed to expire mention {}: {e}", mention.id);
                    summary.errors += 1;
                }
            }
        }
    }
}
