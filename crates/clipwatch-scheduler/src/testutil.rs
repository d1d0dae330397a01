//! In-memory doubles for scheduler tests: one shared store implementing
//! every store contract, plus scripted collaborators that record calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use clipwatch_core::error::{ClipwatchError, Result};
use clipwatch_core::traits::{
    AlertHandler, ClipStore, CrawlExecutor, EventSink, MentionAnalyzer, MentionStore,
    ProfileStore, SourceStore,
};
use clipwatch_core::types::{
    Clip, CrawlOutcome, Mention, MentionGroup, MentionStatus, Profile, Source, RunEvent,
    Tier, Urgency, Verdict,
};

/// A profile with a chosen ID (the generated UUIDs get in the way of
/// assertions).
pub fn profile_with_id(id: &str, group_id: Option<&str>, active: bool) -> Profile {
    Profile {
        id: id.to_string(),
        name: id.to_string(),
        group_id: group_id.map(|g| g.to_string()),
        active,
    }
}

/// In-memory backing store with scriptable failures.
#[derive(Default)]
pub struct MemStore {
    pub sources: Mutex<Vec<Source>>,
    pub profiles: Mutex<Vec<Profile>>,
    pub mentions: Mutex<Vec<Mention>>,
    pub clips: Mutex<Vec<Clip>>,
    /// When set, list-shaped reads fail (discovery fault injection).
    pub fail_discovery: AtomicBool,
    /// When set, `list_active` fails while mention reads keep working.
    pub fail_profile_list: AtomicBool,
    /// Mention IDs whose claim is "stolen": the conditional update loses as
    /// if another worker claimed between fetch and claim.
    pub steal_on_claim: Mutex<Vec<String>>,
    /// Profile IDs whose clip expiry errors.
    pub clip_fail_profiles: Mutex<Vec<String>>,
}

impl MemStore {
    pub async fn push_source(&self, source: Source) {
        self.sources.lock().await.push(source);
    }

    pub async fn push_profile(&self, profile: Profile) {
        self.profiles.lock().await.push(profile);
    }

    pub async fn push_mention(&self, mention: Mention) {
        self.mentions.lock().await.push(mention);
    }

    pub async fn push_clip(&self, clip: Clip) {
        self.clips.lock().await.push(clip);
    }

    pub async fn mention(&self, id: &str) -> Mention {
        self.mentions
            .lock()
            .await
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .expect("mention exists")
    }

    pub async fn source(&self, id: &str) -> Source {
        self.sources
            .lock()
            .await
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .expect("source exists")
    }
}

#[async_trait]
impl SourceStore for MemStore {
    async fn find_due(&self, tier: Tier, now: DateTime<Utc>) -> Result<Vec<Source>> {
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(ClipwatchError::Store("scripted discovery failure".into()));
        }
        Ok(self
            .sources
            .lock()
            .await
            .iter()
            .filter(|s| s.tier == tier && s.is_due(now))
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Source>> {
        Ok(self.sources.lock().await.iter().find(|s| s.id == id).cloned())
    }

    async fn record_success(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let mut sources = self.sources.lock().await;
        if let Some(source) = sources.iter_mut().find(|s| s.id == id) {
            source.last_run_at = Some(now);
            source.last_status = Some(clipwatch_core::types::RunStatus::Ok);
            source.last_error = None;
            source.consecutive_failures = 0;
        }
        Ok(())
    }

    async fn record_failure(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<()> {
        let mut sources = self.sources.lock().await;
        if let Some(source) = sources.iter_mut().find(|s| s.id == id) {
            source.last_run_at = Some(now);
            source.last_status = Some(clipwatch_core::types::RunStatus::Failed);
            source.last_error = Some(error.to_string());
            source.consecutive_failures += 1;
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        Ok(self.profiles.lock().await.iter().find(|p| p.id == id).cloned())
    }

    async fn first_active_in_group(&self, group_id: &str) -> Result<Option<Profile>> {
        Ok(self
            .profiles
            .lock()
            .await
            .iter()
            .find(|p| p.active && p.group_id.as_deref() == Some(group_id))
            .cloned())
    }

    async fn list_active(&self) -> Result<Vec<Profile>> {
        if self.fail_profile_list.load(Ordering::SeqCst) {
            return Err(ClipwatchError::Store("scripted profile-list failure".into()));
        }
        Ok(self
            .profiles
            .lock()
            .await
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MentionStore for MemStore {
    async fn fetch_pending_grouped(&self, limit: u32) -> Result<Vec<MentionGroup>> {
        if self.fail_discovery.load(Ordering::SeqCst) {
            return Err(ClipwatchError::Store("scripted discovery failure".into()));
        }
        let mentions = self.mentions.lock().await;
        let mut groups: Vec<MentionGroup> = Vec::new();
        for mention in mentions.iter().filter(|m| m.status == MentionStatus::Pending) {
            if let Some(group) = groups.iter_mut().find(|g| g.post_key == mention.post_key) {
                group.mentions.push(mention.clone());
            } else if (groups.len() as u32) < limit {
                groups.push(MentionGroup {
                    post_key: mention.post_key.clone(),
                    mentions: vec![mention.clone()],
                });
            }
        }
        Ok(groups)
    }

    async fn claim(&self, id: &str, worker: &str) -> Result<Option<Mention>> {
        if self.steal_on_claim.lock().await.iter().any(|s| s == id) {
            return Ok(None);
        }
        let mut mentions = self.mentions.lock().await;
        let Some(mention) = mentions.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        if mention.status != MentionStatus::Pending {
            return Ok(None);
        }
        mention.status = MentionStatus::Claimed;
        mention.claimed_by = Some(worker.to_string());
        mention.claimed_at = Some(Utc::now());
        Ok(Some(mention.clone()))
    }

    async fn release(&self, id: &str) -> Result<()> {
        let mut mentions = self.mentions.lock().await;
        if let Some(mention) = mentions.iter_mut().find(|m| m.id == id) {
            mention.status = MentionStatus::Pending;
            mention.claimed_by = None;
            mention.claimed_at = None;
        }
        Ok(())
    }

    async fn set_status(&self, id: &str, status: MentionStatus) -> Result<()> {
        let mut mentions = self.mentions.lock().await;
        if let Some(mention) = mentions.iter_mut().find(|m| m.id == id) {
            mention.status = status;
        }
        Ok(())
    }

    async fn fetch_pending(&self, limit: u32) -> Result<Vec<Mention>> {
        Ok(self
            .mentions
            .lock()
            .await
            .iter()
            .filter(|m| m.status == MentionStatus::Pending)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn mark_expired(&self, id: &str) -> Result<()> {
        let mut mentions = self.mentions.lock().await;
        if let Some(mention) = mentions
            .iter_mut()
            .find(|m| m.id == id && m.status == MentionStatus::Pending)
        {
            mention.status = MentionStatus::Expired;
        }
        Ok(())
    }
}

#[async_trait]
impl ClipStore for MemStore {
    async fn expire_older_than(&self, profile_id: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        if self
            .clip_fail_profiles
            .lock()
            .await
            .iter()
            .any(|p| p == profile_id)
        {
            return Err(ClipwatchError::Store("scripted clip failure".into()));
        }
        let mut clips = self.clips.lock().await;
        let before = clips.len();
        clips.retain(|c| c.profile_id != profile_id || c.expires_at > cutoff);
        Ok((before - clips.len()) as u64)
    }
}

/// Crawl executor recording `(source_id, profile_id)` per invocation.
#[derive(Default)]
pub struct ScriptedExecutor {
    pub calls: Mutex<Vec<(String, String)>>,
    /// Sources whose crawl returns `success: false`.
    pub fail_sources: Mutex<Vec<String>>,
    /// Sources whose crawl returns `Err` (transport fault).
    pub err_sources: Mutex<Vec<String>>,
    pub mentions_per_crawl: u32,
}

#[async_trait]
impl CrawlExecutor for ScriptedExecutor {
    async fn run(&self, source: &Source, profile: &Profile) -> Result<CrawlOutcome> {
        self.calls
            .lock()
            .await
            .push((source.id.clone(), profile.id.clone()));
        if self.err_sources.lock().await.iter().any(|s| *s == source.id) {
            return Err(ClipwatchError::Crawl("scripted transport fault".into()));
        }
        if self.fail_sources.lock().await.iter().any(|s| *s == source.id) {
            return Ok(CrawlOutcome {
                success: false,
                mentions_found: 0,
                error: Some("scripted crawl failure".into()),
                duration_ms: 5,
            });
        }
        Ok(CrawlOutcome {
            success: true,
            mentions_found: self.mentions_per_crawl,
            error: None,
            duration_ms: 5,
        })
    }
}

/// Analyzer recording the profile order it was invoked in.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    pub calls: Mutex<Vec<String>>,
    /// Profiles whose mentions are rejected.
    pub reject_profiles: Mutex<Vec<String>>,
    /// Profiles whose mentions come back urgent.
    pub urgent_profiles: Mutex<Vec<String>>,
    /// Profiles whose evaluation errors.
    pub fail_profiles: Mutex<Vec<String>>,
}

#[async_trait]
impl MentionAnalyzer for ScriptedAnalyzer {
    async fn evaluate(&self, mention: &Mention, profile: &Profile) -> Result<Verdict> {
        self.calls.lock().await.push(profile.id.clone());
        if self.fail_profiles.lock().await.iter().any(|p| *p == profile.id) {
            return Err(ClipwatchError::Analysis(format!(
                "scripted analysis failure for {}",
                mention.id
            )));
        }
        let accept = !self.reject_profiles.lock().await.iter().any(|p| *p == profile.id);
        let urgent = self.urgent_profiles.lock().await.iter().any(|p| *p == profile.id);
        Ok(Verdict {
            accept,
            urgency: if urgent { Urgency::Urgent } else { Urgency::Normal },
        })
    }
}

/// Alert handler recording mention IDs; optionally failing.
#[derive(Default)]
pub struct RecordingAlerts {
    pub calls: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl AlertHandler for RecordingAlerts {
    async fn handle(&self, mention: &Mention, _profile: &Profile) -> Result<()> {
        self.calls.lock().await.push(mention.id.clone());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClipwatchError::Alert("scripted alert failure".into()));
        }
        Ok(())
    }
}

/// Event sink that drops everything.
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, _event: RunEvent) -> Result<()> {
        Ok(())
    }
}

/// Shorthand for the Arc'd doubles every test wires up.
pub fn arc<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
