//! Data model — sources, mentions, clips, profiles, and run summaries.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

// ─── Cadence tiers ──────────────────────────────────────

/// Crawl cadence tier. Every source belongs to exactly one tier; each tier
/// runs on its own timer, independent of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    /// Every 5 minutes.
    M5,
    /// Every 10 minutes.
    M10,
    /// Every 15 minutes.
    M15,
    /// Every 30 minutes.
    M30,
    /// Every 60 minutes.
    M60,
}

impl Tier {
    /// All tiers, in ascending interval order.
    pub const ALL: [Tier; 5] = [Tier::M5, Tier::M10, Tier::M15, Tier::M30, Tier::M60];

    /// Tier interval in minutes.
    pub fn minutes(&self) -> i64 {
        match self {
            Tier::M5 => 5,
            Tier::M10 => 10,
            Tier::M15 => 15,
            Tier::M30 => 30,
            Tier::M60 => 60,
        }
    }

    /// Tier interval as a chrono duration.
    pub fn interval(&self) -> Duration {
        Duration::minutes(self.minutes())
    }

    /// Parse from a minute count (5/10/15/30/60).
    pub fn from_minutes(minutes: i64) -> Option<Tier> {
        Tier::ALL.into_iter().find(|t| t.minutes() == minutes)
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}m", self.minutes())
    }
}

// ─── Sources ──────────────────────────────────────

/// What a source is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum SourceScope {
    /// Bound to a single watch profile.
    Profile(String),
    /// Pooled across a profile group. Currently resolved to the group's
    /// first active profile only (see the crawl orchestrator).
    Group(String),
    /// Broader scopes are not supported — the source is skipped.
    Global,
}

/// Outcome of the most recent crawl attempt, persisted on the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Failed,
}

/// A monitored source: a feed, page, or account crawled on a cadence tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Unique source ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// What this source is bound to.
    pub scope: SourceScope,
    /// Crawl cadence.
    pub tier: Tier,
    /// Whether the source participates in scheduling.
    pub active: bool,
    /// Last attempt timestamp (None = never crawled).
    pub last_run_at: Option<DateTime<Utc>>,
    /// Outcome of the last attempt.
    pub last_status: Option<RunStatus>,
    /// Error message of the last failed attempt.
    pub last_error: Option<String>,
    /// Consecutive failed attempts; reset to 0 on success.
    pub consecutive_failures: u32,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

impl Source {
    /// Create a source bound to a single profile.
    pub fn for_profile(name: &str, profile_id: &str, tier: Tier) -> Self {
        Self::new(name, SourceScope::Profile(profile_id.to_string()), tier)
    }

    /// Create a source pooled across a profile group.
    pub fn for_group(name: &str, group_id: &str, tier: Tier) -> Self {
        Self::new(name, SourceScope::Group(group_id.to_string()), tier)
    }

    fn new(name: &str, scope: SourceScope, tier: Tier) -> Self {
        Self {
            id: format!("src-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            scope,
            tier,
            active: true,
            last_run_at: None,
            last_status: None,
            last_error: None,
            consecutive_failures: 0,
            created_at: Utc::now(),
        }
    }

    /// Whether this source is due for a new attempt at `now`.
    /// A source that has never run counts as due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        match self.last_run_at {
            Some(last) => now - last >= self.tier.interval(),
            None => true,
        }
    }
}

// ─── Profiles ──────────────────────────────────────

/// A watch profile — the consumer a mention is detected for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Unique profile ID.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Group this profile belongs to, if any.
    pub group_id: Option<String>,
    /// Whether the profile receives new mentions.
    pub active: bool,
}

impl Profile {
    /// Create an active profile, optionally in a group.
    pub fn new(name: &str, group_id: Option<&str>) -> Self {
        Self {
            id: format!("prof-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            group_id: group_id.map(|g| g.to_string()),
            active: true,
        }
    }
}

// ─── Mentions (claimable work items) ──────────────────────────────────────

/// Mention lifecycle. `Accepted`/`Rejected` are terminal; `Expired` is set by
/// the sweeper on stale pending mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionStatus {
    Pending,
    Claimed,
    Accepted,
    Rejected,
    Expired,
}

impl MentionStatus {
    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            MentionStatus::Pending => "pending",
            MentionStatus::Claimed => "claimed",
            MentionStatus::Accepted => "accepted",
            MentionStatus::Rejected => "rejected",
            MentionStatus::Expired => "expired",
        }
    }

    /// Parse from the storage representation.
    pub fn parse(s: &str) -> Option<MentionStatus> {
        match s {
            "pending" => Some(MentionStatus::Pending),
            "claimed" => Some(MentionStatus::Claimed),
            "accepted" => Some(MentionStatus::Accepted),
            "rejected" => Some(MentionStatus::Rejected),
            "expired" => Some(MentionStatus::Expired),
            _ => None,
        }
    }
}

/// A detected mention: one claimable unit of analysis work, for one profile.
///
/// Mentions produced from the same upstream post share a `post_key` — the
/// claimer processes one post's mentions across all interested profiles
/// before moving to the next post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Unique mention ID.
    pub id: String,
    /// Correlation key: the upstream post/article this mention came from.
    pub post_key: String,
    /// Profile this mention was detected for.
    pub profile_id: String,
    /// Extracted text handed to the analyzer.
    pub snippet: String,
    /// Lifecycle state. `Claimed` implies `claimed_by` is set.
    pub status: MentionStatus,
    /// Worker token holding the claim (diagnostic traceability only).
    pub claimed_by: Option<String>,
    /// When the claim was taken.
    pub claimed_at: Option<DateTime<Utc>>,
    /// When the crawl detected this mention.
    pub detected_at: DateTime<Utc>,
}

impl Mention {
    /// Create a fresh pending mention.
    pub fn new(post_key: &str, profile_id: &str, snippet: &str) -> Self {
        Self {
            id: format!("men-{}", uuid::Uuid::new_v4()),
            post_key: post_key.to_string(),
            profile_id: profile_id.to_string(),
            snippet: snippet.to_string(),
            status: MentionStatus::Pending,
            claimed_by: None,
            claimed_at: None,
            detected_at: Utc::now(),
        }
    }
}

/// Pending mentions from one upstream post, in discovery order.
#[derive(Debug, Clone)]
pub struct MentionGroup {
    /// Shared correlation key.
    pub post_key: String,
    /// The group's mentions, one per interested profile.
    pub mentions: Vec<Mention>,
}

// ─── Clips (TTL-bearing derived artifacts) ──────────────────────────────────────

/// A derived clip produced from an accepted mention. Lives until
/// `expires_at`, then the sweeper expires it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clip {
    /// Unique clip ID.
    pub id: String,
    /// Profile the clip belongs to.
    pub profile_id: String,
    /// Expiry deadline (inclusive: `expires_at <= now` expires).
    pub expires_at: DateTime<Utc>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

// ─── Collaborator payloads ──────────────────────────────────────

/// Result of one crawl executor invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOutcome {
    /// Whether the crawl succeeded.
    pub success: bool,
    /// Mentions produced by this crawl.
    pub mentions_found: u32,
    /// Error detail when `success` is false.
    pub error: Option<String>,
    /// Wall-clock crawl duration.
    pub duration_ms: u64,
}

/// How urgently an accepted mention needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Urgent,
}

/// Analyzer verdict for one mention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    /// Keep (accepted) or discard (rejected).
    pub accept: bool,
    /// Urgent verdicts take the fast path.
    pub urgency: Urgency,
}

// ─── Run summaries ──────────────────────────────────────

/// Aggregate result of one tier cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Due sources considered.
    pub total: u32,
    /// Sources whose crawl succeeded.
    pub successful: u32,
    /// Sources whose crawl failed.
    pub failed: u32,
    /// Sources skipped (gate denial or unsupported scope).
    pub skipped: u32,
    /// Mentions produced across all crawls.
    pub mentions_found: u32,
}

/// Aggregate result of one claim cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSummary {
    /// Groups fetched.
    pub groups: u32,
    /// Mentions considered.
    pub total: u32,
    /// Claims won.
    pub claimed: u32,
    /// Claims lost to another worker (expected under concurrent runners).
    pub contended: u32,
    /// Mentions accepted.
    pub accepted: u32,
    /// Mentions rejected.
    pub rejected: u32,
    /// Analyses that failed; their claims were released.
    pub failed: u32,
}

/// Aggregate result of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    /// Clips expired in pass (a).
    pub clips_expired: u64,
    /// Stale pending mentions expired in pass (b).
    pub mentions_expired: u64,
    /// Per-target/per-item errors tolerated during the sweep.
    pub errors: u32,
}

/// Fire-and-forget observability event.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    CycleFinished { tier: Tier, summary: CycleSummary },
    SourceCrawled { source_id: String, success: bool },
    ClaimFinished { worker: String, summary: ClaimSummary },
    UrgentAlerted { mention_id: String },
    SweepFinished { summary: SweepSummary },
}
