//! Store contracts — the backing-store capabilities the scheduler consumes.
//!
//! The claim operation is the one place that needs storage-enforced mutual
//! exclusion across processes: `MentionStore::claim` must be a single
//! conditional update, never a read-then-write pair in application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{Mention, MentionGroup, MentionStatus, Profile, Source, Tier};

/// Read/write access to monitored sources and their health fields.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Active sources of `tier` whose last run is at least one tier interval
    /// in the past (never-run sources count as due).
    async fn find_due(&self, tier: Tier, now: DateTime<Utc>) -> Result<Vec<Source>>;

    /// Look up one source.
    async fn find_by_id(&self, id: &str) -> Result<Option<Source>>;

    /// Record a successful attempt: status ok, error cleared,
    /// consecutive_failures reset to 0, last_run_at set.
    async fn record_success(&self, id: &str, now: DateTime<Utc>) -> Result<()>;

    /// Record a failed attempt: status failed, error stored,
    /// consecutive_failures incremented, last_run_at set.
    async fn record_failure(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<()>;
}

/// Watch profile lookups used for scope resolution.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Look up one profile.
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>>;

    /// First active profile of a group, in insertion order.
    async fn first_active_in_group(&self, group_id: &str) -> Result<Option<Profile>>;

    /// All active profiles (sweeper iterates these for clip expiry).
    async fn list_active(&self) -> Result<Vec<Profile>>;
}

/// Claimable mention queue.
#[async_trait]
pub trait MentionStore: Send + Sync {
    /// Pending mentions grouped by post key, in discovery order, at most
    /// `limit` groups.
    async fn fetch_pending_grouped(&self, limit: u32) -> Result<Vec<MentionGroup>>;

    /// Atomically claim a pending mention for `worker`.
    ///
    /// Must be one indivisible storage operation that succeeds only while
    /// the mention is still pending. Returns the claimed mention, or `None`
    /// when another worker got there first — an expected outcome under
    /// concurrent runners, not an error.
    async fn claim(&self, id: &str, worker: &str) -> Result<Option<Mention>>;

    /// Release a claim: back to pending, claim fields cleared.
    async fn release(&self, id: &str) -> Result<()>;

    /// Move a mention to a new status (terminal transitions use this).
    async fn set_status(&self, id: &str, status: MentionStatus) -> Result<()>;

    /// Oldest pending mentions, ungrouped (sweeper candidates).
    async fn fetch_pending(&self, limit: u32) -> Result<Vec<Mention>>;

    /// Mark one mention expired.
    async fn mark_expired(&self, id: &str) -> Result<()>;
}

/// TTL expiry for derived clips.
#[async_trait]
pub trait ClipStore: Send + Sync {
    /// Expire the profile's clips with `expires_at <= cutoff` (inclusive).
    /// Returns how many were expired.
    async fn expire_older_than(&self, profile_id: &str, cutoff: DateTime<Utc>) -> Result<u64>;
}
