//! SQLite store — sources, profiles, mentions, clips in one database.
//!
//! All timestamps are RFC3339 TEXT except `clips.expires_at`, which is unix
//! milliseconds so the expiry cutoff comparison happens inside SQL.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use clipwatch_core::error::{ClipwatchError, Result};
use clipwatch_core::traits::{ClipStore, MentionStore, ProfileStore, SourceStore};
use clipwatch_core::types::{
    Clip, Mention, MentionGroup, MentionStatus, Profile, RunStatus, Source, SourceScope, Tier,
};

/// SQLite-backed store implementing every Clipwatch store contract.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

fn db_err(e: impl std::fmt::Display) -> ClipwatchError {
    ClipwatchError::Store(e.to_string())
}

impl SqliteStore {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path).map_err(db_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        debug!("🗄️ Opened clipwatch database at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// Run migrations to create tables.
    fn migrate(&self) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute_batch(
                "
            -- Monitored sources with crawl health fields
            CREATE TABLE IF NOT EXISTS sources (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                scope_kind TEXT NOT NULL,        -- 'profile', 'group', 'global'
                scope_id TEXT,
                tier INTEGER NOT NULL,           -- cadence in minutes
                active INTEGER NOT NULL DEFAULT 1,
                last_run_at TEXT,
                last_status TEXT,                -- 'ok', 'failed'
                last_error TEXT,
                consecutive_failures INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            -- Watch profiles (mention consumers)
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                group_id TEXT,
                active INTEGER NOT NULL DEFAULT 1
            );

            -- Claimable mention queue
            CREATE TABLE IF NOT EXISTS mentions (
                id TEXT PRIMARY KEY,
                post_key TEXT NOT NULL,
                profile_id TEXT NOT NULL,
                snippet TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                claimed_by TEXT,
                claimed_at TEXT,
                detected_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_mentions_status ON mentions(status);

            -- Derived clips with TTL
            CREATE TABLE IF NOT EXISTS clips (
                id TEXT PRIMARY KEY,
                profile_id TEXT NOT NULL,
                expires_at INTEGER NOT NULL,     -- unix millis
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_clips_expiry ON clips(profile_id, expires_at);
         ",
            )
            .map_err(|e| db_err(format!("Migration: {e}")))?;
        Ok(())
    }

    // ─── Seeding (used by the CLI and by the crawler's write path) ───────────

    /// Insert or replace a source.
    pub fn insert_source(&self, source: &Source) -> Result<()> {
        let (scope_kind, scope_id) = match &source.scope {
            SourceScope::Profile(id) => ("profile", Some(id.clone())),
            SourceScope::Group(id) => ("group", Some(id.clone())),
            SourceScope::Global => ("global", None),
        };
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO sources
                 (id, name, scope_kind, scope_id, tier, active, last_run_at, last_status,
                  last_error, consecutive_failures, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    source.id,
                    source.name,
                    scope_kind,
                    scope_id,
                    source.tier.minutes(),
                    source.active as i32,
                    source.last_run_at.map(|t| t.to_rfc3339()),
                    source.last_status.map(|s| match s {
                        RunStatus::Ok => "ok",
                        RunStatus::Failed => "failed",
                    }),
                    source.last_error,
                    source.consecutive_failures,
                    source.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Insert or replace a profile.
    pub fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT OR REPLACE INTO profiles (id, name, group_id, active)
                 VALUES (?1, ?2, ?3, ?4)",
                params![profile.id, profile.name, profile.group_id, profile.active as i32],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Insert a freshly detected mention.
    pub fn insert_mention(&self, mention: &Mention) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO mentions
                 (id, post_key, profile_id, snippet, status, claimed_by, claimed_at, detected_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    mention.id,
                    mention.post_key,
                    mention.profile_id,
                    mention.snippet,
                    mention.status.as_str(),
                    mention.claimed_by,
                    mention.claimed_at.map(|t| t.to_rfc3339()),
                    mention.detected_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Insert a derived clip.
    pub fn insert_clip(&self, clip: &Clip) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO clips (id, profile_id, expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    clip.id,
                    clip.profile_id,
                    clip.expires_at.timestamp_millis(),
                    clip.created_at.to_rfc3339(),
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// Fetch one mention by ID (diagnostics, tests).
    pub fn mention_by_id(&self, id: &str) -> Result<Option<Mention>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, post_key, profile_id, snippet, status, claimed_by, claimed_at, detected_at
                 FROM mentions WHERE id = ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt
            .query_map([id], row_to_mention)
            .map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    /// Remaining (unexpired) clip count for a profile.
    pub fn clip_count(&self, profile_id: &str) -> Result<u64> {
        self.conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT COUNT(*) FROM clips WHERE profile_id = ?1",
                [profile_id],
                |r| r.get::<_, i64>(0),
            )
            .map(|n| n as u64)
            .map_err(db_err)
    }
}

// ─── Row mapping ──────────────────────────────────────

fn parse_dt(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<Source> {
    let scope_kind: String = row.get(2)?;
    let scope_id: Option<String> = row.get(3)?;
    let scope = match scope_kind.as_str() {
        "profile" => SourceScope::Profile(scope_id.unwrap_or_default()),
        "group" => SourceScope::Group(scope_id.unwrap_or_default()),
        _ => SourceScope::Global,
    };
    let tier_minutes: i64 = row.get(4)?;
    let last_status: Option<String> = row.get(7)?;
    Ok(Source {
        id: row.get(0)?,
        name: row.get(1)?,
        scope,
        tier: Tier::from_minutes(tier_minutes).unwrap_or(Tier::M60),
        active: row.get::<_, i32>(5)? != 0,
        last_run_at: row.get::<_, Option<String>>(6)?.map(|s| parse_dt(&s)),
        last_status: last_status.map(|s| match s.as_str() {
            "ok" => RunStatus::Ok,
            _ => RunStatus::Failed,
        }),
        last_error: row.get(8)?,
        consecutive_failures: row.get(9)?,
        created_at: parse_dt(&row.get::<_, String>(10)?),
    })
}

fn row_to_mention(row: &rusqlite::Row<'_>) -> rusqlite::Result<Mention> {
    let status: String = row.get(4)?;
    Ok(Mention {
        id: row.get(0)?,
        post_key: row.get(1)?,
        profile_id: row.get(2)?,
        snippet: row.get(3)?,
        status: MentionStatus::parse(&status).unwrap_or(MentionStatus::Pending),
        claimed_by: row.get(5)?,
        claimed_at: row.get::<_, Option<String>>(6)?.map(|s| parse_dt(&s)),
        detected_at: parse_dt(&row.get::<_, String>(7)?),
    })
}

fn row_to_profile(row: &rusqlite::Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        group_id: row.get(2)?,
        active: row.get::<_, i32>(3)? != 0,
    })
}

// ─── SourceStore ──────────────────────────────────────

#[async_trait]
impl SourceStore for SqliteStore {
    async fn find_due(&self, tier: Tier, now: DateTime<Utc>) -> Result<Vec<Source>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, scope_kind, scope_id, tier, active, last_run_at, last_status,
                        last_error, consecutive_failures, created_at
                 FROM sources WHERE active = 1 AND tier = ?1 ORDER BY rowid",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([tier.minutes()], row_to_source)
            .map_err(db_err)?;
        let mut due = Vec::new();
        for row in rows {
            let source = row.map_err(db_err)?;
            if source.is_due(now) {
                due.push(source);
            }
        }
        Ok(due)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Source>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, scope_kind, scope_id, tier, active, last_run_at, last_status,
                        last_error, consecutive_failures, created_at
                 FROM sources WHERE id = ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query_map([id], row_to_source).map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn record_success(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE sources
                 SET last_run_at = ?1, last_status = 'ok', last_error = NULL,
                     consecutive_failures = 0
                 WHERE id = ?2",
                params![now.to_rfc3339(), id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    async fn record_failure(&self, id: &str, error: &str, now: DateTime<Utc>) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE sources
                 SET last_run_at = ?1, last_status = 'failed', last_error = ?2,
                     consecutive_failures = consecutive_failures + 1
                 WHERE id = ?3",
                params![now.to_rfc3339(), error, id],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

// ─── ProfileStore ──────────────────────────────────────

#[async_trait]
impl ProfileStore for SqliteStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, group_id, active FROM profiles WHERE id = ?1")
            .map_err(db_err)?;
        let mut rows = stmt.query_map([id], row_to_profile).map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn first_active_in_group(&self, group_id: &str) -> Result<Option<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, group_id, active FROM profiles
                 WHERE group_id = ?1 AND active = 1 ORDER BY rowid LIMIT 1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query_map([group_id], row_to_profile).map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn list_active(&self) -> Result<Vec<Profile>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, group_id, active FROM profiles WHERE active = 1 ORDER BY rowid")
            .map_err(db_err)?;
        let rows = stmt.query_map([], row_to_profile).map_err(db_err)?;
        let mut profiles = Vec::new();
        for row in rows {
            profiles.push(row.map_err(db_err)?);
        }
        Ok(profiles)
    }
}

// ─── MentionStore ──────────────────────────────────────

#[async_trait]
impl MentionStore for SqliteStore {
    async fn fetch_pending_grouped(&self, limit: u32) -> Result<Vec<MentionGroup>> {
        let conn = self.conn.lock().unwrap();
        // The subquery selects the first `limit` posts in discovery order;
        // the outer query returns every pending row of those posts. No group
        // is cut in half, and the scan stays bounded under a large backlog.
        let mut stmt = conn
            .prepare(
                "SELECT id, post_key, profile_id, snippet, status, claimed_by, claimed_at, detected_at
                 FROM mentions
                 WHERE status = 'pending' AND post_key IN (
                     SELECT post_key FROM mentions WHERE status = 'pending'
                     GROUP BY post_key ORDER BY MIN(rowid) LIMIT ?1
                 )
                 ORDER BY rowid",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map([limit as i64], row_to_mention)
            .map_err(db_err)?;

        // Group rows by post_key in first-seen order.
        let mut groups: Vec<MentionGroup> = Vec::new();
        for row in rows {
            let mention = row.map_err(db_err)?;
            if let Some(group) = groups.iter_mut().find(|g| g.post_key == mention.post_key) {
                group.mentions.push(mention);
            } else {
                groups.push(MentionGroup {
                    post_key: mention.post_key.clone(),
                    mentions: vec![mention],
                });
            }
        }
        Ok(groups)
    }

    async fn claim(&self, id: &str, worker: &str) -> Result<Option<Mention>> {
        let conn = self.conn.lock().unwrap();
        // Single conditional update: wins only while the row is still pending.
        let changed = conn
            .execute(
                "UPDATE mentions SET status = 'claimed', claimed_by = ?1, claimed_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
                params![worker, Utc::now().to_rfc3339(), id],
            )
            .map_err(db_err)?;
        if changed == 0 {
            return Ok(None);
        }
        let mut stmt = conn
            .prepare(
                "SELECT id, post_key, profile_id, snippet, status, claimed_by, claimed_at, detected_at
                 FROM mentions WHERE id = ?1",
            )
            .map_err(db_err)?;
        let mut rows = stmt.query_map([id], row_to_mention).map_err(db_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(db_err)?)),
            None => Ok(None),
        }
    }

    async fn release(&self, id: &str) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE mentions SET status = 'pending', claimed_by = NULL, claimed_at = NULL
                 WHERE id = ?1",
                [id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_status(&self, id: &str, status: MentionStatus) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE mentions SET status = ?1 WHERE id = ?2",
                params![status.as_str(), id],
            )
            .map_err(db_err)?;
        Ok(())
    }

    async fn fetch_pending(&self, limit: u32) -> Result<Vec<Mention>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, post_key, profile_id, snippet, status, claimed_by, claimed_at, detected_at
                 FROM mentions WHERE status = 'pending' ORDER BY rowid LIMIT ?1",
            )
            .map_err(db_err)?;
        let rows = stmt.query_map([limit as i64], row_to_mention).map_err(db_err)?;
        let mut mentions = Vec::new();
        for row in rows {
            mentions.push(row.map_err(db_err)?);
        }
        Ok(mentions)
    }

    async fn mark_expired(&self, id: &str) -> Result<()> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "UPDATE mentions SET status = 'expired' WHERE id = ?1 AND status = 'pending'",
                [id],
            )
            .map_err(db_err)?;
        Ok(())
    }
}

// ─── ClipStore ──────────────────────────────────────

#[async_trait]
impl ClipStore for SqliteStore {
    async fn expire_older_than(&self, profile_id: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = self
            .conn
            .lock()
            .unwrap()
            .execute(
                "DELETE FROM clips WHERE profile_id = ?1 AND expires_at <= ?2",
                params![profile_id, cutoff.timestamp_millis()],
            )
            .map_err(db_err)?;
        Ok(deleted as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn seed_mention(store: &SqliteStore, post_key: &str, profile_id: &str) -> Mention {
        let mention = Mention::new(post_key, profile_id, "snippet");
        store.insert_mention(&mention).unwrap();
        mention
    }

    #[tokio::test]
    async fn test_find_due_filters_by_interval() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();

        let fresh = {
            let mut s = Source::for_profile("fresh", "p1", Tier::M15);
            s.last_run_at = Some(now - Duration::minutes(5));
            s
        };
        let stale = {
            let mut s = Source::for_profile("stale", "p1", Tier::M15);
            s.last_run_at = Some(now - Duration::minutes(20));
            s
        };
        let never_ran = Source::for_profile("never", "p1", Tier::M15);
        let other_tier = Source::for_profile("hourly", "p1", Tier::M60);
        store.insert_source(&fresh).unwrap();
        store.insert_source(&stale).unwrap();
        store.insert_source(&never_ran).unwrap();
        store.insert_source(&other_tier).unwrap();

        let due = store.find_due(Tier::M15, now).await.unwrap();
        let names: Vec<_> = due.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["stale", "never"]);
    }

    #[tokio::test]
    async fn test_health_writeback() {
        let store = SqliteStore::open_in_memory().unwrap();
        let source = Source::for_profile("s", "p1", Tier::M5);
        store.insert_source(&source).unwrap();
        let now = Utc::now();

        store.record_failure(&source.id, "timeout", now).await.unwrap();
        store.record_failure(&source.id, "dns", now).await.unwrap();
        // Qualified: SqliteStore also has ProfileStore::find_by_id.
        let loaded = SourceStore::find_by_id(&store, &source.id).await.unwrap().unwrap();
        assert_eq!(loaded.consecutive_failures, 2);
        assert_eq!(loaded.last_status, Some(RunStatus::Failed));
        assert_eq!(loaded.last_error.as_deref(), Some("dns"));

        store.record_success(&source.id, now).await.unwrap();
        let loaded = SourceStore::find_by_id(&store, &source.id).await.unwrap().unwrap();
        assert_eq!(loaded.consecutive_failures, 0);
        assert_eq!(loaded.last_status, Some(RunStatus::Ok));
        assert_eq!(loaded.last_error, None);
    }

    #[tokio::test]
    async fn test_claim_is_exclusive() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mention = seed_mention(&store, "post-1", "p1");

        let first = store.claim(&mention.id, "worker-a").await.unwrap();
        assert!(first.is_some());
        assert_eq!(first.unwrap().claimed_by.as_deref(), Some("worker-a"));

        // Second claim on the same mention loses.
        let second = store.claim(&mention.id, "worker-b").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_claims_exactly_one_wins() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let mention = seed_mention(&store, "post-1", "p1");

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let id = mention.id.clone();
            handles.push(tokio::spawn(async move {
                store.claim(&id, &format!("worker-{i}")).await.unwrap()
            }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_release_returns_to_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mention = seed_mention(&store, "post-1", "p1");

        store.claim(&mention.id, "worker-a").await.unwrap().unwrap();
        store.release(&mention.id).await.unwrap();

        let loaded = store.mention_by_id(&mention.id).unwrap().unwrap();
        assert_eq!(loaded.status, MentionStatus::Pending);
        assert_eq!(loaded.claimed_by, None);
        assert_eq!(loaded.claimed_at, None);

        // Claimable again after release.
        assert!(store.claim(&mention.id, "worker-b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fetch_pending_grouped_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        // Interleave detection order across two posts; grouping must keep
        // post-a intact and first.
        seed_mention(&store, "post-a", "t1");
        seed_mention(&store, "post-b", "t4");
        seed_mention(&store, "post-a", "t2");
        seed_mention(&store, "post-a", "t3");
        seed_mention(&store, "post-b", "t5");

        let groups = store.fetch_pending_grouped(10).await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].post_key, "post-a");
        let profiles: Vec<_> = groups[0].mentions.iter().map(|m| m.profile_id.as_str()).collect();
        assert_eq!(profiles, vec!["t1", "t2", "t3"]);
        assert_eq!(groups[1].post_key, "post-b");
        assert_eq!(groups[1].mentions.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_pending_grouped_limit_keeps_groups_whole() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed_mention(&store, "post-a", "t1");
        seed_mention(&store, "post-b", "t2");
        seed_mention(&store, "post-a", "t3");

        let groups = store.fetch_pending_grouped(1).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].post_key, "post-a");
        // The limit caps group count, not group membership.
        assert_eq!(groups[0].mentions.len(), 2);
    }

    #[tokio::test]
    async fn test_clip_expiry_inclusive_boundary() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();

        let at_boundary = Clip {
            id: "clip-1".into(),
            profile_id: "p1".into(),
            expires_at: now,
            created_at: now,
        };
        let one_ms_younger = Clip {
            id: "clip-2".into(),
            profile_id: "p1".into(),
            expires_at: now + Duration::milliseconds(1),
            created_at: now,
        };
        store.insert_clip(&at_boundary).unwrap();
        store.insert_clip(&one_ms_younger).unwrap();

        let expired = store.expire_older_than("p1", now).await.unwrap();
        assert_eq!(expired, 1);
        assert_eq!(store.clip_count("p1").unwrap(), 1);
    }

    #[tokio::test]
    async fn test_first_active_in_group() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut inactive = Profile::new("first", Some("g1"));
        inactive.active = false;
        let second = Profile::new("second", Some("g1"));
        let other_group = Profile::new("other", Some("g2"));
        store.insert_profile(&inactive).unwrap();
        store.insert_profile(&second).unwrap();
        store.insert_profile(&other_group).unwrap();

        let found = store.first_active_in_group("g1").await.unwrap().unwrap();
        assert_eq!(found.name, "second");
        assert!(store.first_active_in_group("g9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mark_expired_only_touches_pending() {
        let store = SqliteStore::open_in_memory().unwrap();
        let pending = seed_mention(&store, "post-a", "t1");
        let claimed = seed_mention(&store, "post-a", "t2");
        store.claim(&claimed.id, "worker-a").await.unwrap();

        store.mark_expired(&pending.id).await.unwrap();
        store.mark_expired(&claimed.id).await.unwrap();

        assert_eq!(
            store.mention_by_id(&pending.id).unwrap().unwrap().status,
            MentionStatus::Expired
        );
        assert_eq!(
            store.mention_by_id(&claimed.id).unwrap().unwrap().status,
            MentionStatus::Claimed
        );
    }
}
