//! # Clipwatch Scheduler
//!
//! The coordination core: decides when sources are crawled, who owns each
//! detected mention, and when derived state expires.
//!
//! ## Architecture
//! ```text
//! SchedulerEngine (one tokio interval per tier)
//!   ├── RunGuard: skip-not-wait reentrancy per job key
//!   ├── BackpressureGate: per-source serialization + exponential backoff
//!   ├── CrawlOrchestrator: scope resolution → crawl executor → health writeback
//!   ├── MentionClaimer: grouped fetch → atomic claim → analyzer verdict
//!   │     └── FastPathRouter: urgent verdicts → immediate alert (isolated)
//!   └── ExpirationSweeper: clip TTL pass + stale-mention pass (best-effort)
//! ```
//!
//! In-process guards are plain atomics; the one cross-process correctness
//! point is the mention claim, which the store enforces atomically. Several
//! scheduler processes may race the same database and never double-process
//! a mention.

pub mod claimer;
pub mod crawl;
pub mod engine;
pub mod fastpath;
pub mod gate;
pub mod guard;
pub mod sweeper;

#[cfg(test)]
pub(crate) mod testutil;

pub use claimer::MentionClaimer;
pub use crawl::{CrawlOrchestrator, CrawlResult};
pub use engine::SchedulerEngine;
pub use fastpath::FastPathRouter;
pub use gate::{Admission, BackpressureGate, DenyReason};
pub use guard::{JobKey, RunGuard, RunPermit};
pub use sweeper::ExpirationSweeper;
