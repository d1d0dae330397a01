//! # Clipwatch Store
//!
//! SQLite persistence for the Clipwatch scheduler. One [`SqliteStore`]
//! implements every store contract from `clipwatch-core`: sources with
//! health fields, the claimable mention queue, watch profiles, and
//! TTL-bearing clips.
//!
//! The mention claim is a single conditional `UPDATE` checked by affected
//! row count — the atomicity the scheduler relies on across processes.

pub mod sqlite;

pub use sqlite::SqliteStore;
