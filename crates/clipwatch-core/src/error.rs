//! Clipwatch error type — one enum for the whole workspace.

use thiserror::Error;

/// All errors that can surface from Clipwatch components.
#[derive(Error, Debug)]
pub enum ClipwatchError {
    /// Configuration load/parse problems.
    #[error("Config error: {0}")]
    Config(String),

    /// Backing store failures (sqlite open, query, migration).
    #[error("Store error: {0}")]
    Store(String),

    /// Crawl executor failures (external ingestion service).
    #[error("Crawl error: {0}")]
    Crawl(String),

    /// Mention analyzer failures (external analysis service).
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Alert handler failures (fast path delivery).
    #[error("Alert error: {0}")]
    Alert(String),

    /// Filesystem errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Workspace-wide result alias.
pub type Result<T> = std::result::Result<T, ClipwatchError>;
