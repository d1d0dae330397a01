//! Trait contracts between the scheduler and its collaborators.

pub mod pipeline;
pub mod stores;

pub use pipeline::{AlertHandler, CrawlExecutor, EventSink, MentionAnalyzer};
pub use stores::{ClipStore, MentionStore, ProfileStore, SourceStore};
