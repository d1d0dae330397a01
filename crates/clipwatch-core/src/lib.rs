//! # Clipwatch Core
//!
//! Shared foundation for the Clipwatch monitoring scheduler: the data model
//! (sources, mentions, clips, profiles), the error type, TOML configuration,
//! and the trait contracts that the store and collaborator layers implement.
//!
//! Nothing in this crate does I/O on its own — stores and external services
//! plug in behind the traits in [`traits`].

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::ClipwatchConfig;
pub use error::{ClipwatchError, Result};
