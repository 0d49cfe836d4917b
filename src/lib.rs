//! fetchr - Flickr photostream metadata fetcher
//!
//! Lists every public photo of a user, enriches each one with a detail
//! lookup through a bounded pool of concurrent workers, and streams the
//! results into a single JSON array file.
//!
//! # Architecture
//!
//! - [`config`] - Configuration management and validation
//! - [`crawler`] - Listing, detail workers and run coordination
//! - [`models`] - Photo records and derived URLs
//! - [`storage`] - Incremental JSON array output
//! - [`error`] - Unified error handling
//! - [`utils`] - Common utilities and domain error types
//!
//! # Example
//!
//! ```no_run
//! use fetchr::config::Config;
//! use fetchr::crawler::Crawler;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let crawler = Crawler::new(config)?;
//!     let summary = crawler.run().await?;
//!     println!("Saved details for {} photos", summary.saved);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, FailureMode};
    pub use crate::crawler::{Crawler, DetailSource, PageSource};
    pub use crate::error::{Error, ErrorCategory, FetchrErrorTrait, Result};
    pub use crate::models::{FullPhoto, Photo, PhotoInfo, PhotoSummary, RunSummary, SavedPhoto};
    pub use crate::storage::JsonArrayWriter;
}

pub use models::{PhotoInfo, PhotoSummary, RunSummary};
