//! Feed Harvester - resumable archiving of paginated post feeds.
//!
//! This library fetches the complete history of one or more feeds through
//! the SocialData API, downloads the images embedded in each post and keeps
//! enough durable state on disk to resume an interrupted run.
//!
//! # Features
//!
//! - Rate-limited pagination with a persisted cursor
//! - Bounded parallel image downloads shared across feeds
//! - Per-asset retry ledger with a fixed attempt limit
//! - Atomic snapshot and file writes
//! - Live status updates and a cooperative stop signal
//! - Optional site-data export
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use feed_harvester::{Config, DownloadPool, DurableStore, HarvestSettings, Harvester, SocialDataApi};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(Path::new("config.toml"))?;
//!     let api = Arc::new(SocialDataApi::new(
//!         config.api.api_key.clone(),
//!         &config.api.base_url,
//!         &config.api.user_agent,
//!         Duration::from_secs(config.api.request_timeout_seconds),
//!     )?);
//!
//!     let harvester = Harvester::new(
//!         api.clone(),
//!         DownloadPool::new(api, config.options.max_concurrent_downloads),
//!         DurableStore::new(config.data_directory()),
//!         HarvestSettings::from_config(&config),
//!     );
//!     let status = harvester.run_collection("jack").await;
//!     println!("{}", status);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod export;
pub mod fs;
pub mod output;
pub mod record;
pub mod store;

// Re-exports for convenience
pub use api::{AssetTransport, FeedSource, SocialDataApi};
pub use config::Config;
pub use download::{
    DownloadPool, GlobalState, HarvestSettings, Harvester, RunPhase, RunStatus, StopHandle,
    StopSignal,
};
pub use error::{Error, Result};
pub use record::{AssetRef, Record};
pub use store::{DurableStore, Snapshot};
