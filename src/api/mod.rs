//! API module.
//!
//! This module provides:
//! - The `FeedSource` and `AssetTransport` seams used by the engine
//! - HTTP client for the SocialData REST API
//! - API response types

pub mod client;
pub mod source;
pub mod types;

pub use client::{SocialDataApi, DEFAULT_BASE_URL};
pub use source::{AssetTransport, FeedSource};
pub use types::{SearchResponse, UserProfile};
