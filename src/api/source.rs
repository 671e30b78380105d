//! Seams between the engine and the network.

use async_trait::async_trait;

use crate::error::Result;
use crate::record::Record;

/// Paginated upstream feed of records.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the page of records at or below `cursor` (newest first).
    async fn fetch_feed(&self, key: &str, cursor: Option<&str>) -> Result<Vec<Record>>;

    /// Total number of records the upstream reports for the collection.
    async fn total_count(&self, key: &str) -> Result<Option<u64>>;
}

/// Plain transfer of asset bytes.
#[async_trait]
pub trait AssetTransport: Send + Sync {
    /// Fetch the asset body. Any non-success status is an error.
    async fn fetch_asset(&self, url: &str) -> Result<Vec<u8>>;
}
