//! Durable per-collection progress document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::Record;
use crate::store::ledger::RetryLedger;

/// Aggregate statistics derived from the snapshot contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotStats {
    pub items_found: u64,
    pub assets_found: u64,
    pub assets_downloaded: u64,
}

/// Everything needed to resume one collection.
///
/// Older documents (including the ones written by the first version of the
/// tool, which used snake_case keys) load with missing fields defaulted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(alias = "username")]
    pub collection_key: String,

    /// Records in fetch order. Append-only.
    #[serde(default, alias = "tweets")]
    pub records: Vec<Record>,

    /// Oldest id paginated so far.
    #[serde(default, alias = "oldest_id")]
    pub cursor: Option<String>,

    /// Set once the feed reported its end.
    #[serde(default, alias = "is_complete")]
    pub completion_flag: bool,

    #[serde(default, alias = "pages_fetched")]
    pub pages_fetched: u64,

    #[serde(default)]
    pub retry_ledger: RetryLedger,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SnapshotStats>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Empty snapshot for a collection seen for the first time.
    pub fn new(collection_key: &str) -> Self {
        Self {
            collection_key: collection_key.to_string(),
            records: Vec::new(),
            cursor: None,
            completion_flag: false,
            pages_fetched: 0,
            retry_ledger: RetryLedger::new(),
            stats: None,
            last_updated: None,
        }
    }

    /// Statistics computed from records and ledger.
    pub fn compute_stats(&self) -> SnapshotStats {
        SnapshotStats {
            items_found: self.records.len() as u64,
            assets_found: self.retry_ledger.len() as u64,
            assets_downloaded: self.retry_ledger.succeeded_count() as u64,
        }
    }

    /// Records whose assets were not extracted yet.
    pub fn unprocessed_count(&self) -> usize {
        self.records.iter().filter(|r| !r.assets_processed).count()
    }

    pub fn touch(&mut self) {
        self.last_updated = Some(Utc::now());
    }
}
