//! Per-asset retry bookkeeping.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::record::AssetKey;

/// Attempts after which a failing asset is given up on.
pub const MAX_ATTEMPTS: u32 = 3;

/// Download state of one asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    #[serde(default, alias = "attempts")]
    pub attempt_count: u32,
    #[serde(default)]
    pub succeeded: bool,
}

impl LedgerEntry {
    /// Settled assets are never scheduled again.
    pub fn is_settled(&self) -> bool {
        self.succeeded || self.attempt_count >= MAX_ATTEMPTS
    }
}

/// Record id -> asset URL -> entry.
///
/// Attempt counts only grow and success is never revoked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryLedger {
    entries: BTreeMap<String, BTreeMap<String, LedgerEntry>>,
}

impl RetryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, record_id: &str, url: &str) -> Option<LedgerEntry> {
        self.entries.get(record_id)?.get(url).copied()
    }

    fn entry_mut(&mut self, record_id: &str, url: &str) -> &mut LedgerEntry {
        self.entries
            .entry(record_id.to_string())
            .or_default()
            .entry(url.to_string())
            .or_default()
    }

    /// Whether the asset may be (re)downloaded.
    pub fn eligible(&self, record_id: &str, url: &str) -> bool {
        self.entry(record_id, url)
            .map(|entry| !entry.is_settled())
            .unwrap_or(true)
    }

    /// Track an asset that was scheduled, without counting an attempt.
    ///
    /// A download cancelled before it reports leaves this entry behind, so the
    /// asset shows up in [`RetryLedger::unsettled`] on the next run.
    pub fn register(&mut self, record_id: &str, url: &str) {
        self.entry_mut(record_id, url);
    }

    /// Count one download attempt.
    pub fn record_attempt(&mut self, record_id: &str, url: &str) {
        let entry = self.entry_mut(record_id, url);
        entry.attempt_count = entry.attempt_count.saturating_add(1);
    }

    /// Store the result of an attempt. A success is never reverted.
    pub fn record_outcome(&mut self, record_id: &str, url: &str, succeeded: bool) {
        let entry = self.entry_mut(record_id, url);
        entry.succeeded |= succeeded;
    }

    /// Mark the asset downloaded if its file already exists, without
    /// consuming an attempt. Returns whether the file was found.
    pub fn already_on_disk(&mut self, key: &AssetKey, path: &Path) -> bool {
        if !path.is_file() {
            return false;
        }
        self.record_outcome(&key.record_id, &key.url, true);
        true
    }

    /// Assets that were scheduled or tried before but are not settled yet.
    pub fn unsettled(&self) -> Vec<AssetKey> {
        self.entries
            .iter()
            .flat_map(|(record_id, assets)| {
                assets
                    .iter()
                    .filter(|(_, entry)| !entry.is_settled())
                    .map(move |(url, _)| AssetKey {
                        record_id: record_id.clone(),
                        url: url.clone(),
                    })
            })
            .collect()
    }

    /// Number of assets known to the ledger.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of assets downloaded successfully.
    pub fn succeeded_count(&self) -> usize {
        self.entries
            .values()
            .flat_map(BTreeMap::values)
            .filter(|entry| entry.succeeded)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_asset_is_eligible() {
        let ledger = RetryLedger::new();
        assert!(ledger.eligible("1", "https://m/a.jpg"));
        assert!(ledger.entry("1", "https://m/a.jpg").is_none());
    }

    #[test]
    fn test_settles_after_max_attempts() {
        let mut ledger = RetryLedger::new();
        for _ in 0..MAX_ATTEMPTS {
            assert!(ledger.eligible("1", "u"));
            ledger.record_attempt("1", "u");
            ledger.record_outcome("1", "u", false);
        }
        assert!(!ledger.eligible("1", "u"));
        assert_eq!(
            ledger.entry("1", "u"),
            Some(LedgerEntry {
                attempt_count: 3,
                succeeded: false
            })
        );
        assert!(ledger.unsettled().is_empty());
    }

    #[test]
    fn test_success_is_never_reverted() {
        let mut ledger = RetryLedger::new();
        ledger.record_attempt("1", "u");
        ledger.record_outcome("1", "u", true);
        ledger.record_outcome("1", "u", false);
        let entry = ledger.entry("1", "u").unwrap();
        assert!(entry.succeeded);
        assert_eq!(entry.attempt_count, 1);
        assert!(!ledger.eligible("1", "u"));
    }

    #[test]
    fn test_already_on_disk_consumes_no_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_0.jpg");
        let key = AssetKey {
            record_id: "1".into(),
            url: "u".into(),
        };
        let mut ledger = RetryLedger::new();

        assert!(!ledger.already_on_disk(&key, &path));
        assert!(ledger.is_empty());

        std::fs::write(&path, b"jpeg").unwrap();
        assert!(ledger.already_on_disk(&key, &path));
        assert_eq!(
            ledger.entry("1", "u"),
            Some(LedgerEntry {
                attempt_count: 0,
                succeeded: true
            })
        );
        assert_eq!(ledger.succeeded_count(), 1);
    }

    #[test]
    fn test_unsettled_lists_retryable_assets() {
        let mut ledger = RetryLedger::new();
        ledger.record_attempt("1", "a");
        ledger.record_outcome("1", "a", false);
        ledger.record_attempt("1", "b");
        ledger.record_outcome("1", "b", true);
        ledger.record_attempt("2", "c");

        let unsettled = ledger.unsettled();
        assert_eq!(unsettled.len(), 2);
        assert_eq!(unsettled[0].url, "a");
        assert_eq!(unsettled[1].record_id, "2");
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_registered_asset_stays_unsettled() {
        let mut ledger = RetryLedger::new();
        ledger.register("1", "a");
        ledger.register("1", "a");
        assert_eq!(ledger.entry("1", "a"), Some(LedgerEntry::default()));
        assert!(ledger.eligible("1", "a"));
        assert_eq!(ledger.unsettled().len(), 1);

        // registering never touches recorded progress
        ledger.record_attempt("1", "a");
        ledger.record_outcome("1", "a", true);
        ledger.register("1", "a");
        assert_eq!(
            ledger.entry("1", "a"),
            Some(LedgerEntry {
                attempt_count: 1,
                succeeded: true
            })
        );
        assert!(ledger.unsettled().is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let mut ledger = RetryLedger::new();
        ledger.record_attempt("9", "u");
        assert_eq!(
            serde_json::to_value(&ledger).unwrap(),
            json!({"9": {"u": {"attemptCount": 1, "succeeded": false}}})
        );
        let parsed: RetryLedger =
            serde_json::from_value(json!({"9": {"u": {"attempts": 2}}})).unwrap();
        assert_eq!(parsed.entry("9", "u").unwrap().attempt_count, 2);
    }
}
