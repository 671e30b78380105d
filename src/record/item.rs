//! Feed record representation and identity.

use std::cmp::Ordering;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of identities synthesised for records without an upstream id.
pub const ANONYMOUS_ID_PREFIX: &str = "anon-";

/// One item fetched from the feed.
///
/// The payload is kept as the upstream sent it; the engine only owns the
/// `assetsProcessed` marker, stored alongside the payload keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Whether asset extraction and scheduling already ran for this record.
    #[serde(rename = "assetsProcessed", default)]
    pub assets_processed: bool,

    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Record {
    /// Wrap a freshly fetched payload.
    pub fn new(payload: Map<String, Value>) -> Self {
        Self {
            assets_processed: false,
            payload,
        }
    }

    /// Build a record from an arbitrary JSON value. Non-objects become empty records.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                Self::new(map)
            }
        }
    }

    /// The id the upstream assigned, if any (`id_str` first, then `id`).
    pub fn upstream_id(&self) -> Option<String> {
        if let Some(id) = self.str_field("id_str") {
            return Some(id.to_string());
        }
        match self.payload.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Stable identity of this record.
    ///
    /// Falls back to a digest of the payload when the upstream gave no id, so
    /// id-less records never share retry bookkeeping.
    pub fn id(&self) -> String {
        self.upstream_id().unwrap_or_else(|| self.content_id())
    }

    fn content_id(&self) -> String {
        // serde_json maps are ordered by key, so the encoding is canonical
        let canonical = serde_json::to_vec(&self.payload).unwrap_or_default();
        let digest = Md5::digest(&canonical);
        format!("{}{:x}", ANONYMOUS_ID_PREFIX, digest)
    }

    /// Non-empty string field at the top level of the payload.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        str_of(self.payload.get(key)?)
    }

    /// Nested object at the top level of the payload.
    pub fn object_field(&self, key: &str) -> Option<&Map<String, Value>> {
        self.payload.get(key)?.as_object()
    }

    /// Post text (`full_text` preferred over `text`).
    pub fn text(&self) -> Option<&str> {
        self.str_field("full_text").or_else(|| self.str_field("text"))
    }

    /// Creation timestamp as sent upstream.
    pub fn created_at(&self) -> Option<&str> {
        self.str_field("tweet_created_at")
            .or_else(|| self.str_field("created_at"))
    }
}

/// Non-empty string view of a JSON value.
pub(crate) fn str_of(value: &Value) -> Option<&str> {
    match value.as_str() {
        Some(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}

/// Order two record ids as opaque tokens.
///
/// All-digit ids compare as unbounded integers and sort before every other id;
/// anything else compares lexicographically.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (is_numeric(a), is_numeric(b)) {
        (true, true) => {
            let a = a.trim_start_matches('0');
            let b = b.trim_start_matches('0');
            a.len().cmp(&b.len()).then_with(|| a.cmp(b))
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.cmp(b),
    }
}

fn is_numeric(id: &str) -> bool {
    !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())
}

/// The oldest upstream id among `records`, used as the resume cursor.
pub fn oldest_id<'a, I>(records: I) -> Option<String>
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter_map(Record::upstream_id)
        .min_by(|a, b| compare_ids(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::from_value(value)
    }

    #[test]
    fn test_id_prefers_id_str() {
        let r = record(json!({"id_str": "1700000000000000001", "id": 17}));
        assert_eq!(r.id(), "1700000000000000001");
    }

    #[test]
    fn test_numeric_id_field() {
        let r = record(json!({"id": 12345}));
        assert_eq!(r.id(), "12345");
        let r = record(json!({"id_str": "", "id": "987"}));
        assert_eq!(r.id(), "987");
    }

    #[test]
    fn test_missing_id_uses_content_digest() {
        let a = record(json!({"text": "hello"}));
        let b = record(json!({"text": "world"}));
        assert!(a.id().starts_with(ANONYMOUS_ID_PREFIX));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), record(json!({"text": "hello"})).id());
        assert!(a.upstream_id().is_none());
    }

    #[test]
    fn test_compare_ids_is_arbitrary_precision() {
        assert_eq!(
            compare_ids("99999999999999999999999", "100000000000000000000000"),
            Ordering::Less
        );
        assert_eq!(compare_ids("0012", "12"), Ordering::Equal);
        assert_eq!(compare_ids("9", "10"), Ordering::Less);
        assert_eq!(compare_ids("10", "abc"), Ordering::Less);
        assert_eq!(compare_ids("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn test_oldest_id_ignores_anonymous_records() {
        let records = vec![
            record(json!({"id_str": "30"})),
            record(json!({"text": "no id"})),
            record(json!({"id_str": "4"})),
        ];
        assert_eq!(oldest_id(&records), Some("4".to_string()));
        assert_eq!(oldest_id(&records[1..2]), None);
    }

    #[test]
    fn test_processed_flag_round_trips_with_payload() {
        let mut r = record(json!({"id_str": "1", "full_text": "hi"}));
        r.assets_processed = true;
        let encoded = serde_json::to_value(&r).unwrap();
        assert_eq!(encoded["assetsProcessed"], json!(true));
        assert_eq!(encoded["full_text"], json!("hi"));

        let legacy: Record = serde_json::from_value(json!({"id_str": "1"})).unwrap();
        assert!(!legacy.assets_processed);
        assert_eq!(legacy.text(), None);
    }
}
