//! Asset extraction from record payloads.

use serde_json::{Map, Value};

use crate::record::asset::AssetRef;
use crate::record::item::{str_of, Record};

/// Link targets that are treated as photos.
const IMAGE_LINK_SUFFIXES: [&str; 4] = [".jpg", ".jpeg", ".png", ".gif"];

/// URL fields of a media entry, in priority order.
const URL_FIELDS: [&str; 3] = ["media_url_https", "media_url", "expanded_url"];

/// A media entry before URL resolution.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    url: Option<String>,
    kind: String,
}

/// Extract every downloadable asset referenced by a record.
///
/// Sources are merged in order without deduplication: the primary media
/// list, the extended media list, then image links. Slot numbers follow the
/// merged list, so an entry without a usable URL still occupies its slot.
pub fn extract_assets(record: &Record) -> Vec<AssetRef> {
    let record_id = record.id();

    collect_candidates(record)
        .into_iter()
        .enumerate()
        .filter_map(|(slot, candidate)| {
            let url = candidate.url?;
            Some(AssetRef::new(&record_id, slot, &url, &candidate.kind))
        })
        .collect()
}

fn collect_candidates(record: &Record) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    let entities = record.object_field("entities");

    if let Some(entities) = entities {
        candidates.extend(media_list(entities));
    }

    if let Some(extended) = record.object_field("extended_entities") {
        candidates.extend(media_list(extended));
    }

    if let Some(entities) = entities {
        candidates.extend(image_links(entities));
    }

    candidates
}

/// Entries of a `media` array inside an entities object.
fn media_list(entities: &Map<String, Value>) -> Vec<Candidate> {
    let Some(media) = entities.get("media").and_then(Value::as_array) else {
        return Vec::new();
    };

    media
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| Candidate {
            url: resolve_url(entry),
            kind: entry
                .get("type")
                .and_then(str_of)
                .unwrap_or("photo")
                .to_string(),
        })
        .collect()
}

/// Generic links whose target is an image file.
fn image_links(entities: &Map<String, Value>) -> Vec<Candidate> {
    let Some(urls) = entities.get("urls").and_then(Value::as_array) else {
        return Vec::new();
    };

    urls.iter()
        .filter_map(|link| link.get("expanded_url").and_then(str_of))
        .filter(|target| is_image_link(target))
        .map(|target| Candidate {
            url: Some(target.to_string()),
            kind: "photo".to_string(),
        })
        .collect()
}

fn is_image_link(target: &str) -> bool {
    let lower = target.to_lowercase();
    IMAGE_LINK_SUFFIXES
        .iter()
        .any(|suffix| lower.ends_with(suffix))
}

/// First non-empty URL field of a media entry.
fn resolve_url(entry: &Map<String, Value>) -> Option<String> {
    URL_FIELDS
        .iter()
        .find_map(|field| entry.get(*field).and_then(str_of))
        .map(str::to_string)
}
