//! Asset references derived from records.

use url::Url;

/// Extension used when the URL does not reveal one.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// One downloadable media item embedded in a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    /// Identity of the owning record.
    pub record_id: String,

    /// Position in the record's merged candidate list.
    pub slot: usize,

    /// Resolved download URL.
    pub url: String,

    /// File extension (without dot).
    pub extension: String,

    /// Upstream media type (`photo`, `video`, ...).
    pub kind: String,
}

impl AssetRef {
    pub fn new(record_id: &str, slot: usize, url: &str, kind: &str) -> Self {
        Self {
            record_id: record_id.to_string(),
            slot,
            url: url.to_string(),
            extension: infer_extension(url),
            kind: kind.to_string(),
        }
    }

    /// Deterministic file name for this asset.
    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.record_id, self.slot, self.extension)
    }

    /// Ledger key of this asset.
    pub fn key(&self) -> AssetKey {
        AssetKey {
            record_id: self.record_id.clone(),
            url: self.url.clone(),
        }
    }
}

/// Identity of an asset in the retry ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetKey {
    pub record_id: String,
    pub url: String,
}

/// Infer the file extension of a media URL.
///
/// Looks at the last path segment first, then at a `format=` query
/// parameter (media hosts often serve `...?format=png&name=large`).
pub fn infer_extension(url: &str) -> String {
    extension_from_path(url)
        .or_else(|| extension_from_query(url))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
}

fn extension_from_path(url: &str) -> Option<String> {
    // Remove query string and fragment
    let path = url.split(['?', '#']).next()?;
    let filename = path.rsplit('/').next()?;
    let (_, ext) = filename.rsplit_once('.')?;
    accept_extension(ext)
}

fn extension_from_query(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let format = parsed
        .query_pairs()
        .find(|(key, _)| key == "format")
        .map(|(_, value)| value.into_owned())?;
    accept_extension(&format)
}

/// Accept an extension only if it names a known media type.
fn accept_extension(ext: &str) -> Option<String> {
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    let ext = ext.to_lowercase();
    mime_guess::from_ext(&ext).first().map(|_| ext)
}
