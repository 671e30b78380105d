//! One JSON document per collection for static-site generators.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::fs::{asset_path, export_path};
use crate::record::{extract_assets, Record};
use crate::store::{write_atomic, Snapshot};

const PROFILE_BASE: &str = "https://twitter.com";

#[derive(Debug, Clone, Serialize)]
pub struct SiteDocument {
    pub username: String,
    pub profile_url: String,
    pub tweet_count: usize,
    pub tweets: Vec<ExportedTweet>,
    /// Unix time in seconds.
    pub last_processed: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedTweet {
    pub id: String,
    pub text: String,
    pub created_at: String,
    pub url: String,
    pub images: Vec<ExportedImage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedImage {
    pub filename: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub downloaded: bool,
    /// Local file, present only when downloaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Build the export document for a snapshot whose assets live in `collection_dir`.
pub fn build_document(snapshot: &Snapshot, collection_dir: &Path) -> Result<SiteDocument> {
    let username = snapshot.collection_key.clone();
    let tweets = snapshot
        .records
        .iter()
        .map(|record| export_tweet(&username, record, collection_dir))
        .collect::<Result<Vec<_>>>()?;

    Ok(SiteDocument {
        profile_url: format!("{}/{}", PROFILE_BASE, username),
        tweet_count: tweets.len(),
        tweets,
        last_processed: Utc::now().timestamp_millis() as f64 / 1000.0,
        username,
    })
}

fn export_tweet(username: &str, record: &Record, collection_dir: &Path) -> Result<ExportedTweet> {
    let id = record.id();
    let mut images = Vec::new();
    let mut seen = HashSet::new();

    // The same media usually sits in both media lists; only its first slot is downloaded
    for asset in extract_assets(record) {
        if !seen.insert(asset.url.clone()) {
            continue;
        }
        let file = asset_path(collection_dir, &asset)?;
        let downloaded = file.is_file();
        images.push(ExportedImage {
            filename: asset.file_name(),
            url: asset.url,
            kind: asset.kind,
            downloaded,
            path: downloaded.then(|| file.display().to_string()),
        });
    }

    Ok(ExportedTweet {
        url: format!("{}/{}/status/{}", PROFILE_BASE, username, id),
        text: record.text().unwrap_or_default().to_string(),
        created_at: record.created_at().unwrap_or_default().to_string(),
        id,
        images,
    })
}

/// Write `<export_dir>/<collection>.json` atomically and return its path.
pub fn export_collection(
    snapshot: &Snapshot,
    collection_dir: &Path,
    export_dir: &Path,
) -> Result<PathBuf> {
    let document = build_document(snapshot, collection_dir)?;
    let target = export_path(export_dir, &snapshot.collection_key)?;

    tracing::info!(
        "Exporting {} tweets for @{} to {}",
        document.tweet_count,
        snapshot.collection_key,
        target.display()
    );
    write_atomic(&target, &serde_json::to_vec_pretty(&document)?)?;
    Ok(target)
}
