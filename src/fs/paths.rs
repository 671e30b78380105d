//! On-disk layout of collections.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::naming::{sanitize_filename, sanitize_path_component};
use crate::record::AssetRef;

/// Suffix of snapshot documents inside a collection directory.
const SNAPSHOT_SUFFIX: &str = "_tweets.json";

/// `<root>/<collection>`
pub fn collection_dir(root: &Path, key: &str) -> Result<PathBuf> {
    Ok(root.join(sanitize_path_component(key)?))
}

/// `<root>/<collection>/<collection>_tweets.json`
pub fn snapshot_path(root: &Path, key: &str) -> Result<PathBuf> {
    let component = sanitize_path_component(key)?;
    Ok(root
        .join(&component)
        .join(format!("{}{}", component, SNAPSHOT_SUFFIX)))
}

/// Destination of one asset inside its collection directory.
pub fn asset_path(collection_dir: &Path, asset: &AssetRef) -> Result<PathBuf> {
    Ok(collection_dir.join(sanitize_filename(&asset.file_name())?))
}

/// `<export_dir>/<collection>.json`
pub fn export_path(export_dir: &Path, key: &str) -> Result<PathBuf> {
    Ok(export_dir.join(format!("{}.json", sanitize_path_component(key)?)))
}
