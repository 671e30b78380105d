//! Record module: feed items, their identity and embedded assets.

pub mod asset;
pub mod extractor;
pub mod item;

pub use asset::{infer_extension, AssetKey, AssetRef};
pub use extractor::extract_assets;
pub use item::{compare_ids, oldest_id, Record};
