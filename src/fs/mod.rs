//! Filesystem module.
//!
//! Provides:
//! - Collection directory layout
//! - Filename sanitising

pub mod naming;
pub mod paths;

pub use naming::{sanitize_filename, sanitize_path_component};
pub use paths::{asset_path, collection_dir, export_path, snapshot_path};
