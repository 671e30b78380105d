//! Site-data export of harvested collections.

pub mod site;

pub use site::{build_document, export_collection, ExportedImage, ExportedTweet, SiteDocument};
