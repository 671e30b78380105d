//! Configuration module.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Resolving the list of collections to harvest
//! - Configuration validation

pub mod loader;
pub mod validation;

pub use loader::{ApiConfig, Config, OptionsConfig, TargetsConfig};
pub use validation::validate_config;
