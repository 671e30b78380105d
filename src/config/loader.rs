//! Configuration structures and loading logic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub targets: TargetsConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub options: OptionsConfig,
}

/// Which collections to harvest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetsConfig {
    /// Usernames listed inline.
    #[serde(default)]
    pub usernames: Vec<String>,

    /// JSON file holding an array of usernames.
    #[serde(default)]
    pub usernames_file: Option<PathBuf>,
}

/// Upstream API access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bearer token for the SocialData API.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Harvest options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Root directory for snapshots and downloaded assets.
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    /// Minimum pause between two page requests of one collection.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Random extra pause added to `page_delay_ms`.
    #[serde(default)]
    pub page_delay_jitter_ms: u64,

    /// Downloads running at the same time, across all collections.
    #[serde(default = "default_max_downloads")]
    pub max_concurrent_downloads: usize,

    /// Collections harvested at the same time.
    #[serde(default = "default_max_collections")]
    pub max_concurrent_collections: usize,

    /// Upper bound on waiting for downloads at the end of a run.
    #[serde(default = "default_drain_timeout")]
    pub download_drain_timeout_seconds: u64,

    /// Extra retry passes over failed downloads within one run.
    #[serde(default = "default_retry_sweeps")]
    pub retry_sweeps: u32,

    /// Write a site-data document per collection here after each run.
    #[serde(default)]
    pub export_directory: Option<PathBuf>,

    /// Whether to show live progress.
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            data_directory: default_data_directory(),
            page_delay_ms: default_page_delay(),
            page_delay_jitter_ms: 0,
            max_concurrent_downloads: default_max_downloads(),
            max_concurrent_collections: default_max_collections(),
            download_drain_timeout_seconds: default_drain_timeout(),
            retry_sweeps: default_retry_sweeps(),
            export_directory: None,
            show_progress: true,
        }
    }
}

fn default_base_url() -> String {
    crate::api::DEFAULT_BASE_URL.to_string()
}

fn default_user_agent() -> String {
    format!("feed-harvester/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> u64 {
    60
}

fn default_data_directory() -> PathBuf {
    PathBuf::from("intermediates").join("twitter")
}

fn default_page_delay() -> u64 {
    1000
}

fn default_max_downloads() -> usize {
    4
}

fn default_max_collections() -> usize {
    8
}

fn default_drain_timeout() -> u64 {
    600
}

fn default_retry_sweeps() -> u32 {
    2
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}. Create one from config.example.toml",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Usernames from the config and the usernames file.
    ///
    /// Leading `@` is stripped and duplicates are dropped, keeping the
    /// first occurrence.
    pub fn resolve_usernames(&self) -> Result<Vec<String>> {
        let mut names = self.targets.usernames.clone();

        if let Some(path) = &self.targets.usernames_file {
            let content = fs::read_to_string(path).map_err(|e| {
                Error::Config(format!(
                    "Could not read usernames file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let listed: Vec<String> = serde_json::from_str(&content)?;
            names.extend(listed);
        }

        let mut seen = HashSet::new();
        Ok(names
            .iter()
            .map(|name| name.trim().trim_start_matches('@').to_string())
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect())
    }

    pub fn data_directory(&self) -> &Path {
        &self.options.data_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [targets]
            usernames = ["jack"]

            [api]
            api_key = "secret-key"
            "#,
        )
        .unwrap();

        assert_eq!(config.targets.usernames, vec!["jack"]);
        assert_eq!(config.api.base_url, "https://api.socialdata.tools/twitter/");
        assert_eq!(config.options.page_delay_ms, 1000);
        assert_eq!(config.options.max_concurrent_downloads, 4);
        assert_eq!(config.options.retry_sweeps, 2);
        assert_eq!(
            config.data_directory(),
            Path::new("intermediates").join("twitter")
        );
        assert!(config.options.export_directory.is_none());
    }

    #[test]
    fn test_empty_file_is_valid_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.api.api_key.is_empty());
        assert!(config.options.show_progress);
    }

    #[test]
    fn test_resolve_usernames_merges_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("usernames.json");
        fs::write(&file, r#"["@ann", "jack", "Bob"]"#).unwrap();

        let mut config = Config::default();
        config.targets.usernames = vec!["@jack".into(), "bob".into()];
        config.targets.usernames_file = Some(file);

        assert_eq!(config.resolve_usernames().unwrap(), vec!["jack", "bob", "ann"]);
    }

    #[test]
    fn test_missing_usernames_file_is_config_error() {
        let mut config = Config::default();
        config.targets.usernames_file = Some(PathBuf::from("/nonexistent/usernames.json"));
        assert!(matches!(config.resolve_usernames(), Err(Error::Config(_))));
    }
}
