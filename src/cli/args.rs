//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;

/// Resumable tweet and media harvester CLI.
#[derive(Parser, Debug)]
#[command(
    name = "feed-harvester",
    version,
    about = "Archive tweets and their images for one or more users",
    long_about = "Fetches the complete tweet history of each user through the SocialData API,\n\
                  downloads embedded images and keeps resumable progress on disk.\n\n\
                  Interrupted runs continue where they stopped."
)]
pub struct Args {
    /// Username(s) to harvest.
    /// Can specify multiple users separated by spaces.
    #[arg(short, long, value_delimiter = ' ', num_args = 1..)]
    pub user: Option<Vec<String>>,

    /// JSON file with an array of usernames.
    #[arg(long = "users-file")]
    pub usernames_file: Option<PathBuf>,

    /// Root directory for snapshots and images.
    #[arg(short = 'd', long = "directory")]
    pub data_directory: Option<PathBuf>,

    /// SocialData API key.
    #[arg(short = 'k', long = "api-key", env = "SOCIALDATA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Maximum parallel image downloads across all users.
    #[arg(long = "max-downloads")]
    pub max_downloads: Option<usize>,

    /// Maximum users harvested at the same time.
    #[arg(long = "max-collections")]
    pub max_collections: Option<usize>,

    /// Milliseconds to wait between two page requests of one user.
    #[arg(long = "page-delay-ms")]
    pub page_delay_ms: Option<u64>,

    /// Seconds to wait for outstanding downloads at the end of a run.
    #[arg(long = "drain-timeout")]
    pub drain_timeout: Option<u64>,

    /// Write a site-data JSON document per user into this directory.
    #[arg(long = "export-dir")]
    pub export_directory: Option<PathBuf>,

    /// Hide live progress.
    #[arg(long, short)]
    pub quiet: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(self, config: &mut Config) {
        // Override usernames if provided
        if let Some(users) = self.user {
            config.targets.usernames = users;
        }

        if let Some(file) = self.usernames_file {
            config.targets.usernames_file = Some(file);
        }

        if let Some(api_key) = self.api_key {
            config.api.api_key = api_key;
        }

        // Override options if provided
        if let Some(dir) = self.data_directory {
            config.options.data_directory = dir;
        }

        if let Some(max) = self.max_downloads {
            config.options.max_concurrent_downloads = max;
        }

        if let Some(max) = self.max_collections {
            config.options.max_concurrent_collections = max;
        }

        if let Some(delay) = self.page_delay_ms {
            config.options.page_delay_ms = delay;
        }

        if let Some(timeout) = self.drain_timeout {
            config.options.download_drain_timeout_seconds = timeout;
        }

        if let Some(dir) = self.export_directory {
            config.options.export_directory = Some(dir);
        }

        if self.quiet {
            config.options.show_progress = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let args = Args::parse_from([
            "feed-harvester",
            "--user",
            "jack ann",
            "--api-key",
            "sk-test",
            "--max-downloads",
            "2",
            "--export-dir",
            "site/data",
            "-q",
        ]);
        let mut config = Config::default();
        config.targets.usernames = vec!["bob".into()];
        args.merge_into_config(&mut config);

        assert_eq!(config.targets.usernames, vec!["jack", "ann"]);
        assert_eq!(config.api.api_key, "sk-test");
        assert_eq!(config.options.max_concurrent_downloads, 2);
        assert_eq!(config.options.export_directory, Some(PathBuf::from("site/data")));
        assert!(!config.options.show_progress);
        // untouched
        assert_eq!(config.options.page_delay_ms, 1000);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let args = Args::parse_from(["feed-harvester", "--config", "other.toml"]);
        assert_eq!(args.config, PathBuf::from("other.toml"));

        let mut config = Config::default();
        config.targets.usernames = vec!["bob".into()];
        config.options.show_progress = true;
        let before = config.options.data_directory.clone();
        let had_key = args.api_key.is_some();
        args.merge_into_config(&mut config);

        assert_eq!(config.targets.usernames, vec!["bob"]);
        assert_eq!(config.options.data_directory, before);
        assert!(config.options.show_progress);
        assert_eq!(!config.api.api_key.is_empty(), had_key);
    }
}
