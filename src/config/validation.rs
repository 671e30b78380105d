//! Configuration validation logic.

use crate::config::loader::Config;
use crate::error::{Error, Result};
use regex::Regex;

/// Screen names upstream: letters, digits and underscores, at most 15 characters.
const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_]{1,15}$";

/// Validate the entire configuration against the resolved usernames.
pub fn validate_config(config: &Config, usernames: &[String]) -> Result<()> {
    validate_api_key(&config.api.api_key)?;
    validate_usernames(usernames)?;
    validate_limits(config)?;

    Ok(())
}

/// Validate the API key.
pub fn validate_api_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::MissingConfig(
            "api_key (set it in [api], pass --api-key or export SOCIALDATA_API_KEY)".to_string(),
        ));
    }

    // Check for placeholder values
    let key_lower = key.to_lowercase();
    if key_lower.contains("replaceme") || key_lower.contains("your_api_key") {
        return Err(Error::ConfigValidation {
            field: "api_key".to_string(),
            message: "API key appears to be a placeholder. Please provide your actual key."
                .to_string(),
        });
    }

    Ok(())
}

/// Validate collection usernames.
pub fn validate_usernames<S: AsRef<str>, I: IntoIterator<Item = S>>(usernames: I) -> Result<()> {
    let usernames: Vec<_> = usernames.into_iter().collect();

    if usernames.is_empty() {
        return Err(Error::MissingConfig(
            "usernames (at least one username required)".to_string(),
        ));
    }

    let username_pattern =
        Regex::new(USERNAME_PATTERN).map_err(|e| Error::Config(e.to_string()))?;

    for username in usernames {
        let username = username.as_ref();
        let clean_username = username.trim_start_matches('@');

        if !username_pattern.is_match(clean_username) {
            return Err(Error::ConfigValidation {
                field: "usernames".to_string(),
                message: format!(
                    "Username '{}' is invalid. Use 1-15 letters, digits or underscores.",
                    username
                ),
            });
        }

        let lower = clean_username.to_lowercase();
        if lower == "replaceme" || lower == "username" {
            return Err(Error::ConfigValidation {
                field: "usernames".to_string(),
                message: format!(
                    "Username '{}' appears to be a placeholder. Please provide actual usernames.",
                    username
                ),
            });
        }
    }

    Ok(())
}

/// Validate numeric limits.
pub fn validate_limits(config: &Config) -> Result<()> {
    let options = &config.options;

    for (field, value) in [
        ("max_concurrent_downloads", options.max_concurrent_downloads as u64),
        ("max_concurrent_collections", options.max_concurrent_collections as u64),
        ("download_drain_timeout_seconds", options.download_drain_timeout_seconds),
        ("request_timeout_seconds", config.api.request_timeout_seconds),
    ] {
        if value == 0 {
            return Err(Error::ConfigValidation {
                field: field.to_string(),
                message: "Must be at least 1".to_string(),
            });
        }
    }

    if options.max_concurrent_downloads > options.max_concurrent_collections {
        tracing::warn!(
            "max_concurrent_downloads ({}) exceeds max_concurrent_collections ({})",
            options.max_concurrent_downloads,
            options.max_concurrent_collections
        );
    }

    Ok(())
}
