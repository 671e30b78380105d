//! Error types for the feed-harvester application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    #[error("Missing required configuration: {0}")]
    MissingConfig(String),

    // Upstream errors
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    // Download errors
    #[error("Download failed: {0}")]
    Download(String),

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    #[error("Failed to replace {path}: {message}")]
    Persist { path: String, message: String },

    // Run control
    #[error("Run cancelled by stop signal")]
    Cancelled,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Whether the error came from the network or the upstream service
    /// rather than from local storage or configuration.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Http(_) | Error::Upstream { .. } | Error::Download(_)
        )
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const ABORT: i32 = 1;
    pub const API_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
    pub const SOME_USERS_FAILED: i32 = 6;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_classification() {
        let upstream = Error::Upstream {
            status: 503,
            body: "busy".into(),
        };
        assert!(upstream.is_transport());
        assert!(Error::Download("HTTP 500".into()).is_transport());
        assert!(!Error::Cancelled.is_transport());
        assert!(!Error::Io(std::io::Error::other("disk full")).is_transport());
    }

    #[test]
    fn test_upstream_message_keeps_body() {
        let err = Error::Upstream {
            status: 402,
            body: "Insufficient balance".into(),
        };
        assert_eq!(
            err.to_string(),
            "Upstream returned HTTP 402: Insufficient balance"
        );
    }
}
