//! API response type definitions.

use serde::Deserialize;
use serde_json::Value;

/// Response of the search endpoint.
///
/// Tweets stay schema-less; the engine only reads the fields it needs.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tweets: Vec<Value>,
}

/// Subset of the user profile used for progress estimates.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub id_str: Option<String>,
    pub screen_name: Option<String>,
    pub statuses_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_search_response_without_tweets() {
        let parsed: SearchResponse = serde_json::from_value(json!({"next_cursor": null})).unwrap();
        assert!(parsed.tweets.is_empty());
    }

    #[test]
    fn test_profile_ignores_unknown_fields() {
        let parsed: UserProfile = serde_json::from_value(json!({
            "id_str": "12",
            "screen_name": "jack",
            "statuses_count": 29000,
            "followers_count": 1
        }))
        .unwrap();
        assert_eq!(parsed.statuses_count, Some(29000));
    }
}
