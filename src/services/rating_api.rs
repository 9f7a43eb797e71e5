use crate::core::traits::RatingSource;
use crate::models::{GameAccount, Gamemode};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ENDPOINT: &str = "https://api.ageofempires.com/api/ageiv/Leaderboard";
pub const DEFAULT_REGION: &str = "7";

/// Errors that can occur when querying the leaderboard
#[derive(Debug, Error)]
pub enum RatingApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(StatusCode),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Leaderboard search payload
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub region: String,
    pub versus: String,
    #[serde(rename = "matchType")]
    pub match_type: String,
    #[serde(rename = "teamSize", skip_serializing_if = "Option::is_none")]
    pub team_size: Option<String>,
    #[serde(rename = "searchPlayer")]
    pub search_player: String,
}

impl LeaderboardQuery {
    pub fn new(region: &str, mode: Gamemode, search_player: &str) -> Self {
        let match_type = match mode {
            Gamemode::Custom => "custom",
            _ => "unranked",
        };

        Self {
            region: region.to_string(),
            versus: "players".to_string(),
            match_type: match_type.to_string(),
            team_size: mode.team_size().map(str::to_string),
            search_player: search_player.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LeaderboardResponse {
    #[serde(default)]
    count: u32,
    #[serde(default)]
    items: Vec<LeaderboardEntry>,
}

#[derive(Debug, Deserialize)]
struct LeaderboardEntry {
    #[serde(rename = "userId", default)]
    user_id: Option<String>,
    #[serde(rename = "rlUserId", default)]
    rl_user_id: Option<i64>,
    #[serde(rename = "userName", default)]
    user_name: Option<String>,
    elo: i32,
}

impl LeaderboardEntry {
    fn matches(&self, account: &GameAccount) -> bool {
        if account.account_id.is_empty() {
            return self
                .user_name
                .as_deref()
                .is_some_and(|name| name.eq_ignore_ascii_case(&account.username));
        }

        self.user_id.as_deref() == Some(account.account_id.as_str())
            || self
                .rl_user_id
                .is_some_and(|id| id.to_string() == account.account_id)
    }
}

/// Age of Empires IV leaderboard client
///
/// One POST per (account, gamemode). A 204, an empty item list, or no entry
/// matching the account all mean "no rating".
pub struct RatingApiClient {
    endpoint: String,
    region: String,
    client: Client,
}

impl RatingApiClient {
    /// Create a new leaderboard client with a per-request deadline
    pub fn new(
        endpoint: String,
        region: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, RatingApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            endpoint,
            region,
            client,
        })
    }

    /// Query the rating of an account in one gamemode
    pub async fn query_rating(
        &self,
        account: &GameAccount,
        mode: Gamemode,
    ) -> Result<Option<i32>, RatingApiError> {
        let query = LeaderboardQuery::new(&self.region, mode, &account.username);

        tracing::debug!("Querying {} rating for {}", mode, account.username);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RatingApiError::ApiError(status));
        }

        let body: LeaderboardResponse = response
            .json()
            .await
            .map_err(|e| RatingApiError::InvalidResponse(e.to_string()))?;

        if body.count < 1 {
            return Ok(None);
        }

        Ok(body
            .items
            .iter()
            .find(|entry| entry.matches(account))
            .map(|entry| entry.elo))
    }
}

#[async_trait]
impl RatingSource for RatingApiClient {
    async fn fetch_rating(&self, account: &GameAccount, mode: Gamemode) -> Option<i32> {
        match self.query_rating(account, mode).await {
            Ok(rating) => rating,
            Err(e) => {
                tracing::debug!("No {} rating for {}: {}", mode, account.username, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_mode_payload() {
        let query = LeaderboardQuery::new("7", Gamemode::TwoVTwo, "player");
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["matchType"], "unranked");
        assert_eq!(json["teamSize"], "2v2");
        assert_eq!(json["versus"], "players");
    }

    #[test]
    fn test_custom_payload_omits_team_size() {
        let query = LeaderboardQuery::new("7", Gamemode::Custom, "player");
        let json = serde_json::to_value(&query).unwrap();

        assert_eq!(json["matchType"], "custom");
        assert!(json.get("teamSize").is_none());
    }

    #[test]
    fn test_entry_matches_by_either_id() {
        let entry = LeaderboardEntry {
            user_id: Some("abc".to_string()),
            rl_user_id: Some(42),
            user_name: Some("Player".to_string()),
            elo: 1000,
        };

        let by_rl = GameAccount { username: "player".into(), account_id: "42".into() };
        let by_user = GameAccount { username: "player".into(), account_id: "abc".into() };
        let by_name = GameAccount { username: "player".into(), account_id: String::new() };
        let other = GameAccount { username: "player".into(), account_id: "7".into() };

        assert!(entry.matches(&by_rl));
        assert!(entry.matches(&by_user));
        assert!(entry.matches(&by_name));
        assert!(!entry.matches(&other));
    }
}
