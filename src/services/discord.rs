use crate::core::traits::{ChatPlatform, GuildSnapshot, MemberState, PlatformError};
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";

const MEMBER_PAGE_SIZE: usize = 1000;
const AUDIT_REASON: &str = "Elo bracket update";

/// Errors that can occur when calling the Discord REST API
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Rate limited, retry after {0:.1}s")]
    RateLimited(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: invalid bot token")]
    Unauthorized,
}

impl From<DiscordError> for PlatformError {
    fn from(value: DiscordError) -> Self {
        match value {
            DiscordError::RequestError(e) => PlatformError::Request(e.to_string()),
            DiscordError::RateLimited(secs) => PlatformError::RateLimited(secs),
            DiscordError::NotFound(what) => PlatformError::NotFound(what),
            other => PlatformError::Api(other.to_string()),
        }
    }
}

/// Guild role as returned by the API
#[derive(Debug, Clone, Deserialize)]
pub struct GuildRole {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ApiUser {
    id: String,
    username: String,
    #[serde(default)]
    global_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    user: ApiUser,
    #[serde(default)]
    nick: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
}

impl ApiMember {
    fn into_state(self) -> MemberState {
        let display_name = self
            .nick
            .filter(|n| !n.is_empty())
            .or(self.user.global_name)
            .unwrap_or(self.user.username);

        MemberState {
            member_id: self.user.id,
            display_name,
            role_ids: self.roles,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Discord bot REST client
///
/// Role lists are cached per guild for `role_cache_ttl`; member role state is
/// always read fresh when a snapshot is taken.
pub struct DiscordClient {
    base_url: String,
    token: String,
    client: Client,
    roles: Cache<String, Arc<Vec<GuildRole>>>,
}

impl DiscordClient {
    /// Create a new Discord client
    pub fn new(
        base_url: String,
        token: String,
        timeout: Duration,
        role_cache_ttl: Duration,
    ) -> Result<Self, DiscordError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(
                "DiscordBot (https://github.com/elo-sync/elo-sync, ",
                env!("CARGO_PKG_VERSION"),
                ")"
            ))
            .build()?;

        let roles = Cache::builder()
            .max_capacity(1024)
            .time_to_live(role_cache_ttl)
            .build();

        Ok(Self {
            base_url,
            token,
            client,
            roles,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .header("Authorization", format!("Bot {}", self.token))
    }

    async fn check(response: Response, what: &str) -> Result<Response, DiscordError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .json::<RateLimitBody>()
                    .await
                    .map(|b| b.retry_after)
                    .unwrap_or(1.0);
                Err(DiscordError::RateLimited(retry_after))
            }
            StatusCode::UNAUTHORIZED => Err(DiscordError::Unauthorized),
            StatusCode::NOT_FOUND => Err(DiscordError::NotFound(what.to_string())),
            _ => {
                let body = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unable to read body".to_string());
                tracing::error!("Discord call {} failed: {} - {}", what, status, body);
                Err(DiscordError::ApiError(format!("{}: {}", what, status)))
            }
        }
    }

    /// Role list of a guild, served from cache when fresh
    pub async fn guild_roles(&self, guild_id: &str) -> Result<Arc<Vec<GuildRole>>, DiscordError> {
        if let Some(roles) = self.roles.get(guild_id).await {
            tracing::trace!("Role cache hit: {}", guild_id);
            return Ok(roles);
        }

        let response = self
            .request(Method::GET, &format!("/guilds/{}/roles", guild_id))
            .send()
            .await?;
        let roles: Vec<GuildRole> = Self::check(response, "list roles").await?.json().await?;

        let roles = Arc::new(roles);
        self.roles.insert(guild_id.to_string(), Arc::clone(&roles)).await;
        Ok(roles)
    }

    /// Role state of the wanted members, paging through the guild member list
    async fn member_states(
        &self,
        guild_id: &str,
        wanted: &HashSet<&str>,
    ) -> Result<HashMap<String, MemberState>, DiscordError> {
        let mut states = HashMap::with_capacity(wanted.len());
        let mut after = "0".to_string();

        loop {
            let response = self
                .request(Method::GET, &format!("/guilds/{}/members", guild_id))
                .query(&[("limit", MEMBER_PAGE_SIZE.to_string()), ("after", after.clone())])
                .send()
                .await?;
            let page: Vec<ApiMember> = Self::check(response, "list members").await?.json().await?;

            let page_len = page.len();
            if let Some(last) = page.last() {
                after = last.user.id.clone();
            }

            for member in page {
                if wanted.contains(member.user.id.as_str()) {
                    let state = member.into_state();
                    states.insert(state.member_id.clone(), state);
                }
            }

            if page_len < MEMBER_PAGE_SIZE || states.len() == wanted.len() {
                break;
            }
        }

        tracing::debug!(
            "Snapshot of guild {}: {}/{} members present",
            guild_id,
            states.len(),
            wanted.len()
        );

        Ok(states)
    }

    async fn member_role(
        &self,
        method: Method,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), DiscordError> {
        let response = self
            .request(
                method,
                &format!("/guilds/{}/members/{}/roles/{}", guild_id, member_id, role_id),
            )
            .header("X-Audit-Log-Reason", urlencoding::encode(AUDIT_REASON).into_owned())
            .send()
            .await?;
        Self::check(response, "member role").await?;
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn guild_snapshot(
        &self,
        guild_id: &str,
        member_ids: &[String],
    ) -> Result<GuildSnapshot, PlatformError> {
        let roles = self.guild_roles(guild_id).await?;
        let wanted: HashSet<&str> = member_ids.iter().map(String::as_str).collect();
        let members = self.member_states(guild_id, &wanted).await?;

        Ok(GuildSnapshot {
            guild_id: guild_id.to_string(),
            role_names: roles
                .iter()
                .map(|role| (role.id.clone(), role.name.clone()))
                .collect(),
            members,
        })
    }

    async fn add_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        Ok(self.member_role(Method::PUT, guild_id, member_id, role_id).await?)
    }

    async fn remove_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        Ok(self.member_role(Method::DELETE, guild_id, member_id, role_id).await?)
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        let response = self
            .request(Method::POST, &format!("/channels/{}/messages", channel_id))
            .json(&json!({
                "content": content,
                "allowed_mentions": { "parse": ["users"] },
            }))
            .send()
            .await
            .map_err(DiscordError::from)?;
        Self::check(response, "send message").await?;
        Ok(())
    }
}
