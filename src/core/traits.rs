//! Collaborator traits the engine is written against.
//!
//! The engine never talks to HTTP or SQL directly; `services` provides the
//! production implementations and tests substitute in-memory fakes.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{GameAccount, Gamemode, MemberRecord};

/// Errors surfaced by a member repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Member not found: {0}")]
    NotFound(String),
}

/// Errors surfaced by the chat platform
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Rate limited, retry after {0:.1}s")]
    RateLimited(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API returned error: {0}")]
    Api(String),
}

/// Source of per-gamemode ratings.
///
/// Any failure (transport, status, empty result) is reported as `None`;
/// callers treat all of them as "no new information".
#[async_trait]
pub trait RatingSource: Send + Sync {
    async fn fetch_rating(&self, account: &GameAccount, mode: Gamemode) -> Option<i32>;
}

/// Persistent store of member records keyed by (member id, guild id)
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn upsert(&self, member: &MemberRecord) -> Result<(), RepositoryError>;

    async fn get_by_id_and_guild(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<Option<MemberRecord>, RepositoryError>;

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<MemberRecord>, RepositoryError>;

    /// Cheap connectivity check
    async fn ping(&self) -> bool {
        true
    }
}

/// Role state of one guild member at snapshot time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberState {
    pub member_id: String,
    pub display_name: String,
    pub role_ids: Vec<String>,
}

impl MemberState {
    /// Platform mention markup
    pub fn mention(&self) -> String {
        format!("<@{}>", self.member_id)
    }

    pub fn has_role(&self, role_id: &str) -> bool {
        self.role_ids.iter().any(|r| r == role_id)
    }
}

/// Read-mostly view of a guild taken once per synchronization pass
#[derive(Debug, Clone, Default)]
pub struct GuildSnapshot {
    pub guild_id: String,
    /// role id -> role name
    pub role_names: HashMap<String, String>,
    /// member id -> role state, only for members still in the guild
    pub members: HashMap<String, MemberState>,
}

impl GuildSnapshot {
    pub fn role_name(&self, role_id: &str) -> Option<&str> {
        self.role_names.get(role_id).map(String::as_str)
    }
}

/// Chat platform operations used by the engine
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Role names plus the role lists of the requested members
    async fn guild_snapshot(
        &self,
        guild_id: &str,
        member_ids: &[String],
    ) -> Result<GuildSnapshot, PlatformError>;

    async fn add_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_member_role(
        &self,
        guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError>;

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError>;
}
