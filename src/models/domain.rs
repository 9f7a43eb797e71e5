use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

/// Priority assumed for a member holding no bracket role in a gamemode.
///
/// Configured priorities must be strictly lower, so any real bracket counts
/// as a promotion over "unranked".
pub const UNRANKED_PRIORITY: i32 = 9999;

/// Competitive category with its own rating and bracket table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gamemode {
    #[serde(rename = "1v1")]
    OneVOne,
    #[serde(rename = "2v2")]
    TwoVTwo,
    #[serde(rename = "3v3")]
    ThreeVThree,
    #[serde(rename = "4v4")]
    FourVFour,
    #[serde(rename = "custom")]
    Custom,
}

impl Gamemode {
    pub const ALL: [Gamemode; 5] = [
        Gamemode::OneVOne,
        Gamemode::TwoVTwo,
        Gamemode::ThreeVThree,
        Gamemode::FourVFour,
        Gamemode::Custom,
    ];

    /// Short label used in config keys and the rating service payload
    pub fn label(self) -> &'static str {
        match self {
            Gamemode::OneVOne => "1v1",
            Gamemode::TwoVTwo => "2v2",
            Gamemode::ThreeVThree => "3v3",
            Gamemode::FourVFour => "4v4",
            Gamemode::Custom => "custom",
        }
    }

    /// Label shown to users in summaries
    pub fn display_name(self) -> &'static str {
        match self {
            Gamemode::Custom => "Custom",
            other => other.label(),
        }
    }

    /// Team size selector, `None` for the custom bucket
    pub fn team_size(self) -> Option<&'static str> {
        match self {
            Gamemode::Custom => None,
            other => Some(other.label()),
        }
    }
}

impl fmt::Display for Gamemode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Gamemode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gamemode::ALL
            .into_iter()
            .find(|mode| mode.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown gamemode '{}'", s))
    }
}

/// Ratings keyed by gamemode; a missing entry means "no rating known"
pub type Ratings = BTreeMap<Gamemode, i32>;

/// One role tier within a gamemode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub role_id: String,
    /// Inclusive lower bound
    pub starting_rating: i32,
    /// Inclusive upper bound
    pub ending_rating: i32,
    /// Lower is more prestigious
    pub priority: i32,
    /// Fallback display name when the platform role name is unavailable
    #[serde(default)]
    pub name: Option<String>,
}

impl Bracket {
    #[inline]
    pub fn contains(&self, rating: i32) -> bool {
        rating >= self.starting_rating && rating <= self.ending_rating
    }
}

/// Bracket table for one gamemode
#[derive(Debug, Clone, Default)]
pub struct GamemodeConfig {
    pub enabled: bool,
    /// Scanned in order; first containing bracket wins
    pub brackets: Vec<Bracket>,
    /// role id -> priority, built once at load
    pub role_priorities: HashMap<String, i32>,
}

impl GamemodeConfig {
    pub fn new(enabled: bool, brackets: Vec<Bracket>) -> Self {
        let role_priorities = brackets
            .iter()
            .map(|b| (b.role_id.clone(), b.priority))
            .collect();

        Self {
            enabled,
            brackets,
            role_priorities,
        }
    }

    pub fn bracket_for_role(&self, role_id: &str) -> Option<&Bracket> {
        self.brackets.iter().find(|b| b.role_id == role_id)
    }
}

/// Per-guild engine configuration
#[derive(Debug, Clone, Default)]
pub struct GuildConfig {
    pub guild_id: String,
    pub notification_channel_id: String,
    pub admin_roles: HashSet<String>,
    pub post_summary: bool,
    pub gamemodes: BTreeMap<Gamemode, GamemodeConfig>,
}

impl GuildConfig {
    /// Enabled gamemodes in stable order
    pub fn enabled_gamemodes(&self) -> Vec<Gamemode> {
        self.gamemodes
            .iter()
            .filter(|(_, cfg)| cfg.enabled)
            .map(|(mode, _)| *mode)
            .collect()
    }

    pub fn is_enabled(&self, mode: Gamemode) -> bool {
        self.gamemodes.get(&mode).is_some_and(|cfg| cfg.enabled)
    }

    /// Whether any of the given roles grants administrative access.
    /// Guilds without configured admin roles allow everyone.
    pub fn is_admin<S: AsRef<str>>(&self, role_ids: &[S]) -> bool {
        self.admin_roles.is_empty()
            || role_ids
                .iter()
                .any(|role| self.admin_roles.contains(role.as_ref()))
    }
}

/// Immutable configuration for all guilds, loaded once
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub guilds: HashMap<String, GuildConfig>,
}

impl EngineConfig {
    pub fn guild(&self, guild_id: &str) -> Option<&GuildConfig> {
        self.guilds.get(guild_id)
    }

    pub fn guild_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.guilds.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// External game account linked to a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAccount {
    pub username: String,
    /// Platform account id; empty when only the username is known
    pub account_id: String,
}

/// Registered member of a guild
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(rename = "memberId")]
    pub member_id: String,
    #[serde(rename = "guildId")]
    pub guild_id: String,
    #[serde(rename = "accountUsername")]
    pub account_username: String,
    #[serde(rename = "accountId")]
    pub account_id: String,
    /// Last-known-good ratings
    #[serde(rename = "currentRatings", default)]
    pub current_ratings: Ratings,
    /// Working ratings of the in-progress pass
    #[serde(rename = "newRatings", default)]
    pub new_ratings: Ratings,
    #[serde(rename = "updatedAt", default)]
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl MemberRecord {
    pub fn new(
        member_id: impl Into<String>,
        guild_id: impl Into<String>,
        account_username: impl Into<String>,
        account_id: impl Into<String>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            guild_id: guild_id.into(),
            account_username: account_username.into(),
            account_id: account_id.into(),
            current_ratings: Ratings::new(),
            new_ratings: Ratings::new(),
            updated_at: None,
        }
    }

    pub fn account(&self) -> GameAccount {
        GameAccount {
            username: self.account_username.clone(),
            account_id: self.account_id.clone(),
        }
    }

    pub fn current_rating(&self, mode: Gamemode) -> Option<i32> {
        self.current_ratings.get(&mode).copied()
    }

    pub fn new_rating(&self, mode: Gamemode) -> Option<i32> {
        self.new_ratings.get(&mode).copied()
    }

    /// Highest rating among `modes`, working value first. Display only.
    pub fn highest_rating(&self, modes: &[Gamemode]) -> Option<i32> {
        modes
            .iter()
            .filter_map(|&mode| self.new_rating(mode).or(self.current_rating(mode)))
            .max()
    }

    /// Modes whose working rating differs from the last-known-good one
    pub fn changed_modes(&self) -> Vec<Gamemode> {
        Gamemode::ALL
            .into_iter()
            .filter(|mode| self.new_rating(*mode) != self.current_rating(*mode))
            .collect()
    }

    /// Promote working ratings to last-known-good
    pub fn commit_ratings(&mut self) {
        self.current_ratings = self.new_ratings.clone();
    }
}

/// Rating movement of one member in one gamemode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingChange {
    #[serde(rename = "memberId")]
    pub member_id: String,
    pub gamemode: Gamemode,
    pub previous: Option<i32>,
    pub current: Option<i32>,
}
