use crate::models::{Bracket, GamemodeConfig, GuildConfig, Gamemode, MemberRecord, UNRANKED_PRIORITY};
use std::collections::HashMap;
use thiserror::Error;

/// Problems found in a guild's bracket tables
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("{mode}: bracket for role {role_id} starts at {start} but ends at {end}")]
    InvertedRange {
        mode: Gamemode,
        role_id: String,
        start: i32,
        end: i32,
    },

    #[error("{mode}: brackets for roles {first} and {second} overlap")]
    Overlap {
        mode: Gamemode,
        first: String,
        second: String,
    },

    #[error("{mode}: role {role_id} has priority {priority}, must be below {}", UNRANKED_PRIORITY)]
    PriorityOutOfRange {
        mode: Gamemode,
        role_id: String,
        priority: i32,
    },

    #[error("role {role_id} is used by both {first} and {second}")]
    DuplicateRole {
        role_id: String,
        first: Gamemode,
        second: Gamemode,
    },

    #[error("{mode}: bracket has an empty role id")]
    EmptyRoleId { mode: Gamemode },
}

/// Outcome of resolving one member in one gamemode
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a> {
    pub gamemode: Gamemode,
    /// Rating the decision was made on
    pub rating: Option<i32>,
    /// Bracket the member belongs in, `None` means no role
    pub target: Option<&'a Bracket>,
    /// Bracket role currently held, if any
    pub current_role_id: Option<String>,
    /// Priority of the held role, `UNRANKED_PRIORITY` when none
    pub previous_priority: i32,
    pub changed: bool,
}

impl<'a> Resolution<'a> {
    pub fn target_role_id(&self) -> Option<&'a str> {
        self.target.map(|b| b.role_id.as_str())
    }

    /// A change to a strictly better (numerically lower) priority
    pub fn is_promotion(&self) -> bool {
        match self.target {
            Some(target) => self.changed && self.previous_priority > target.priority,
            None => false,
        }
    }
}

/// First bracket in table order containing the rating
#[inline]
pub fn find_bracket(rating: i32, brackets: &[Bracket]) -> Option<&Bracket> {
    brackets.iter().find(|b| b.contains(rating))
}

/// Bracket role of this gamemode among the member's platform roles.
///
/// The first held role found in the role-priority map wins.
pub fn held_bracket_role<'r, S: AsRef<str>>(
    table: &GamemodeConfig,
    member_roles: &'r [S],
) -> Option<&'r str> {
    member_roles
        .iter()
        .map(|role| role.as_ref())
        .find(|role| table.role_priorities.contains_key(*role))
}

/// Decide which bracket role the member should hold for `mode`.
///
/// Uses the member's working rating for that mode only; other modes never
/// influence the decision.
pub fn resolve<'a>(
    member: &MemberRecord,
    mode: Gamemode,
    table: &'a GamemodeConfig,
    currently_held: Option<&str>,
) -> Resolution<'a> {
    let rating = member.new_rating(mode);
    let target = rating.and_then(|r| find_bracket(r, &table.brackets));

    let changed = target.map(|b| b.role_id.as_str()) != currently_held;

    let previous_priority = currently_held
        .and_then(|role| table.role_priorities.get(role).copied())
        .unwrap_or(UNRANKED_PRIORITY);

    Resolution {
        gamemode: mode,
        rating,
        target,
        current_role_id: currently_held.map(str::to_string),
        previous_priority,
        changed,
    }
}

/// Check one gamemode's brackets for inverted or overlapping ranges
pub fn validate_table(mode: Gamemode, brackets: &[Bracket]) -> Result<(), BracketError> {
    for bracket in brackets {
        if bracket.role_id.trim().is_empty() {
            return Err(BracketError::EmptyRoleId { mode });
        }
        if bracket.starting_rating > bracket.ending_rating {
            return Err(BracketError::InvertedRange {
                mode,
                role_id: bracket.role_id.clone(),
                start: bracket.starting_rating,
                end: bracket.ending_rating,
            });
        }
        if bracket.priority >= UNRANKED_PRIORITY {
            return Err(BracketError::PriorityOutOfRange {
                mode,
                role_id: bracket.role_id.clone(),
                priority: bracket.priority,
            });
        }
    }

    let mut sorted: Vec<&Bracket> = brackets.iter().collect();
    sorted.sort_by_key(|b| (b.starting_rating, b.ending_rating));

    for pair in sorted.windows(2) {
        if pair[1].starting_rating <= pair[0].ending_rating {
            return Err(BracketError::Overlap {
                mode,
                first: pair[0].role_id.clone(),
                second: pair[1].role_id.clone(),
            });
        }
    }

    Ok(())
}

/// Validate every table of a guild, including role uniqueness across tables
pub fn validate_guild(guild: &GuildConfig) -> Result<(), BracketError> {
    let mut owners: HashMap<&str, Gamemode> = HashMap::new();

    for (mode, table) in &guild.gamemodes {
        validate_table(*mode, &table.brackets)?;

        for bracket in &table.brackets {
            if let Some(first) = owners.insert(bracket.role_id.as_str(), *mode) {
                return Err(BracketError::DuplicateRole {
                    role_id: bracket.role_id.clone(),
                    first,
                    second: *mode,
                });
            }
        }
    }

    Ok(())
}
