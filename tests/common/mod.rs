// In-memory collaborators shared by the engine tests

#![allow(dead_code)]

use async_trait::async_trait;
use elo_sync::core::{
    ChatPlatform, GuildSnapshot, MemberRepository, MemberState, PlatformError, RatingSource,
    RepositoryError,
};
use elo_sync::models::{
    Bracket, EngineConfig, GameAccount, Gamemode, GamemodeConfig, GuildConfig, MemberRecord,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const GUILD: &str = "guild-1";
pub const CHANNEL: &str = "bot-channel";

pub fn bracket(role: &str, start: i32, end: i32, priority: i32) -> Bracket {
    Bracket {
        role_id: role.to_string(),
        starting_rating: start,
        ending_rating: end,
        priority,
        name: None,
    }
}

/// Silver < Gold < Diamond for 1v1
pub fn ladder_1v1() -> Vec<Bracket> {
    vec![
        bracket("silver", 500, 999, 300),
        bracket("gold", 1000, 1499, 200),
        bracket("diamond", 1500, 2500, 100),
    ]
}

pub fn guild_with(gamemodes: Vec<(Gamemode, bool, Vec<Bracket>)>) -> GuildConfig {
    GuildConfig {
        guild_id: GUILD.to_string(),
        notification_channel_id: CHANNEL.to_string(),
        admin_roles: HashSet::new(),
        post_summary: false,
        gamemodes: gamemodes
            .into_iter()
            .map(|(mode, enabled, brackets)| (mode, GamemodeConfig::new(enabled, brackets)))
            .collect::<BTreeMap<_, _>>(),
    }
}

pub fn engine_config(guild: GuildConfig) -> EngineConfig {
    let mut guilds = HashMap::new();
    guilds.insert(guild.guild_id.clone(), guild);
    EngineConfig { guilds }
}

pub fn member(id: &str, username: &str, current: &[(Gamemode, i32)]) -> MemberRecord {
    let mut record = MemberRecord::new(id, GUILD, username, "");
    for &(mode, rating) in current {
        record.current_ratings.insert(mode, rating);
        record.new_ratings.insert(mode, rating);
    }
    record
}

/// Member repository backed by a map, with injectable upsert failures
#[derive(Default)]
pub struct InMemoryRepository {
    members: Mutex<BTreeMap<(String, String), MemberRecord>>,
    failing_upserts: Mutex<HashSet<String>>,
    pub upserts: AtomicUsize,
}

impl InMemoryRepository {
    pub fn with_members(members: Vec<MemberRecord>) -> Self {
        let repo = Self::default();
        {
            let mut map = repo.members.lock().unwrap();
            for m in members {
                map.insert((m.member_id.clone(), m.guild_id.clone()), m);
            }
        }
        repo
    }

    pub fn fail_upserts_for(&self, member_id: &str) {
        self.failing_upserts.lock().unwrap().insert(member_id.to_string());
    }

    pub fn get(&self, member_id: &str) -> Option<MemberRecord> {
        self.members
            .lock()
            .unwrap()
            .get(&(member_id.to_string(), GUILD.to_string()))
            .cloned()
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberRepository for InMemoryRepository {
    async fn upsert(&self, member: &MemberRecord) -> Result<(), RepositoryError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        if self.failing_upserts.lock().unwrap().contains(&member.member_id) {
            return Err(RepositoryError::Storage("write rejected".to_string()));
        }
        self.members.lock().unwrap().insert(
            (member.member_id.clone(), member.guild_id.clone()),
            member.clone(),
        );
        Ok(())
    }

    async fn get_by_id_and_guild(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<Option<MemberRecord>, RepositoryError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .get(&(member_id.to_string(), guild_id.to_string()))
            .cloned())
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<MemberRecord>, RepositoryError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.guild_id == guild_id)
            .cloned()
            .collect())
    }
}

/// Rating source answering from a fixed table; unknown pairs yield `None`
#[derive(Default)]
pub struct ScriptedRatings {
    ratings: Mutex<HashMap<(String, Gamemode), i32>>,
    pub calls: AtomicUsize,
}

impl ScriptedRatings {
    pub fn set(&self, username: &str, mode: Gamemode, rating: i32) {
        self.ratings
            .lock()
            .unwrap()
            .insert((username.to_string(), mode), rating);
    }

    pub fn clear(&self, username: &str, mode: Gamemode) {
        self.ratings
            .lock()
            .unwrap()
            .remove(&(username.to_string(), mode));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RatingSource for ScriptedRatings {
    async fn fetch_rating(&self, account: &GameAccount, mode: Gamemode) -> Option<i32> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.ratings
            .lock()
            .unwrap()
            .get(&(account.username.clone(), mode))
            .copied()
    }
}

/// Mutation observed by the fake platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    AddRole { member_id: String, role_id: String },
    RemoveRole { member_id: String, role_id: String },
    Message { channel_id: String, content: String },
}

/// Guild held in memory; role mutations are applied so later passes see them
#[derive(Default)]
pub struct FakePlatform {
    role_names: Mutex<HashMap<String, String>>,
    members: Mutex<HashMap<String, MemberState>>,
    calls: Mutex<Vec<PlatformCall>>,
    failing_roles: Mutex<HashSet<String>>,
    pub fail_snapshot: Mutex<bool>,
}

impl FakePlatform {
    pub fn with_roles(roles: &[(&str, &str)]) -> Self {
        let platform = Self::default();
        {
            let mut names = platform.role_names.lock().unwrap();
            for (id, name) in roles {
                names.insert(id.to_string(), name.to_string());
            }
        }
        platform
    }

    pub fn join(&self, member_id: &str, roles: &[&str]) {
        self.members.lock().unwrap().insert(
            member_id.to_string(),
            MemberState {
                member_id: member_id.to_string(),
                display_name: format!("Member {}", member_id),
                role_ids: roles.iter().map(|r| r.to_string()).collect(),
            },
        );
    }

    /// Any add or remove of this role fails
    pub fn fail_role(&self, role_id: &str) {
        self.failing_roles.lock().unwrap().insert(role_id.to_string());
    }

    pub fn roles_of(&self, member_id: &str) -> Vec<String> {
        self.members
            .lock()
            .unwrap()
            .get(member_id)
            .map(|m| m.role_ids.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn role_calls(&self) -> Vec<PlatformCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, PlatformCall::Message { .. }))
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::Message { content, .. } => Some(content),
                _ => None,
            })
            .collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn check_role(&self, role_id: &str) -> Result<(), PlatformError> {
        if self.failing_roles.lock().unwrap().contains(role_id) {
            return Err(PlatformError::Api(format!("role {} is managed", role_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn guild_snapshot(
        &self,
        guild_id: &str,
        member_ids: &[String],
    ) -> Result<GuildSnapshot, PlatformError> {
        if *self.fail_snapshot.lock().unwrap() {
            return Err(PlatformError::Request("gateway unavailable".to_string()));
        }

        let members = self.members.lock().unwrap();
        Ok(GuildSnapshot {
            guild_id: guild_id.to_string(),
            role_names: self.role_names.lock().unwrap().clone(),
            members: member_ids
                .iter()
                .filter_map(|id| members.get(id).map(|m| (id.clone(), m.clone())))
                .collect(),
        })
    }

    async fn add_member_role(
        &self,
        _guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.check_role(role_id)?;
        self.calls.lock().unwrap().push(PlatformCall::AddRole {
            member_id: member_id.to_string(),
            role_id: role_id.to_string(),
        });
        if let Some(m) = self.members.lock().unwrap().get_mut(member_id) {
            if !m.has_role(role_id) {
                m.role_ids.push(role_id.to_string());
            }
        }
        Ok(())
    }

    async fn remove_member_role(
        &self,
        _guild_id: &str,
        member_id: &str,
        role_id: &str,
    ) -> Result<(), PlatformError> {
        self.check_role(role_id)?;
        self.calls.lock().unwrap().push(PlatformCall::RemoveRole {
            member_id: member_id.to_string(),
            role_id: role_id.to_string(),
        });
        if let Some(m) = self.members.lock().unwrap().get_mut(member_id) {
            m.role_ids.retain(|r| r != role_id);
        }
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, content: &str) -> Result<(), PlatformError> {
        self.calls.lock().unwrap().push(PlatformCall::Message {
            channel_id: channel_id.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }
}
