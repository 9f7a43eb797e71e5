use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::core::brackets::validate_guild;
use crate::models::{Bracket, EngineConfig, Gamemode, GamemodeConfig, GuildConfig};
use crate::services::{discord, rating_api};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub discord: DiscordSettings,
    #[serde(default)]
    pub rating_api: RatingApiSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub guilds: BTreeMap<String, GuildSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordSettings {
    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
    pub token: String,
    #[serde(default = "default_role_cache_ttl")]
    pub role_cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_discord_api_base() -> String { discord::DEFAULT_API_BASE.to_string() }
fn default_role_cache_ttl() -> u64 { 300 }
fn default_request_timeout() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct RatingApiSettings {
    #[serde(default = "default_rating_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for RatingApiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_rating_endpoint(),
            region: default_region(),
            user_agent: default_user_agent(),
            timeout_secs: default_request_timeout(),
        }
    }
}

fn default_rating_endpoint() -> String { rating_api::DEFAULT_ENDPOINT.to_string() }
fn default_region() -> String { rating_api::DEFAULT_REGION.to_string() }
fn default_user_agent() -> String {
    format!("Elo Sync/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_sync_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            enabled: default_sync_enabled(),
            interval_secs: default_sync_interval(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl SyncSettings {
    /// Reject scheduler intervals shorter than `MIN_SYNC_INTERVAL_SECS`
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.interval_secs < MIN_SYNC_INTERVAL_SECS {
            return Err(ConfigError::Message(format!(
                "sync.interval_secs must be at least {} seconds, got {}",
                MIN_SYNC_INTERVAL_SECS, self.interval_secs
            )));
        }
        Ok(())
    }
}

/// Shortest allowed periodic sync interval
pub const MIN_SYNC_INTERVAL_SECS: u64 = 60;

fn default_sync_enabled() -> bool { true }
fn default_sync_interval() -> u64 { 2 * 60 * 60 }
fn default_max_concurrent_fetches() -> usize { crate::core::orchestrator::DEFAULT_MAX_CONCURRENT_FETCHES }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Raw per-guild settings, keyed by guild id in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct GuildSettings {
    pub notification_channel_id: String,
    #[serde(default)]
    pub admin_roles: Vec<String>,
    #[serde(default)]
    pub post_summary: bool,
    /// Keyed by gamemode label ("1v1", "2v2", "3v3", "4v4", "custom")
    #[serde(default)]
    pub gamemodes: BTreeMap<String, GamemodeSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GamemodeSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub brackets: Vec<Bracket>,
}

impl GuildSettings {
    /// Parse gamemode keys, build role-priority maps and validate brackets
    pub fn to_guild_config(&self, guild_id: &str) -> Result<GuildConfig, ConfigError> {
        let mut gamemodes = BTreeMap::new();

        for (label, settings) in &self.gamemodes {
            let mode: Gamemode = label
                .parse()
                .map_err(|e| ConfigError::Message(format!("guild {}: {}", guild_id, e)))?;
            gamemodes.insert(
                mode,
                GamemodeConfig::new(settings.enabled, settings.brackets.clone()),
            );
        }

        let guild = GuildConfig {
            guild_id: guild_id.to_string(),
            notification_channel_id: self.notification_channel_id.clone(),
            admin_roles: self.admin_roles.iter().cloned().collect(),
            post_summary: self.post_summary,
            gamemodes,
        };

        validate_guild(&guild)
            .map_err(|e| ConfigError::Message(format!("guild {}: {}", guild_id, e)))?;

        Ok(guild)
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with ELO_SYNC)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., ELO_SYNC__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("ELO_SYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        let settings: Self = settings.try_deserialize()?;
        settings.sync.validate()?;
        Ok(settings)
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("ELO_SYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        settings.sync.validate()?;
        Ok(settings)
    }

    /// Build the immutable engine configuration, rejecting invalid bracket tables
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mut guilds = HashMap::with_capacity(self.guilds.len());

        for (guild_id, guild) in &self.guilds {
            guilds.insert(guild_id.clone(), guild.to_guild_config(guild_id)?);
        }

        Ok(EngineConfig { guilds })
    }
}

/// Apply well-known unprefixed environment variables
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let database_url = env::var("DATABASE_URL").ok();
    let discord_token = env::var("DISCORD_TOKEN").ok();

    let mut builder = Config::builder().add_source(settings);

    if let Some(url) = database_url {
        builder = builder.set_override("database.url", url)?;
    }
    if let Some(token) = discord_token {
        builder = builder.set_override("discord.token", token)?;
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_settings(brackets: Vec<Bracket>) -> GuildSettings {
        let mut gamemodes = BTreeMap::new();
        gamemodes.insert(
            "1v1".to_string(),
            GamemodeSettings {
                enabled: true,
                brackets,
            },
        );
        GuildSettings {
            notification_channel_id: "chan".to_string(),
            admin_roles: vec!["admin".to_string()],
            post_summary: false,
            gamemodes,
        }
    }

    fn bracket(role: &str, start: i32, end: i32, priority: i32) -> Bracket {
        Bracket {
            role_id: role.to_string(),
            starting_rating: start,
            ending_rating: end,
            priority,
            name: None,
        }
    }

    #[test]
    fn test_default_sync_settings() {
        let sync = SyncSettings::default();
        assert!(sync.enabled);
        assert_eq!(sync.interval_secs, 7200);
        assert_eq!(sync.max_concurrent_fetches, 16);
    }

    #[test]
    fn test_short_sync_interval_rejected() {
        assert!(SyncSettings::default().validate().is_ok());

        let sync = SyncSettings {
            interval_secs: 30,
            ..SyncSettings::default()
        };
        assert!(matches!(sync.validate(), Err(ConfigError::Message(_))));

        let disabled = SyncSettings {
            enabled: false,
            interval_secs: 0,
            ..SyncSettings::default()
        };
        assert!(disabled.validate().is_ok());

        let floor = SyncSettings {
            interval_secs: MIN_SYNC_INTERVAL_SECS,
            ..SyncSettings::default()
        };
        assert!(floor.validate().is_ok());
    }

    #[test]
    fn test_default_logging() {
        let level = default_log_level();
        let format = default_log_format();
        assert_eq!(level, "info");
        assert_eq!(format, "json");
    }

    #[test]
    fn test_guild_config_builds_priority_map() {
        let settings = guild_settings(vec![
            bracket("silver", 500, 1000, 200),
            bracket("gold", 1001, 2000, 100),
        ]);

        let guild = settings.to_guild_config("g1").unwrap();
        let table = &guild.gamemodes[&Gamemode::OneVOne];

        assert_eq!(guild.guild_id, "g1");
        assert_eq!(table.role_priorities["gold"], 100);
        assert_eq!(guild.enabled_gamemodes(), vec![Gamemode::OneVOne]);
        assert!(guild.admin_roles.contains("admin"));
    }

    #[test]
    fn test_overlapping_brackets_rejected_at_load() {
        let settings = guild_settings(vec![
            bracket("silver", 500, 1000, 200),
            bracket("gold", 900, 2000, 100),
        ]);

        let err = settings.to_guild_config("g1").unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_unknown_gamemode_rejected() {
        let mut settings = guild_settings(vec![]);
        settings.gamemodes.insert(
            "5v5".to_string(),
            GamemodeSettings {
                enabled: true,
                brackets: vec![],
            },
        );

        assert!(settings.to_guild_config("g1").is_err());
    }
}
