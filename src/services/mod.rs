// Service exports
pub mod discord;
pub mod postgres;
pub mod rating_api;

pub use discord::{DiscordClient, DiscordError, GuildRole};
pub use postgres::{PostgresClient, PostgresError};
pub use rating_api::{LeaderboardQuery, RatingApiClient, RatingApiError};
