//! Elo Sync - mirrors external ladder ratings as Discord bracket roles
//!
//! For every registered guild member the engine fetches per-gamemode ratings
//! concurrently, falls back to the last known rating when a query fails, and
//! reconciles the member's bracket roles so that at most one bracket role per
//! gamemode is held, announcing promotions.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{GuildSynchronizer, SyncError, SyncReport};
pub use models::{Bracket, EngineConfig, Gamemode, GamemodeConfig, GuildConfig, MemberRecord, Ratings};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let table = GamemodeConfig::new(
            true,
            vec![Bracket {
                role_id: "gold".to_string(),
                starting_rating: 1000,
                ending_rating: 1999,
                priority: 50,
                name: None,
            }],
        );
        assert_eq!(table.role_priorities.get("gold"), Some(&50));
    }
}
