// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Bracket, EngineConfig, GameAccount, Gamemode, GamemodeConfig, GuildConfig, MemberRecord,
    RatingChange, Ratings, UNRANKED_PRIORITY,
};
pub use requests::{RegisterMemberRequest, SyncGuildRequest};
pub use responses::{
    ErrorResponse, HealthResponse, RatingSummaryResponse, RegisterMemberResponse,
    SyncGuildResponse,
};
