// Engine exports
pub mod brackets;
pub mod fetcher;
pub mod orchestrator;
pub mod reconciler;
pub mod report;
pub mod traits;

pub use brackets::{find_bracket, held_bracket_role, resolve, validate_guild, BracketError, Resolution};
pub use fetcher::{FetchError, FetchReport, MemberRatingFetcher, ModeOutcome};
pub use orchestrator::{GuildSynchronizer, SyncError, SyncReport};
pub use reconciler::{ReconcileError, ReconcileOutcome, RoleReconciler};
pub use report::{promotion_message, rating_summary, update_message};
pub use traits::{
    ChatPlatform, GuildSnapshot, MemberRepository, MemberState, PlatformError, RatingSource,
    RepositoryError,
};
