use serde::{Deserialize, Serialize};
use crate::models::domain::{MemberRecord, RatingChange};

/// Response for the sync endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncGuildResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "passId")]
    pub pass_id: Option<String>,
    pub members: usize,
    #[serde(rename = "roleChanges")]
    pub role_changes: usize,
    pub announcements: usize,
    pub failures: usize,
    #[serde(rename = "ratingChanges", default)]
    pub rating_changes: Vec<RatingChange>,
}

/// Response for member registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterMemberResponse {
    pub success: bool,
    pub member: MemberRecord,
}

/// Rating summary for one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSummaryResponse {
    #[serde(rename = "memberId")]
    pub member_id: String,
    pub summary: String,
    #[serde(rename = "highestRating")]
    pub highest_rating: Option<i32>,
    pub member: MemberRecord,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
