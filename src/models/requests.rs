use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to link a member to their game account
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterMemberRequest {
    #[validate(length(min = 1, max = 64))]
    #[serde(alias = "account_username", rename = "accountUsername")]
    pub account_username: String,
    #[validate(length(max = 40))]
    #[serde(default)]
    #[serde(alias = "account_id", rename = "accountId")]
    pub account_id: String,
}

/// Request to run a synchronization pass now
///
/// `requested_by` is the member id of the caller; its roles are read from
/// the platform when the guild restricts syncing to admin roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncGuildRequest {
    #[serde(default)]
    #[serde(alias = "requested_by", rename = "requestedBy")]
    pub requested_by: Option<String>,
}
