use std::sync::Arc;
use thiserror::Error;

use crate::core::brackets::Resolution;
use crate::core::report::promotion_message;
use crate::core::traits::{ChatPlatform, GuildSnapshot, MemberState, PlatformError};
use crate::models::GuildConfig;

/// Failed half of a role swap. The other half is not rolled back.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to remove role {role_id} from member {member_id}: {source}")]
    RemoveRole {
        member_id: String,
        role_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to add role {role_id} to member {member_id}: {source}")]
    AddRole {
        member_id: String,
        role_id: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to announce promotion of member {member_id}: {source}")]
    Announce {
        member_id: String,
        #[source]
        source: PlatformError,
    },
}

/// Effect of one reconcile call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Unchanged,
    Swapped { announced: bool },
}

/// Applies resolver verdicts to the chat platform
#[derive(Clone)]
pub struct RoleReconciler {
    platform: Arc<dyn ChatPlatform>,
}

impl RoleReconciler {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self { platform }
    }

    /// Swap the member's bracket role and announce promotions.
    ///
    /// `member` is updated in place as each half of the swap succeeds so the
    /// snapshot keeps matching the platform.
    pub async fn reconcile(
        &self,
        guild: &GuildConfig,
        snapshot: &GuildSnapshot,
        member: &mut MemberState,
        resolution: &Resolution<'_>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if !resolution.changed {
            return Ok(ReconcileOutcome::Unchanged);
        }

        if let Some(current) = resolution.current_role_id.as_deref() {
            self.platform
                .remove_member_role(&guild.guild_id, &member.member_id, current)
                .await
                .map_err(|source| ReconcileError::RemoveRole {
                    member_id: member.member_id.clone(),
                    role_id: current.to_string(),
                    source,
                })?;
            member.role_ids.retain(|r| r != current);
            tracing::info!(
                member_id = %member.member_id,
                gamemode = %resolution.gamemode,
                "Role {} removed",
                current
            );
        }

        let Some(target) = resolution.target else {
            return Ok(ReconcileOutcome::Swapped { announced: false });
        };

        self.platform
            .add_member_role(&guild.guild_id, &member.member_id, &target.role_id)
            .await
            .map_err(|source| ReconcileError::AddRole {
                member_id: member.member_id.clone(),
                role_id: target.role_id.clone(),
                source,
            })?;
        if !member.has_role(&target.role_id) {
            member.role_ids.push(target.role_id.clone());
        }
        tracing::info!(
            member_id = %member.member_id,
            gamemode = %resolution.gamemode,
            "Role {} added",
            target.role_id
        );

        if !resolution.is_promotion() {
            return Ok(ReconcileOutcome::Swapped { announced: false });
        }

        let bracket_name = snapshot
            .role_name(&target.role_id)
            .or(target.name.as_deref())
            .unwrap_or(&target.role_id);

        self.platform
            .send_message(
                &guild.notification_channel_id,
                &promotion_message(&member.mention(), bracket_name),
            )
            .await
            .map_err(|source| ReconcileError::Announce {
                member_id: member.member_id.clone(),
                source,
            })?;

        Ok(ReconcileOutcome::Swapped { announced: true })
    }
}
