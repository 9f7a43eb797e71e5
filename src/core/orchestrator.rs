use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

use crate::core::brackets::{held_bracket_role, resolve};
use crate::core::fetcher::MemberRatingFetcher;
use crate::core::reconciler::{ReconcileOutcome, RoleReconciler};
use crate::core::report::update_message;
use crate::core::traits::{
    ChatPlatform, MemberRepository, PlatformError, RatingSource, RepositoryError,
};
use crate::models::{EngineConfig, Gamemode, GuildConfig, MemberRecord, RatingChange};

pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 16;

/// Errors that abort a whole synchronization pass
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Guild {0} is not configured")]
    UnknownGuild(String),

    #[error("Failed to list members of guild {guild_id}: {source}")]
    ListMembers {
        guild_id: String,
        #[source]
        source: RepositoryError,
    },

    #[error("Failed to snapshot guild {guild_id}: {source}")]
    Snapshot {
        guild_id: String,
        #[source]
        source: PlatformError,
    },
}

/// Summary of one synchronization pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub guild_id: String,
    pub members: usize,
    pub fetch_failures: usize,
    /// Modes that fell back to stored ratings, across all members
    pub degraded_modes: usize,
    /// Registered members no longer present in the guild
    pub missing_members: usize,
    pub role_changes: usize,
    pub announcements: usize,
    pub reconcile_failures: usize,
    pub commit_failures: usize,
    pub rating_changes: Vec<RatingChange>,
}

impl SyncReport {
    pub fn failures(&self) -> usize {
        self.fetch_failures + self.reconcile_failures + self.commit_failures
    }

    /// Digest of rating movements for posting in chat
    pub fn update_message(&self) -> Option<String> {
        update_message(&self.rating_changes)
    }
}

/// Runs fetch-then-reconcile passes over a guild's registered members
pub struct GuildSynchronizer {
    config: Arc<EngineConfig>,
    repository: Arc<dyn MemberRepository>,
    platform: Arc<dyn ChatPlatform>,
    fetcher: MemberRatingFetcher,
    reconciler: RoleReconciler,
    max_concurrent_fetches: usize,
    pass_lock: Mutex<()>,
}

impl GuildSynchronizer {
    pub fn new(
        config: Arc<EngineConfig>,
        repository: Arc<dyn MemberRepository>,
        ratings: Arc<dyn RatingSource>,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        Self {
            fetcher: MemberRatingFetcher::new(ratings, Arc::clone(&repository)),
            reconciler: RoleReconciler::new(Arc::clone(&platform)),
            config,
            repository,
            platform,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit.max(1);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Platform roles of one member, `None` when they are not in the guild
    pub async fn member_roles(
        &self,
        guild_id: &str,
        member_id: &str,
    ) -> Result<Option<Vec<String>>, PlatformError> {
        let mut snapshot = self
            .platform
            .guild_snapshot(guild_id, &[member_id.to_string()])
            .await?;

        Ok(snapshot.members.remove(member_id).map(|state| state.role_ids))
    }

    /// Synchronize one guild now.
    ///
    /// Passes are serialized; a second caller waits for the running pass.
    pub async fn synchronize_guild(&self, guild_id: &str) -> Result<SyncReport, SyncError> {
        let guild = self
            .config
            .guild(guild_id)
            .ok_or_else(|| SyncError::UnknownGuild(guild_id.to_string()))?;

        let _guard = self.pass_lock.lock().await;

        let pass_id = Uuid::new_v4();
        let span = tracing::info_span!("sync_pass", guild_id = %guild_id, pass_id = %pass_id);

        self.run_pass(guild, pass_id).instrument(span).await
    }

    async fn run_pass(&self, guild: &GuildConfig, pass_id: Uuid) -> Result<SyncReport, SyncError> {
        tracing::info!("Updating Elo...");

        let members = self
            .repository
            .list_by_guild(&guild.guild_id)
            .await
            .map_err(|source| SyncError::ListMembers {
                guild_id: guild.guild_id.clone(),
                source,
            })?;

        let mut report = SyncReport {
            pass_id,
            guild_id: guild.guild_id.clone(),
            members: members.len(),
            ..Default::default()
        };

        let modes = guild.enabled_gamemodes();
        let mut members = self.fetch_all(members, &modes, &mut report).await;
        members.sort_by(|a, b| a.member_id.cmp(&b.member_id));

        for member in &members {
            for mode in member.changed_modes() {
                if guild.is_enabled(mode) {
                    report.rating_changes.push(RatingChange {
                        member_id: member.member_id.clone(),
                        gamemode: mode,
                        previous: member.current_rating(mode),
                        current: member.new_rating(mode),
                    });
                }
            }
        }

        if !modes.is_empty() && !members.is_empty() {
            self.reconcile_all(guild, &members, &modes, &mut report).await?;
        }

        self.commit_all(&mut members, &mut report).await;

        if guild.post_summary {
            if let Some(message) = report.update_message() {
                if let Err(e) = self
                    .platform
                    .send_message(&guild.notification_channel_id, &message)
                    .await
                {
                    tracing::error!("Failed to post update message: {}", e);
                }
            }
        }

        tracing::info!(
            members = report.members,
            role_changes = report.role_changes,
            announcements = report.announcements,
            failures = report.failures(),
            "Elo update complete"
        );

        Ok(report)
    }

    /// Fetch phase: all members concurrently, failures logged and counted
    async fn fetch_all(
        &self,
        members: Vec<MemberRecord>,
        modes: &[Gamemode],
        report: &mut SyncReport,
    ) -> Vec<MemberRecord> {
        let results: Vec<_> = stream::iter(members)
            .map(|mut member| async move {
                let result = self.fetcher.fetch_member_ratings(&mut member, modes).await;
                (member, result)
            })
            .buffer_unordered(self.max_concurrent_fetches)
            .collect()
            .await;

        let mut fetched = Vec::with_capacity(results.len());
        for (member, result) in results {
            match result {
                Ok(fetch) => report.degraded_modes += fetch.degraded().len(),
                Err(e) => {
                    report.fetch_failures += 1;
                    tracing::error!("{}", e);
                }
            }
            fetched.push(member);
        }
        fetched
    }

    /// Reconcile phase: one member at a time against a single snapshot
    async fn reconcile_all(
        &self,
        guild: &GuildConfig,
        members: &[MemberRecord],
        modes: &[Gamemode],
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let member_ids: Vec<String> = members.iter().map(|m| m.member_id.clone()).collect();

        let mut snapshot = self
            .platform
            .guild_snapshot(&guild.guild_id, &member_ids)
            .await
            .map_err(|source| SyncError::Snapshot {
                guild_id: guild.guild_id.clone(),
                source,
            })?;

        for member in members {
            let Some(mut state) = snapshot.members.remove(&member.member_id) else {
                report.missing_members += 1;
                tracing::warn!(member_id = %member.member_id, "Member not found in guild, skipping roles");
                continue;
            };

            for &mode in modes {
                let Some(table) = guild.gamemodes.get(&mode) else {
                    continue;
                };

                let held = held_bracket_role(table, &state.role_ids).map(str::to_string);
                let resolution = resolve(member, mode, table, held.as_deref());

                match self
                    .reconciler
                    .reconcile(guild, &snapshot, &mut state, &resolution)
                    .await
                {
                    Ok(ReconcileOutcome::Unchanged) => {}
                    Ok(ReconcileOutcome::Swapped { announced }) => {
                        report.role_changes += 1;
                        if announced {
                            report.announcements += 1;
                        }
                    }
                    Err(e) => {
                        report.reconcile_failures += 1;
                        tracing::error!(gamemode = %mode, "{}", e);
                    }
                }
            }

            snapshot.members.insert(state.member_id.clone(), state);
        }

        Ok(())
    }

    /// Promote working ratings to last-known-good for every member
    async fn commit_all(&self, members: &mut [MemberRecord], report: &mut SyncReport) {
        for member in members.iter_mut() {
            if member.changed_modes().is_empty() {
                continue;
            }
            member.commit_ratings();
            member.updated_at = Some(chrono::Utc::now());
            if let Err(e) = self.repository.upsert(member).await {
                report.commit_failures += 1;
                tracing::error!(member_id = %member.member_id, "Failed to commit ratings: {}", e);
            }
        }
    }

    /// Synchronize every configured guild on a fixed interval, forever
    pub async fn run_periodic(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            tracing::info!("Running scheduled Elo update");

            for guild_id in self.config.guild_ids() {
                match self.synchronize_guild(&guild_id).await {
                    Ok(report) if report.failures() > 0 => tracing::warn!(
                        guild_id = %guild_id,
                        "Scheduled update finished with {} failures",
                        report.failures()
                    ),
                    Ok(_) => {}
                    Err(e) => tracing::error!(guild_id = %guild_id, "Scheduled update failed: {}", e),
                }
            }

            tracing::info!("Scheduled Elo update complete");
        }
    }
}
