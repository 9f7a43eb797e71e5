use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use crate::core::traits::{MemberRepository, RatingSource, RepositoryError};
use crate::models::{Gamemode, MemberRecord};

/// Failure of a member fetch that the orchestrator must hear about
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to persist member {member_id}: {source}")]
    Persist {
        member_id: String,
        #[source]
        source: RepositoryError,
    },
}

/// What happened to one gamemode during a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOutcome {
    /// Service returned a rating
    Updated(i32),
    /// No new information; the last-known-good value was kept
    Fallback(Option<i32>),
}

/// Per-mode outcomes of one member fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchReport {
    pub member_id: String,
    pub modes: Vec<(Gamemode, ModeOutcome)>,
}

impl FetchReport {
    /// Modes that fell back to the stored rating
    pub fn degraded(&self) -> Vec<Gamemode> {
        self.modes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ModeOutcome::Fallback(_)))
            .map(|(mode, _)| *mode)
            .collect()
    }
}

/// Fans out rating queries for one member and persists the merged result
#[derive(Clone)]
pub struct MemberRatingFetcher {
    ratings: Arc<dyn RatingSource>,
    repository: Arc<dyn MemberRepository>,
}

impl MemberRatingFetcher {
    pub fn new(ratings: Arc<dyn RatingSource>, repository: Arc<dyn MemberRepository>) -> Self {
        Self {
            ratings,
            repository,
        }
    }

    /// Query every mode in `modes` concurrently, fill `member.new_ratings`
    /// and persist the member.
    ///
    /// A mode whose query fails keeps its `current_ratings` value. Ratings
    /// of modes not listed are carried over unchanged.
    pub async fn fetch_member_ratings(
        &self,
        member: &mut MemberRecord,
        modes: &[Gamemode],
    ) -> Result<FetchReport, FetchError> {
        let account = member.account();

        let results = join_all(modes.iter().map(|&mode| {
            let account = &account;
            async move { (mode, self.ratings.fetch_rating(account, mode).await) }
        }))
        .await;

        let mut new_ratings = member.current_ratings.clone();
        let mut report = FetchReport {
            member_id: member.member_id.clone(),
            modes: Vec::with_capacity(results.len()),
        };

        for (mode, fetched) in results {
            let outcome = match fetched {
                Some(rating) => {
                    new_ratings.insert(mode, rating);
                    ModeOutcome::Updated(rating)
                }
                None => ModeOutcome::Fallback(member.current_rating(mode)),
            };
            report.modes.push((mode, outcome));
        }

        member.new_ratings = new_ratings;

        let degraded = report.degraded();
        if !degraded.is_empty() {
            let labels: Vec<&str> = degraded.iter().map(|m| m.label()).collect();
            tracing::warn!(
                member_id = %member.member_id,
                account = %member.account_username,
                "No rating returned for [{}], keeping stored values",
                labels.join(", ")
            );
        }

        self.repository
            .upsert(member)
            .await
            .map_err(|source| FetchError::Persist {
                member_id: member.member_id.clone(),
                source,
            })?;

        tracing::debug!(
            member_id = %member.member_id,
            "Fetched {} modes ({} degraded)",
            report.modes.len(),
            degraded.len()
        );

        Ok(report)
    }
}
