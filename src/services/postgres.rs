use crate::core::traits::{MemberRepository, RepositoryError};
use crate::models::{MemberRecord, Ratings};
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<PostgresError> for RepositoryError {
    fn from(value: PostgresError) -> Self {
        match value {
            PostgresError::NotFound(what) => RepositoryError::NotFound(what),
            other => RepositoryError::Storage(other.to_string()),
        }
    }
}

/// PostgreSQL-backed member repository
///
/// One row per (member, guild). Ratings are stored as JSONB objects keyed by
/// gamemode label so that enabling a new mode needs no schema change.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
        )
        .await
    }

    /// Insert or update a member keyed by (member_id, guild_id)
    pub async fn upsert_member(&self, member: &MemberRecord) -> Result<(), PostgresError> {
        let query = r#"
            INSERT INTO members (
                member_id, guild_id, account_username, account_id,
                current_ratings, new_ratings, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, NOW(), NOW())
            ON CONFLICT (member_id, guild_id)
            DO UPDATE SET
                account_username = EXCLUDED.account_username,
                account_id = EXCLUDED.account_id,
                current_ratings = EXCLUDED.current_ratings,
                new_ratings = EXCLUDED.new_ratings,
                updated_at = EXCLUDED.updated_at
        "#;

        sqlx::query(query)
            .bind(&member.member_id)
            .bind(&member.guild_id)
            .bind(&member.account_username)
            .bind(&member.account_id)
            .bind(Json(&member.current_ratings))
            .bind(Json(&member.new_ratings))
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Upserted member {} in guild {}",
            member.member_id,
            member.guild_id
        );

        Ok(())
    }

    /// Get one member of a guild
    pub async fn get_member(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<Option<MemberRecord>, PostgresError> {
        let query = r#"
            SELECT member_id, guild_id, account_username, account_id,
                   current_ratings, new_ratings, updated_at
            FROM members
            WHERE member_id = $1 AND guild_id = $2
        "#;

        let row = sqlx::query(query)
            .bind(member_id)
            .bind(guild_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(member_from_row).transpose()
    }

    /// Get all registered members of a guild
    pub async fn list_members(&self, guild_id: &str) -> Result<Vec<MemberRecord>, PostgresError> {
        let query = r#"
            SELECT member_id, guild_id, account_username, account_id,
                   current_ratings, new_ratings, updated_at
            FROM members
            WHERE guild_id = $1
            ORDER BY member_id
        "#;

        let rows = sqlx::query(query).bind(guild_id).fetch_all(&self.pool).await?;

        let members: Result<Vec<MemberRecord>, _> = rows.iter().map(member_from_row).collect();
        let members = members?;

        tracing::debug!("Guild {} has {} registered members", guild_id, members.len());

        Ok(members)
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

fn member_from_row(row: &PgRow) -> Result<MemberRecord, PostgresError> {
    let current: Json<Ratings> = row.try_get("current_ratings")?;
    let new: Json<Ratings> = row.try_get("new_ratings")?;

    Ok(MemberRecord {
        member_id: row.try_get("member_id")?,
        guild_id: row.try_get("guild_id")?,
        account_username: row.try_get("account_username")?,
        account_id: row.try_get("account_id")?,
        current_ratings: current.0,
        new_ratings: new.0,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl MemberRepository for PostgresClient {
    async fn upsert(&self, member: &MemberRecord) -> Result<(), RepositoryError> {
        Ok(self.upsert_member(member).await?)
    }

    async fn get_by_id_and_guild(
        &self,
        member_id: &str,
        guild_id: &str,
    ) -> Result<Option<MemberRecord>, RepositoryError> {
        Ok(self.get_member(member_id, guild_id).await?)
    }

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<MemberRecord>, RepositoryError> {
        Ok(self.list_members(guild_id).await?)
    }

    async fn ping(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}
