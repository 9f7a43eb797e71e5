use actix_web::{web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{rating_summary, GuildSynchronizer, MemberRepository, SyncError};
use crate::models::{
    EngineConfig, ErrorResponse, HealthResponse, MemberRecord, RatingSummaryResponse,
    RegisterMemberRequest, RegisterMemberResponse, SyncGuildRequest, SyncGuildResponse,
};
use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
    pub repository: Arc<dyn MemberRepository>,
    pub synchronizer: Arc<GuildSynchronizer>,
}

/// Configure all guild-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/guilds/{guild_id}/sync", web::post().to(sync_guild))
        .route("/guilds/{guild_id}/members/{member_id}", web::put().to(register_member))
        .route("/guilds/{guild_id}/members/{member_id}/ratings", web::get().to(get_ratings));
}

fn error_response(status: actix_web::http::StatusCode, error: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message,
        status_code: status.as_u16(),
    })
}

fn forbidden() -> HttpResponse {
    error_response(
        actix_web::http::StatusCode::FORBIDDEN,
        "forbidden",
        "An administrator role is required to update Elo".to_string(),
    )
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let db_healthy = state.repository.ping().await;

    let status = if db_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Run a synchronization pass for one guild
///
/// POST /api/v1/guilds/{guild_id}/sync
///
/// Optional request body:
/// ```json
/// {
///   "requestedBy": "member id"
/// }
/// ```
///
/// Guilds with admin roles require `requestedBy` to hold one of them.
async fn sync_guild(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: Option<web::Json<SyncGuildRequest>>,
) -> impl Responder {
    let guild_id = path.into_inner();
    let req = req.map(web::Json::into_inner).unwrap_or_default();

    let Some(guild) = state.config.guild(&guild_id) else {
        return error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "unknown_guild",
            format!("Guild {} is not configured", guild_id),
        );
    };

    if !guild.admin_roles.is_empty() {
        let Some(actor) = req.requested_by.as_deref() else {
            tracing::info!("Sync of guild {} denied: no requesting member", guild_id);
            return forbidden();
        };

        match state.synchronizer.member_roles(&guild_id, actor).await {
            Ok(Some(roles)) if guild.is_admin(&roles) => {}
            Ok(_) => {
                tracing::info!(
                    "Sync of guild {} denied for {}: missing admin role",
                    guild_id,
                    actor
                );
                return forbidden();
            }
            Err(e) => {
                tracing::error!("Error reading roles of {} in guild {}: {}", actor, guild_id, e);
                return error_response(
                    actix_web::http::StatusCode::BAD_GATEWAY,
                    "platform_error",
                    "Failed to read member roles".to_string(),
                );
            }
        }
    }

    match state.synchronizer.synchronize_guild(&guild_id).await {
        Ok(report) => {
            let message = report
                .update_message()
                .unwrap_or_else(|| "Elo updated! No rating changes.".to_string());

            HttpResponse::Ok().json(SyncGuildResponse {
                success: true,
                message,
                pass_id: Some(report.pass_id.to_string()),
                members: report.members,
                role_changes: report.role_changes,
                announcements: report.announcements,
                failures: report.failures(),
                rating_changes: report.rating_changes,
            })
        }
        Err(e) => {
            tracing::error!("Error updating Elo for guild {}: {}", guild_id, e);
            let status = match e {
                SyncError::UnknownGuild(_) => actix_web::http::StatusCode::NOT_FOUND,
                _ => actix_web::http::StatusCode::BAD_GATEWAY,
            };
            HttpResponse::build(status).json(SyncGuildResponse {
                success: false,
                message: "Elo failed to update.".to_string(),
                pass_id: None,
                members: 0,
                role_changes: 0,
                announcements: 0,
                failures: 0,
                rating_changes: Vec::new(),
            })
        }
    }
}

/// Link a member to their game account, keeping any known ratings
///
/// PUT /api/v1/guilds/{guild_id}/members/{member_id}
async fn register_member(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    req: web::Json<RegisterMemberRequest>,
) -> impl Responder {
    let (guild_id, member_id) = path.into_inner();

    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for register request: {:?}", errors);
        return error_response(
            actix_web::http::StatusCode::BAD_REQUEST,
            "validation_failed",
            errors.to_string(),
        );
    }

    let existing = match state
        .repository
        .get_by_id_and_guild(&member_id, &guild_id)
        .await
    {
        Ok(existing) => existing,
        Err(e) => {
            tracing::error!("Error loading member {}: {}", member_id, e);
            return error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to load member".to_string(),
            );
        }
    };

    let req = req.into_inner();
    let member = match existing {
        Some(mut member) => {
            member.account_username = req.account_username.trim().to_string();
            member.account_id = req.account_id.trim().to_string();
            member
        }
        None => MemberRecord::new(
            member_id.clone(),
            guild_id.clone(),
            req.account_username.trim(),
            req.account_id.trim(),
        ),
    };

    if let Err(e) = state.repository.upsert(&member).await {
        tracing::error!("Error registering member {}: {}", member_id, e);
        return error_response(
            actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            "Failed to save member".to_string(),
        );
    }

    tracing::info!(
        "Member {} in guild {} linked to account {} ({})",
        member_id,
        guild_id,
        member.account_username,
        member.account_id
    );

    HttpResponse::Ok().json(RegisterMemberResponse {
        success: true,
        member,
    })
}

/// Rating summary of one member
///
/// GET /api/v1/guilds/{guild_id}/members/{member_id}/ratings
async fn get_ratings(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (guild_id, member_id) = path.into_inner();

    let Some(guild) = state.config.guild(&guild_id) else {
        return error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "unknown_guild",
            format!("Guild {} is not configured", guild_id),
        );
    };

    match state.repository.get_by_id_and_guild(&member_id, &guild_id).await {
        Ok(Some(member)) => HttpResponse::Ok().json(RatingSummaryResponse {
            member_id: member.member_id.clone(),
            summary: rating_summary(&member.account_username, &member, guild),
            highest_rating: member.highest_rating(&guild.enabled_gamemodes()),
            member,
        }),
        Ok(None) => error_response(
            actix_web::http::StatusCode::NOT_FOUND,
            "not_registered",
            format!("Member {} has not registered a game account", member_id),
        ),
        Err(e) => {
            tracing::error!("Error loading member {}: {}", member_id, e);
            error_response(
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "Failed to load member".to_string(),
            )
        }
    }
}
