//! HTTP routes.
//!
//! Everything except `/api/health` needs `Authorization: Bearer <token>`,
//! verified the same way as the WebSocket `join`. Admin routes also need the
//! admin role.

use axum::{
    extract::{FromRequestParts, Path, Query, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use uuid::Uuid;

use tidewatch_domain::UserId;
use tidewatch_shared::{
    AchievementChangeRequest, AchievementChangeResponse, AchievementsResponse,
    ChallengeTriggerResponse, CooldownsResponse, ErrorResponse, HealthResponse, InventoryResponse,
    LeaderboardQuery, LeaderboardResponse, RaidsResponse,
};

use crate::api::websocket::error_sanitizer::sanitize_repo_error;
use crate::app::App;
use crate::infrastructure::ports::{RepoError, VerifiedIdentity};
use crate::use_cases::{AchievementError, QueryError};

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/inventory", get(inventory))
        .route("/api/achievements", get(achievements))
        .route("/api/cooldowns", get(cooldowns))
        .route("/api/raids", get(raids))
        .route("/api/admin/achievements/grant", post(grant_achievement))
        .route("/api/admin/achievements/revoke", post(revoke_achievement))
        .route("/api/admin/challenges/{user_id}", post(trigger_challenge))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn leaderboard(
    _caller: Caller,
    State(app): State<Arc<App>>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let board = app
        .use_cases
        .queries
        .leaderboard(&query.kind, query.effective_limit())
        .await
        .map_err(|e| match e {
            QueryError::InvalidKind(kind) => ApiError::BadRequest(kind),
            QueryError::Repo(e) => ApiError::repo(&e, "leaderboard"),
        })?;
    Ok(Json(board))
}

async fn inventory(
    Caller(caller): Caller,
    State(app): State<Arc<App>>,
) -> Result<Json<InventoryResponse>, ApiError> {
    let inventory = app
        .use_cases
        .queries
        .inventory(caller.user_id)
        .await
        .map_err(|e| ApiError::repo(&e, "inventory"))?;
    Ok(Json(inventory))
}

async fn achievements(
    Caller(caller): Caller,
    State(app): State<Arc<App>>,
) -> Result<Json<AchievementsResponse>, ApiError> {
    let achievements = app
        .use_cases
        .queries
        .achievements(caller.user_id)
        .await
        .map_err(|e| ApiError::repo(&e, "list achievements"))?;
    Ok(Json(AchievementsResponse { achievements }))
}

async fn cooldowns(
    Caller(caller): Caller,
    State(app): State<Arc<App>>,
) -> Result<Json<CooldownsResponse>, ApiError> {
    let cooldowns = app
        .use_cases
        .queries
        .cooldowns(caller.user_id)
        .await
        .map_err(|e| ApiError::repo(&e, "list cooldowns"))?;
    Ok(Json(CooldownsResponse { cooldowns }))
}

async fn raids(_caller: Caller, State(app): State<Arc<App>>) -> Json<RaidsResponse> {
    Json(RaidsResponse {
        raids: app.use_cases.queries.raids().await,
    })
}

// =============================================================================
// Admin
// =============================================================================

async fn grant_achievement(
    Admin(admin): Admin,
    State(app): State<Arc<App>>,
    Json(request): Json<AchievementChangeRequest>,
) -> Result<Json<AchievementChangeResponse>, ApiError> {
    let user_id = UserId::from_uuid(request.user_id);
    let changed = app
        .use_cases
        .achievements
        .grant(admin.user_id, user_id, &request.achievement_id)
        .await?;
    Ok(Json(AchievementChangeResponse {
        user_id: request.user_id,
        achievement_id: request.achievement_id,
        changed,
    }))
}

async fn revoke_achievement(
    Admin(admin): Admin,
    State(app): State<Arc<App>>,
    Json(request): Json<AchievementChangeRequest>,
) -> Result<Json<AchievementChangeResponse>, ApiError> {
    let user_id = UserId::from_uuid(request.user_id);
    let changed = app
        .use_cases
        .achievements
        .revoke(admin.user_id, user_id, &request.achievement_id)
        .await?;
    Ok(Json(AchievementChangeResponse {
        user_id: request.user_id,
        achievement_id: request.achievement_id,
        changed,
    }))
}

async fn trigger_challenge(
    Admin(admin): Admin,
    State(app): State<Arc<App>>,
    Path(user_id): Path<Uuid>,
) -> Json<ChallengeTriggerResponse> {
    let issued = app
        .use_cases
        .challenge
        .issue_for_user(UserId::from_uuid(user_id))
        .await;
    tracing::info!(
        user_id = %user_id,
        triggered_by = %admin.user_id,
        issued,
        "Admin challenge triggered"
    );
    Json(ChallengeTriggerResponse { user_id, issued })
}

// =============================================================================
// Authentication
// =============================================================================

/// A caller with a verified bearer token.
pub struct Caller(pub VerifiedIdentity);

/// A caller whose token carries the admin role.
pub struct Admin(pub VerifiedIdentity);

impl FromRequestParts<Arc<App>> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, app: &Arc<App>) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(ApiError::Unauthorized)?;

        let identity = app.use_cases.session.authenticate(token).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token refused");
            ApiError::Unauthorized
        })?;
        Ok(Caller(identity))
    }
}

impl FromRequestParts<Arc<App>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, app: &Arc<App>) -> Result<Self, Self::Rejection> {
        let Caller(mut identity) = Caller::from_request_parts(parts, app).await?;
        // A user already on record is judged by the stored role.
        if let Some(stored) = app
            .repositories
            .users
            .get(identity.user_id)
            .await
            .map_err(|e| ApiError::repo(&e, "load caller"))?
        {
            identity.role = stored.role();
        }
        if !identity.role.is_admin() {
            tracing::warn!(user_id = %identity.user_id, "Admin route refused");
            return Err(ApiError::Forbidden);
        }
        Ok(Admin(identity))
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    Forbidden,
    NotFound(String),
    BadRequest(String),
    /// Already sanitized for the client.
    Internal(String),
}

impl ApiError {
    fn repo(e: &RepoError, operation: &str) -> Self {
        ApiError::Internal(sanitize_repo_error(e, operation))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<AchievementError> for ApiError {
    fn from(e: AchievementError) -> Self {
        match e {
            AchievementError::UnknownAchievement(_) => ApiError::BadRequest(e.to_string()),
            AchievementError::UserNotFound(_) => ApiError::NotFound(e.to_string()),
            AchievementError::Repo(e) => ApiError::repo(&e, "change achievement"),
        }
    }
}
