/// User endpoints
///
/// Public profiles and the leaderboard, plus the admin management surface.
///
/// # Endpoints
///
/// - `GET /api/users` - List accounts (admin; role/status/search filters)
/// - `GET /api/users/leaderboard` - Public engagement leaderboard
/// - `GET /api/users/stats` - Aggregate account statistics (admin)
/// - `GET /api/users/:id` - Public profile (private fields for owner/admin)
/// - `PUT /api/users/:id/role` - Change role (admin)
/// - `PUT /api/users/:id/status` - Change account status (admin)
/// - `DELETE /api/users/:id` - Delete account and everything it owns (admin)
/// - `POST /api/users/:id/achievement` - Award a custom achievement (admin)
/// - `GET /api/users/:id/activity` - Analytics timeline (owner or admin)

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{Duration, Utc};
use cosmic_shared::{
    auth::{
        authorization::{require_auth, require_role},
        middleware::AuthContext,
    },
    models::{
        analytics::AnalyticsEvent,
        guestbook::{EntryStatus, GuestbookEntry},
        project::{Project, ProjectFilter, ProjectSort, Visibility},
        user::{
            AccountStatus, LeaderboardEntry, Role, User, UserListFilter, UserProfile,
        },
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_request, ApiResponse, Page, Pagination},
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Admin listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

/// Role change request
#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub role: Role,
}

/// Status change request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: AccountStatus,
}

/// Custom achievement award
#[derive(Debug, Deserialize, Validate)]
pub struct AchievementRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 300, message = "Description must be 1-300 characters"))]
    pub description: String,

    #[validate(length(min = 1, max = 10, message = "Icon must be 1-10 characters"))]
    pub icon: String,
}

/// Public profile response with recent activity
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub recent_projects: Vec<Project>,
    pub recent_messages: Vec<GuestbookEntry>,
}

/// Lists accounts (admin)
pub async fn list(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Page<UserProfile>>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    let role = match query.role.as_deref() {
        Some(r) => Some(
            Role::parse(r).ok_or_else(|| ApiError::BadRequest(format!("Unknown role: {}", r)))?,
        ),
        None => None,
    };
    let status = match query.status.as_deref() {
        Some(s) => Some(
            AccountStatus::parse(s)
                .ok_or_else(|| ApiError::BadRequest(format!("Unknown status: {}", s)))?,
        ),
        None => None,
    };

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };
    let page = pagination.page();
    let limit = pagination.limit(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = pagination.offset(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

    let filter = UserListFilter {
        role,
        status,
        search: query.search,
    };

    let (users, total) = User::list(&state.db, &filter, limit, offset).await?;
    let profiles = users.iter().map(|u| u.to_profile(true)).collect();

    Ok(Json(ApiResponse::ok(
        "Users",
        Page::new(profiles, page, limit, total),
    )))
}

/// Public engagement leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<LeaderboardEntry>>>> {
    let entries = User::leaderboard(&state.db, 10).await?;
    Ok(Json(ApiResponse::ok("Leaderboard", entries)))
}

/// Aggregate account statistics (admin)
///
/// Overview counters, role distribution, and a 30-day active-user trend.
pub async fn stats(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    let since = Utc::now() - Duration::days(30);

    let overview = User::stats_overview(&state.db, since).await?;
    let roles = User::role_distribution(&state.db).await?;
    let daily_active = User::daily_active(&state.db, since).await?;

    Ok(Json(ApiResponse::ok(
        "User statistics",
        serde_json::json!({
            "overview": overview,
            "roles": roles,
            "daily_active": daily_active,
        }),
    )))
}

/// Public profile with recent public activity
///
/// Email and last-login are stripped unless the viewer is the owner or an
/// admin. Views by other people bump the profile view counter.
pub async fn get_profile(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ProfileResponse>>> {
    let auth = auth.map(|Extension(a)| a);

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let is_owner = auth.as_ref().map(|a| a.user_id == id).unwrap_or(false);
    let include_private = is_owner || auth.as_ref().map(|a| a.is_admin()).unwrap_or(false);

    if !is_owner {
        User::increment_profile_views(&state.db, id).await?;
    }

    let filter = ProjectFilter {
        visibility: Some(Visibility::Public),
        creator_id: Some(id),
        ..Default::default()
    };
    let (recent_projects, _) =
        Project::list(&state.db, &filter, ProjectSort::Newest, 6, 0).await?;

    let recent_messages: Vec<GuestbookEntry> = GuestbookEntry::by_user(&state.db, id, 20)
        .await?
        .into_iter()
        .filter(|e| e.status == EntryStatus::Approved && !e.is_spam)
        .take(5)
        .collect();

    Ok(Json(ApiResponse::ok(
        "User profile",
        ProfileResponse {
            profile: user.to_profile(include_private),
            recent_projects,
            recent_messages,
        },
    )))
}

/// Changes an account's role (admin)
///
/// Admins cannot change their own role, so the last admin cannot lock
/// everyone out. Promotion to admin earns the "Space Commander" achievement.
pub async fn set_role(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetRoleRequest>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    if auth.user_id == id {
        return Err(ApiError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }

    let user = User::set_role(&state.db, id, req.role)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if req.role == Role::Admin {
        User::award_achievement(
            &state.db,
            id,
            "Space Commander",
            "Promoted to administrator",
            "🛸",
        )
        .await?;
    }

    tracing::info!(user_id = %id, role = req.role.as_str(), by = %auth.user_id, "Role changed");

    Ok(Json(ApiResponse::ok("Role updated", user.to_profile(true))))
}

/// Changes an account's status (admin)
pub async fn set_status(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    if auth.user_id == id {
        return Err(ApiError::BadRequest(
            "You cannot change your own account status".to_string(),
        ));
    }

    let user = User::set_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %id, status = req.status.as_str(), by = %auth.user_id, "Status changed");

    Ok(Json(ApiResponse::ok(
        "Status updated",
        user.to_profile(true),
    )))
}

/// Deletes an account (admin)
///
/// Foreign key cascades remove the account's projects, guestbook entries,
/// likes, comments, and analytics events in the same statement.
pub async fn remove(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    if auth.user_id == id {
        return Err(ApiError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if !User::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %id, by = %auth.user_id, "Account deleted");

    Ok(Json(ApiResponse::ok("Account deleted", ())))
}

/// Awards a custom achievement (admin)
pub async fn award_achievement(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AchievementRequest>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;
    check_request(&req)?;

    if User::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let awarded =
        User::award_achievement(&state.db, id, &req.name, &req.description, &req.icon).await?;

    if !awarded {
        return Err(ApiError::Conflict(format!(
            "Achievement \"{}\" already awarded",
            req.name
        )));
    }

    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Achievement awarded",
        user.to_profile(true),
    )))
}

/// Analytics timeline for one account (owner or admin)
pub async fn activity(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<Vec<AnalyticsEvent>>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    if auth.user_id != id && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Not authorized to access this resource".to_string(),
        ));
    }

    let events = AnalyticsEvent::user_activity(&state.db, id, 30, 50).await?;

    Ok(Json(ApiResponse::ok("Activity", events)))
}
