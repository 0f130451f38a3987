/// Guestbook endpoints
///
/// Anyone can read approved entries and post new ones; signed-in visitors
/// additionally like, reply, and flag. Moderators work the review queue.
///
/// # Endpoints
///
/// - `GET /api/guestbook` - Approved entries (moderators may filter by status)
/// - `GET /api/guestbook/featured` - Featured entries
/// - `GET /api/guestbook/categories` - Category counts
/// - `GET /api/guestbook/:id` - Single entry (bumps view counter)
/// - `POST /api/guestbook` - Post an entry (optional auth; per-IP limit)
/// - `POST /api/guestbook/:id/like` - Toggle like (authenticated)
/// - `POST /api/guestbook/:id/reply` - Reply (authenticated)
/// - `POST /api/guestbook/:id/flag` - Flag for review (authenticated)
/// - `PUT /api/guestbook/:id/moderate` - Moderation decision (moderator)
/// - `DELETE /api/guestbook/:id` - Delete (moderator)

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use cosmic_shared::{
    auth::{authorization::require_auth, middleware::AuthContext},
    models::guestbook::{
        CreateEntry, EntryCategoryCount, EntryLikeOutcome, EntryStatus, FlagReason,
        GuestbookEntry, Moderation, ReplyView,
    },
    models::user::User,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    live::LiveEvent,
    routes::{check_request, client_ip, user_agent, ApiResponse, Page, Pagination},
};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 50;

/// Posts allowed per IP per hour
const POSTS_PER_HOUR: i64 = 5;

/// Query parameters for the entry listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub featured: Option<bool>,

    /// Moderation status filter; only honored for moderators
    pub status: Option<String>,
}

/// Entry submission
#[derive(Debug, Deserialize, Validate)]
pub struct CreateEntryRequest {
    /// Display name; ignored for signed-in visitors (their username is used)
    #[validate(length(min = 1, max = 50, message = "Name must be 1-50 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 1, max = 1000, message = "Message must be 1-1000 characters"))]
    pub message: String,

    #[validate(length(max = 30, message = "Category must be at most 30 characters"))]
    pub category: Option<String>,

    #[validate(length(max = 100, message = "Country must be at most 100 characters"))]
    pub country: Option<String>,

    #[validate(length(max = 100, message = "Timezone must be at most 100 characters"))]
    pub timezone: Option<String>,
}

/// Reply submission
#[derive(Debug, Deserialize, Validate)]
pub struct ReplyRequest {
    #[validate(length(min = 1, max = 500, message = "Reply must be 1-500 characters"))]
    pub message: String,
}

/// Flag submission
#[derive(Debug, Deserialize, Validate)]
pub struct FlagRequest {
    pub reason: FlagReason,

    #[validate(length(max = 500, message = "Description must be at most 500 characters"))]
    pub description: Option<String>,
}

/// Moderation decision
#[derive(Debug, Deserialize, Validate)]
pub struct ModerateRequest {
    pub status: EntryStatus,

    #[validate(length(max = 500, message = "Reason must be at most 500 characters"))]
    pub reason: Option<String>,

    pub featured: Option<bool>,
}

/// Lists guestbook entries
///
/// The public listing shows approved, non-spam entries, featured first.
/// Moderators may pass `?status=` to work the review queue.
pub async fn list(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Page<GuestbookEntry>>>> {
    let auth = auth.map(|Extension(a)| a);

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };
    let page = pagination.page();
    let limit = pagination.limit(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = pagination.offset(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

    let (entries, total) = match query.status.as_deref() {
        Some(status) => {
            let can_moderate = auth.as_ref().map(|a| a.can_moderate()).unwrap_or(false);
            if !can_moderate {
                return Err(ApiError::Forbidden(
                    "Moderator access required".to_string(),
                ));
            }

            let status = if status == "all" {
                None
            } else {
                Some(EntryStatus::parse(status).ok_or_else(|| {
                    ApiError::BadRequest(format!("Unknown status: {}", status))
                })?)
            };

            GuestbookEntry::list_for_moderation(&state.db, status, limit, offset).await?
        }
        None => {
            GuestbookEntry::list_public(
                &state.db,
                query.category.as_deref(),
                query.featured,
                limit,
                offset,
            )
            .await?
        }
    };

    Ok(Json(ApiResponse::ok(
        "Guestbook entries",
        Page::new(entries, page, limit, total),
    )))
}

/// Featured approved entries
pub async fn featured(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<GuestbookEntry>>>> {
    let entries = GuestbookEntry::featured(&state.db, 5).await?;
    Ok(Json(ApiResponse::ok("Featured entries", entries)))
}

/// Category counts for approved entries
pub async fn categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<EntryCategoryCount>>>> {
    let counts = GuestbookEntry::categories(&state.db).await?;
    Ok(Json(ApiResponse::ok("Categories", counts)))
}

/// Single entry with replies; bumps the view counter
///
/// Unapproved entries are only visible to moderators.
pub async fn get_one(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<serde_json::Value>>> {
    let auth = auth.map(|Extension(a)| a);

    let entry = GuestbookEntry::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))?;

    let publicly_visible = entry.status == EntryStatus::Approved && !entry.is_spam;
    let can_moderate = auth.as_ref().map(|a| a.can_moderate()).unwrap_or(false);
    if !publicly_visible && !can_moderate {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    GuestbookEntry::increment_views(&state.db, id).await?;
    let replies = GuestbookEntry::replies(&state.db, id).await?;

    Ok(Json(ApiResponse::ok(
        "Guestbook entry",
        serde_json::json!({ "entry": entry, "replies": replies }),
    )))
}

/// Posts a guestbook entry
///
/// Open to anonymous visitors; signed-in posters are attributed by username.
/// Each IP may post five entries per hour; the next attempt within the
/// window gets a 429 with `Retry-After`. Submissions are spam-scored; clean
/// ones go live immediately and are announced on the live feed.
pub async fn create(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    headers: HeaderMap,
    Json(req): Json<CreateEntryRequest>,
) -> ApiResult<Json<ApiResponse<GuestbookEntry>>> {
    let auth = auth.map(|Extension(a)| a);
    check_request(&req)?;

    let name = match &auth {
        Some(auth) => auth.username.clone(),
        None => req
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("Name is required".to_string()))?,
    };

    let ip = client_ip(&headers);
    if ip != "unknown" {
        let recent = GuestbookEntry::recent_count_by_ip(&state.db, &ip).await?;
        if recent >= POSTS_PER_HOUR {
            return Err(ApiError::RateLimitExceeded {
                retry_after: 3600,
                message: "Too many guestbook posts from this address. Try again later"
                    .to_string(),
            });
        }
    }

    let entry = GuestbookEntry::create(
        &state.db,
        CreateEntry {
            user_id: auth.as_ref().map(|a| a.user_id),
            name,
            email: req.email,
            message: req.message,
            category: req.category,
            country: req.country,
            timezone: req.timezone,
            ip_address: (ip != "unknown").then_some(ip),
            user_agent: user_agent(&headers),
        },
    )
    .await?;

    if let Some(auth) = &auth {
        let posted = User::increment_messages_posted(&state.db, auth.user_id).await?;
        if posted >= 10 {
            let awarded = User::award_achievement(
                &state.db,
                auth.user_id,
                "Social Butterfly",
                "Posted ten guestbook messages",
                "🦋",
            )
            .await?;
            if awarded {
                tracing::info!(user_id = %auth.user_id, "Achievement: Social Butterfly");
            }
        }
    }

    if entry.status == EntryStatus::Approved {
        state.live.publish(LiveEvent::GuestbookMessage {
            entry_id: entry.id,
            name: entry.name.clone(),
            excerpt: entry.excerpt(),
            posted_at: entry.created_at,
        });
    } else {
        tracing::info!(entry_id = %entry.id, score = entry.spam_score, "Entry held for review");
    }

    Ok(Json(ApiResponse::ok("Entry posted", entry)))
}

/// Toggles a like on an approved entry (authenticated)
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<EntryLikeOutcome>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    let entry = GuestbookEntry::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))?;

    if entry.status != EntryStatus::Approved || entry.is_spam {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    let outcome = GuestbookEntry::toggle_like(&state.db, id, auth.user_id).await?;

    Ok(Json(ApiResponse::ok(
        if outcome.liked { "Liked" } else { "Like removed" },
        outcome,
    )))
}

/// Replies to an approved entry (authenticated)
pub async fn add_reply(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> ApiResult<Json<ApiResponse<ReplyView>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    let entry = GuestbookEntry::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))?;

    if entry.status != EntryStatus::Approved || entry.is_spam {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    let reply = GuestbookEntry::add_reply(&state.db, id, auth.user_id, &req.message).await?;

    Ok(Json(ApiResponse::ok("Reply added", reply)))
}

/// Flags an entry for review (authenticated, once per entry)
pub async fn flag(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<FlagRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    if GuestbookEntry::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    let recorded =
        GuestbookEntry::flag(&state.db, id, auth.user_id, req.reason, req.description.as_deref())
            .await?;

    if !recorded {
        return Err(ApiError::Conflict(
            "You already flagged this entry".to_string(),
        ));
    }

    tracing::info!(entry_id = %id, user_id = %auth.user_id, reason = req.reason.as_str(), "Entry flagged");

    Ok(Json(ApiResponse::ok("Entry flagged", ())))
}

/// Applies a moderation decision (moderator)
pub async fn moderate(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ModerateRequest>,
) -> ApiResult<Json<ApiResponse<GuestbookEntry>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    if !auth.can_moderate() {
        return Err(ApiError::Forbidden("Moderator access required".to_string()));
    }
    check_request(&req)?;

    let entry = GuestbookEntry::moderate(
        &state.db,
        id,
        Moderation {
            status: req.status,
            reason: req.reason,
            featured: req.featured,
            moderator_id: auth.user_id,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Entry not found".to_string()))?;

    tracing::info!(
        entry_id = %id,
        moderator = %auth.user_id,
        status = entry.status.as_str(),
        "Entry moderated"
    );

    Ok(Json(ApiResponse::ok("Entry moderated", entry)))
}

/// Deletes an entry (moderator)
pub async fn remove(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    if !auth.can_moderate() {
        return Err(ApiError::Forbidden("Moderator access required".to_string()));
    }

    if !GuestbookEntry::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Entry not found".to_string()));
    }

    tracing::info!(entry_id = %id, moderator = %auth.user_id, "Entry deleted");

    Ok(Json(ApiResponse::ok("Entry deleted", ())))
}
