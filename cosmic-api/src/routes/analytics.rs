/// Analytics endpoints
///
/// Ingest is fire-and-forget: the frontend posts events with `sendBeacon`
/// and never reads the body, so a failed write is logged server-side and
/// still answered with success. The dashboard is admin-only.
///
/// # Endpoints
///
/// - `POST /api/analytics/event` - Record an event (public)
/// - `GET /api/analytics/events` - Recent events (admin)
/// - `GET /api/analytics/dashboard` - Aggregated dashboard data (admin)

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::Utc;
use cosmic_shared::{
    auth::{
        authorization::{require_auth, require_role},
        middleware::AuthContext,
    },
    models::{
        analytics::{AnalyticsEvent, TrackEvent},
        guestbook::GuestbookEntry,
        project::Project,
        user::{Role, User},
    },
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{check_request, client_ip, user_agent, ApiResponse},
};

/// Event ingest request
#[derive(Debug, Deserialize, Validate)]
pub struct TrackEventRequest {
    #[validate(length(min = 1, max = 50, message = "Event type must be 1-50 characters"))]
    pub event_type: String,

    #[validate(length(min = 1, max = 100, message = "Event name must be 1-100 characters"))]
    pub event_name: String,

    #[validate(length(min = 1, max = 100, message = "Session id must be 1-100 characters"))]
    pub session_id: String,

    pub user_id: Option<Uuid>,

    #[validate(length(max = 1024, message = "Page URL must be at most 1024 characters"))]
    pub page_url: Option<String>,

    #[validate(length(max = 512, message = "Page path must be at most 512 characters"))]
    pub page_path: Option<String>,

    pub event_data: Option<Value>,
    pub is_conversion: Option<bool>,

    #[validate(length(max = 50, message = "Conversion type must be at most 50 characters"))]
    pub conversion_type: Option<String>,
}

/// Recent events query
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<i64>,
}

/// Records an analytics event
///
/// Attribution: a signed-in caller's own ID wins over whatever the client
/// sent. Page views are echoed onto the live feed.
pub async fn track_event(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    headers: HeaderMap,
    Json(req): Json<TrackEventRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = auth.map(|Extension(a)| a);
    check_request(&req)?;

    let ip = client_ip(&headers);

    let event = TrackEvent {
        event_type: req.event_type.clone(),
        event_name: req.event_name,
        user_id: auth.as_ref().map(|a| a.user_id).or(req.user_id),
        session_id: req.session_id,
        ip_address: (ip != "unknown").then_some(ip),
        user_agent: user_agent(&headers),
        page_url: req.page_url,
        page_path: req.page_path.clone(),
        event_data: req.event_data,
        is_conversion: req.is_conversion,
        conversion_type: req.conversion_type,
    };

    match AnalyticsEvent::track(&state.db, event).await {
        Ok(_) => {
            if req.event_type == "page_view" {
                state.live.publish(crate::live::LiveEvent::VisitorActivity {
                    event_type: req.event_type,
                    page_path: req.page_path,
                    recorded_at: Utc::now(),
                });
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to record analytics event");
        }
    }

    Ok(Json(ApiResponse::ok("Event recorded", ())))
}

/// Recent events (admin)
pub async fn list_events(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Json<ApiResponse<Vec<AnalyticsEvent>>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let events = AnalyticsEvent::recent(&state.db, limit).await?;

    Ok(Json(ApiResponse::ok("Events", events)))
}

/// Aggregated dashboard data (admin)
///
/// Everything the dashboard charts need in one response: headline metrics,
/// the 30-day visitor trend, page views by path, project engagement, and a
/// recent activity feed.
pub async fn dashboard(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<ApiResponse<Value>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    const WINDOW_DAYS: i32 = 30;

    let total_page_views = AnalyticsEvent::total_page_views(&state.db).await?;
    let unique_sessions = AnalyticsEvent::unique_sessions_since(&state.db, WINDOW_DAYS).await?;
    let daily_counts = AnalyticsEvent::daily_counts(&state.db, WINDOW_DAYS).await?;
    let path_counts = AnalyticsEvent::path_counts(&state.db, WINDOW_DAYS, 10).await?;
    let type_counts = AnalyticsEvent::type_counts(&state.db, WINDOW_DAYS).await?;
    let avg_session_seconds =
        AnalyticsEvent::avg_session_seconds(&state.db, WINDOW_DAYS).await?;
    let conversions = AnalyticsEvent::conversions_since(&state.db, WINDOW_DAYS).await?;

    let top_projects = Project::top_engagement(&state.db, 5).await?;
    let total_project_likes = Project::total_likes(&state.db).await?;
    let guestbook_entries = GuestbookEntry::count_approved(&state.db).await?;
    let leaderboard = User::leaderboard(&state.db, 5).await?;
    let recent_events = AnalyticsEvent::recent(&state.db, 10).await?;

    Ok(Json(ApiResponse::ok(
        "Dashboard",
        serde_json::json!({
            "metrics": {
                "total_page_views": total_page_views,
                "unique_sessions": unique_sessions,
                "avg_session_seconds": avg_session_seconds,
                "conversions": conversions,
            },
            "visitor_trend": daily_counts,
            "page_views_by_path": path_counts,
            "events_by_type": type_counts,
            "engagement": {
                "top_projects": top_projects,
                "total_project_likes": total_project_likes,
                "guestbook_entries": guestbook_entries,
                "top_users": leaderboard,
            },
            "recent_activity": recent_events,
        }),
    )))
}
