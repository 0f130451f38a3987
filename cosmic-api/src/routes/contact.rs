/// Contact form endpoints
///
/// # Endpoints
///
/// - `POST /api/contact` - Submit the contact form (public)
/// - `GET /api/contact` - List submissions (admin; status filter)
/// - `PUT /api/contact/:id/status` - Move a submission through the workflow (admin)
/// - `DELETE /api/contact/:id` - Delete a submission (admin)

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Extension, Json,
};
use cosmic_shared::{
    auth::{
        authorization::{require_auth, require_role},
        middleware::AuthContext,
    },
    models::analytics::{AnalyticsEvent, TrackEvent},
    models::contact::{Contact, ContactStatus, CreateContact},
    models::user::Role,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{check_request, client_ip, user_agent, ApiResponse, Page, Pagination},
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Contact form submission
#[derive(Debug, Deserialize, Validate)]
pub struct CreateContactRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Subject must be 1-200 characters"))]
    pub subject: String,

    #[validate(length(min = 10, max = 2000, message = "Message must be 10-2000 characters"))]
    pub message: String,
}

/// Admin listing query
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

/// Status transition request
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: ContactStatus,
}

/// Submits the contact form
///
/// Records a conversion event for the analytics dashboard; a failed
/// analytics write is logged and ignored.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateContactRequest>,
) -> ApiResult<Json<ApiResponse<Contact>>> {
    check_request(&req)?;

    let ip = client_ip(&headers);
    let agent = user_agent(&headers);

    let contact = Contact::create(
        &state.db,
        CreateContact {
            name: req.name,
            email: req.email,
            subject: req.subject,
            message: req.message,
            ip_address: (ip != "unknown").then(|| ip.clone()),
            user_agent: agent.clone(),
        },
    )
    .await?;

    tracing::info!(contact_id = %contact.id, "Contact form submitted");

    let conversion = AnalyticsEvent::track(
        &state.db,
        TrackEvent {
            event_type: "conversion".to_string(),
            event_name: "contact_form".to_string(),
            user_id: None,
            session_id: format!("contact-{}", contact.id),
            ip_address: (ip != "unknown").then_some(ip),
            user_agent: agent,
            page_url: None,
            page_path: Some("/contact".to_string()),
            event_data: None,
            is_conversion: Some(true),
            conversion_type: Some("contact_form".to_string()),
        },
    )
    .await;
    if let Err(e) = conversion {
        tracing::warn!(error = %e, "Failed to record contact conversion event");
    }

    Ok(Json(ApiResponse::ok("Message sent", contact)))
}

/// Lists submissions, optionally filtered by status (admin)
pub async fn list(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Page<Contact>>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    let status = match query.status.as_deref() {
        Some(s) => Some(
            ContactStatus::parse(s)
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

    let (contacts, total) = Contact::list(&state.db, status, limit, offset).await?;

    Ok(Json(ApiResponse::ok(
        "Contact submissions",
        Page::new(contacts, page, limit, total),
    )))
}

/// Moves a submission through the workflow (admin)
pub async fn set_status(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SetStatusRequest>,
) -> ApiResult<Json<ApiResponse<Contact>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    let contact = Contact::set_status(&state.db, id, req.status)
        .await?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    Ok(Json(ApiResponse::ok("Status updated", contact)))
}

/// Deletes a submission (admin)
pub async fn remove(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    require_role(&auth, Role::Admin)?;

    if !Contact::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    }

    tracing::info!(contact_id = %id, by = %auth.user_id, "Contact submission deleted");

    Ok(Json(ApiResponse::ok("Submission deleted", ())))
}
