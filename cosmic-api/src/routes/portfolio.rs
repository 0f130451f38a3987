/// Portfolio project endpoints
///
/// Public browsing of the project gallery plus authenticated CRUD, likes,
/// and comments.
///
/// # Endpoints
///
/// - `GET /api/portfolio` - List public projects (filters, sort, pagination)
/// - `GET /api/portfolio/featured` - Featured projects
/// - `GET /api/portfolio/trending` - Recent projects by engagement
/// - `GET /api/portfolio/categories` - Category counts
/// - `GET /api/portfolio/user/:user_id` - One user's public projects
/// - `GET /api/portfolio/:id` - Project detail (bumps view counter)
/// - `POST /api/portfolio` - Create (authenticated)
/// - `PUT /api/portfolio/:id` - Update (owner or admin)
/// - `DELETE /api/portfolio/:id` - Delete (owner or admin)
/// - `POST /api/portfolio/:id/like` - Toggle like (authenticated)
/// - `POST /api/portfolio/:id/comment` - Comment (authenticated)

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use cosmic_shared::{
    auth::{
        authorization::{require_auth, require_owner_or_admin},
        middleware::AuthContext,
    },
    models::{
        project::{
            CategoryCount, CommentView, CreateProject, LikeOutcome, Project, ProjectFilter,
            ProjectSort, UpdateProject, Visibility,
        },
        user::User,
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

const DEFAULT_PAGE_SIZE: i64 = 12;
const MAX_PAGE_SIZE: i64 = 50;

/// Query parameters for the project listing
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
}

/// A project plus the caller's like state (when authenticated)
#[derive(Debug, Serialize)]
pub struct ProjectItem {
    #[serde(flatten)]
    pub project: Project,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,
}

/// Project detail with comments
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub liked: Option<bool>,

    pub comments: Vec<CommentView>,
}

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: String,

    #[validate(length(max = 300, message = "Short description must be at most 300 characters"))]
    pub short_description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub technologies: Vec<String>,

    pub visibility: Option<Visibility>,
    pub status: Option<String>,

    #[validate(url(message = "Repository must be a valid URL"))]
    pub repo_url: Option<String>,

    #[validate(url(message = "Demo must be a valid URL"))]
    pub demo_url: Option<String>,

    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: Option<String>,
}

/// Update request; omitted fields keep their stored value
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 5000, message = "Description must be 1-5000 characters"))]
    pub description: Option<String>,

    #[validate(length(max = 300, message = "Short description must be at most 300 characters"))]
    pub short_description: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Category must be 1-50 characters"))]
    pub category: Option<String>,

    pub tags: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
    pub status: Option<String>,

    /// Only admins may feature projects
    pub featured: Option<bool>,

    #[validate(url(message = "Repository must be a valid URL"))]
    pub repo_url: Option<String>,

    #[validate(url(message = "Demo must be a valid URL"))]
    pub demo_url: Option<String>,

    #[validate(url(message = "Thumbnail must be a valid URL"))]
    pub thumbnail_url: Option<String>,
}

/// Comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Comment must be 1-1000 characters"))]
    pub content: String,
}

async fn with_liked_flags(
    state: &AppState,
    auth: &Option<AuthContext>,
    projects: Vec<Project>,
) -> Result<Vec<ProjectItem>, sqlx::Error> {
    let liked = match auth {
        Some(auth) => {
            let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
            Some(Project::liked_set(&state.db, auth.user_id, &ids).await?)
        }
        None => None,
    };

    Ok(projects
        .into_iter()
        .map(|project| {
            let flag = liked.as_ref().map(|set| set.contains(&project.id));
            ProjectItem {
                project,
                liked: flag,
            }
        })
        .collect())
}

/// Lists public projects with filters, sorting, and pagination
pub async fn list(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<Page<ProjectItem>>>> {
    let auth = auth.map(|Extension(a)| a);

    let pagination = Pagination {
        page: query.page,
        limit: query.limit,
    };
    let page = pagination.page();
    let limit = pagination.limit(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = pagination.offset(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

    let filter = ProjectFilter {
        visibility: Some(Visibility::Public),
        category: query.category,
        featured: query.featured,
        status: query.status,
        search: query.search,
        creator_id: None,
    };
    let sort = ProjectSort::parse(query.sort.as_deref().unwrap_or("-created_at"));

    let (projects, total) = Project::list(&state.db, &filter, sort, limit, offset).await?;
    let items = with_liked_flags(&state, &auth, projects).await?;

    Ok(Json(ApiResponse::ok(
        "Projects",
        Page::new(items, page, limit, total),
    )))
}

/// Featured public projects
pub async fn featured(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = Project::featured(&state.db, 6).await?;
    Ok(Json(ApiResponse::ok("Featured projects", projects)))
}

/// Trending projects: last 30 days ranked by views and likes
pub async fn trending(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<Project>>>> {
    let projects = Project::trending(&state.db, 30, 6).await?;
    Ok(Json(ApiResponse::ok("Trending projects", projects)))
}

/// Category counts for the gallery filter bar
pub async fn categories(
    State(state): State<AppState>,
) -> ApiResult<Json<ApiResponse<Vec<CategoryCount>>>> {
    let counts = Project::categories(&state.db).await?;
    Ok(Json(ApiResponse::ok("Categories", counts)))
}

/// One user's public projects
pub async fn by_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> ApiResult<Json<ApiResponse<Page<Project>>>> {
    if User::find_by_id(&state.db, user_id).await?.is_none() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let page = pagination.page();
    let limit = pagination.limit(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = pagination.offset(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

    let filter = ProjectFilter {
        visibility: Some(Visibility::Public),
        creator_id: Some(user_id),
        ..Default::default()
    };

    let (projects, total) =
        Project::list(&state.db, &filter, ProjectSort::Newest, limit, offset).await?;

    Ok(Json(ApiResponse::ok(
        "User projects",
        Page::new(projects, page, limit, total),
    )))
}

/// Project detail
///
/// Private projects are only visible to their owner and admins; to everyone
/// else they do not exist. Each fetch bumps the view counter.
pub async fn get_one(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<ProjectDetail>>> {
    let auth = auth.map(|Extension(a)| a);

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if project.visibility == Visibility::Private {
        let visible = auth
            .as_ref()
            .map(|a| a.user_id == project.creator_id || a.is_admin())
            .unwrap_or(false);
        if !visible {
            return Err(ApiError::NotFound("Project not found".to_string()));
        }
    }

    Project::increment_views(&state.db, id).await?;

    let liked = match &auth {
        Some(a) => Some(Project::is_liked_by(&state.db, id, a.user_id).await?),
        None => None,
    };

    let comments = Project::comments(&state.db, id).await?;

    Ok(Json(ApiResponse::ok(
        "Project",
        ProjectDetail {
            project,
            liked,
            comments,
        },
    )))
}

/// Creates a project
///
/// Bumps the creator's project counter; the first project earns the
/// "First Launch" achievement.
pub async fn create(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Json(req): Json<CreateRequest>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    let project = Project::create(
        &state.db,
        CreateProject {
            creator_id: auth.user_id,
            title: req.title,
            description: req.description,
            short_description: req.short_description,
            category: req.category,
            tags: req.tags,
            technologies: req.technologies,
            visibility: req.visibility.unwrap_or(Visibility::Public),
            status: req.status,
            repo_url: req.repo_url,
            demo_url: req.demo_url,
            thumbnail_url: req.thumbnail_url,
        },
    )
    .await?;

    let projects_created = User::adjust_projects_created(&state.db, auth.user_id, 1).await?;
    if projects_created == 1 {
        let awarded = User::award_achievement(
            &state.db,
            auth.user_id,
            "First Launch",
            "Published a first project",
            "🚀",
        )
        .await?;
        if awarded {
            tracing::info!(user_id = %auth.user_id, "Achievement: First Launch");
        }
    }

    tracing::info!(project_id = %project.id, user_id = %auth.user_id, "Project created");

    Ok(Json(ApiResponse::ok("Project created", project)))
}

/// Updates a project (owner or admin; featuring requires admin)
pub async fn update(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRequest>,
) -> ApiResult<Json<ApiResponse<Project>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    let existing = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    require_owner_or_admin(&auth, existing.creator_id)?;

    if req.featured.is_some() && !auth.is_admin() {
        return Err(ApiError::Forbidden(
            "Only admins can feature projects".to_string(),
        ));
    }

    let project = Project::update(
        &state.db,
        id,
        UpdateProject {
            title: req.title,
            description: req.description,
            short_description: req.short_description,
            category: req.category,
            tags: req.tags,
            technologies: req.technologies,
            visibility: req.visibility,
            status: req.status,
            featured: req.featured,
            repo_url: req.repo_url,
            demo_url: req.demo_url,
            thumbnail_url: req.thumbnail_url,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok(Json(ApiResponse::ok("Project updated", project)))
}

/// Deletes a project (owner or admin)
pub async fn remove(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    let existing = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    require_owner_or_admin(&auth, existing.creator_id)?;

    Project::delete(&state.db, id).await?;
    User::adjust_projects_created(&state.db, existing.creator_id, -1).await?;

    tracing::info!(project_id = %id, user_id = %auth.user_id, "Project deleted");

    Ok(Json(ApiResponse::ok("Project deleted", ())))
}

/// Toggles a like (authenticated)
///
/// Keeps the creator's likes_received counter in step with the toggle.
pub async fn toggle_like(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ApiResponse<LikeOutcome>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if project.visibility == Visibility::Private && project.creator_id != auth.user_id {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    let outcome = Project::toggle_like(&state.db, id, auth.user_id).await?;

    let delta = if outcome.liked { 1 } else { -1 };
    User::adjust_likes_received(&state.db, project.creator_id, delta).await?;

    Ok(Json(ApiResponse::ok(
        if outcome.liked { "Liked" } else { "Like removed" },
        outcome,
    )))
}

/// Adds a comment (authenticated)
pub async fn add_comment(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<ApiResponse<CommentView>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    let project = Project::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    if project.visibility == Visibility::Private && project.creator_id != auth.user_id {
        return Err(ApiError::NotFound("Project not found".to_string()));
    }

    let comment = Project::add_comment(&state.db, id, auth.user_id, &req.content).await?;

    Ok(Json(ApiResponse::ok("Comment added", comment)))
}
