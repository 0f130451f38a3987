/// Portfolio project model and database operations
///
/// Projects are the showcase items of the portfolio gallery. Likes live in a
/// dedicated `project_likes` set table so toggling is naturally idempotent;
/// the `likes` column on the project row is a denormalized count refreshed
/// after every toggle. Comments are plain child rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Project visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "project_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Sort orders accepted by the project listing
///
/// Parsed from the `sort` query parameter; anything unrecognized falls back
/// to newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectSort {
    #[default]
    Newest,
    Oldest,
    MostViewed,
    MostLiked,
    RecentlyUpdated,
}

impl ProjectSort {
    /// Parses the client-facing sort key (`-created_at`, `views`, ...)
    pub fn parse(s: &str) -> Self {
        match s {
            "created_at" => ProjectSort::Oldest,
            "-created_at" => ProjectSort::Newest,
            "-views" | "views" => ProjectSort::MostViewed,
            "-likes" | "likes" => ProjectSort::MostLiked,
            "-updated_at" => ProjectSort::RecentlyUpdated,
            _ => ProjectSort::Newest,
        }
    }

    /// The ORDER BY clause for this sort; values are fixed strings, never
    /// client input
    fn order_clause(&self) -> &'static str {
        match self {
            ProjectSort::Newest => "p.created_at DESC",
            ProjectSort::Oldest => "p.created_at ASC",
            ProjectSort::MostViewed => "p.views DESC, p.created_at DESC",
            ProjectSort::MostLiked => "p.likes DESC, p.created_at DESC",
            ProjectSort::RecentlyUpdated => "p.updated_at DESC",
        }
    }
}

const PROJECT_COLUMNS: &str = "p.id, p.creator_id, p.title, p.description, p.short_description, \
     p.category, p.tags, p.technologies, p.visibility, p.status, p.featured, p.views, p.likes, \
     p.repo_url, p.demo_url, p.thumbnail_url, p.created_at, p.updated_at";

const CREATOR_COLUMNS: &str =
    "u.username AS creator_username, u.full_name AS creator_full_name, u.avatar_url AS creator_avatar_url";

/// Portfolio project with creator attribution joined in
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    /// Unique project ID (UUID v4)
    pub id: Uuid,

    /// Owning account
    pub creator_id: Uuid,

    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub technologies: Vec<String>,
    pub visibility: Visibility,

    /// Project stage, free-form (e.g. "completed", "in-progress")
    pub status: String,

    pub featured: bool,

    /// View counter, incremented on each detail fetch
    pub views: i32,

    /// Denormalized like count (source of truth is `project_likes`)
    pub likes: i32,

    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub creator_username: String,
    pub creator_full_name: Option<String>,
    pub creator_avatar_url: Option<String>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub creator_id: Uuid,
    pub title: String,
    pub description: String,
    pub short_description: Option<String>,
    pub category: String,
    pub tags: Vec<String>,
    pub technologies: Vec<String>,
    pub visibility: Visibility,
    pub status: Option<String>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Input for updating a project; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub technologies: Option<Vec<String>>,
    pub visibility: Option<Visibility>,
    pub status: Option<String>,
    pub featured: Option<bool>,
    pub repo_url: Option<String>,
    pub demo_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Filters for the project listing
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Restrict to a visibility (public listings pass `Some(Public)`)
    pub visibility: Option<Visibility>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub status: Option<String>,
    /// Substring match against title, descriptions, and tags
    pub search: Option<String>,
    /// Restrict to one creator
    pub creator_id: Option<Uuid>,
}

/// Result of a like toggle
#[derive(Debug, Clone, Serialize)]
pub struct LikeOutcome {
    /// True if the toggle resulted in a like, false if it removed one
    pub liked: bool,

    /// Like count after the toggle
    pub likes_count: i64,
}

/// A project comment joined with its author
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CommentView {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Count of public projects per category
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Views/likes pair for the dashboard engagement chart
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProjectEngagement {
    pub title: String,
    pub views: i32,
    pub likes: i32,
}

impl Project {
    /// Creates a new project
    pub async fn create(pool: &PgPool, data: CreateProject) -> Result<Self, sqlx::Error> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO projects (creator_id, title, description, short_description, category,
                                   tags, technologies, visibility, status, repo_url, demo_url,
                                   thumbnail_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, 'completed'), $10, $11, $12)
             RETURNING id",
        )
        .bind(data.creator_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.short_description)
        .bind(data.category)
        .bind(data.tags)
        .bind(data.technologies)
        .bind(data.visibility)
        .bind(data.status)
        .bind(data.repo_url)
        .bind(data.demo_url)
        .bind(data.thumbnail_url)
        .fetch_one(pool)
        .await?;

        // The insert cannot race its own read here; the row must exist
        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds a project by ID, with creator attribution
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS}, {CREATOR_COLUMNS}
             FROM projects p JOIN users u ON u.id = p.creator_id
             WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Lists projects matching the filter, with total count for pagination
    pub async fn list(
        pool: &PgPool,
        filter: &ProjectFilter,
        sort: ProjectSort,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let where_clause = "($1::project_visibility IS NULL OR p.visibility = $1)
               AND ($2::text IS NULL OR p.category = $2)
               AND ($3::bool IS NULL OR p.featured = $3)
               AND ($4::text IS NULL OR p.status = $4)
               AND ($5::uuid IS NULL OR p.creator_id = $5)
               AND ($6::text IS NULL
                    OR p.title ILIKE '%' || $6 || '%'
                    OR p.description ILIKE '%' || $6 || '%'
                    OR p.short_description ILIKE '%' || $6 || '%'
                    OR $6 ILIKE ANY(p.tags))";

        let projects = sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS}, {CREATOR_COLUMNS}
             FROM projects p JOIN users u ON u.id = p.creator_id
             WHERE {where_clause}
             ORDER BY {order}
             LIMIT $7 OFFSET $8",
            order = sort.order_clause(),
        ))
        .bind(filter.visibility)
        .bind(filter.category.as_deref())
        .bind(filter.featured)
        .bind(filter.status.as_deref())
        .bind(filter.creator_id)
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM projects p WHERE {where_clause}"
        ))
        .bind(filter.visibility)
        .bind(filter.category.as_deref())
        .bind(filter.featured)
        .bind(filter.status.as_deref())
        .bind(filter.creator_id)
        .bind(filter.search.as_deref())
        .fetch_one(pool)
        .await?;

        Ok((projects, total))
    }

    /// Featured public projects
    pub async fn featured(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS}, {CREATOR_COLUMNS}
             FROM projects p JOIN users u ON u.id = p.creator_id
             WHERE p.visibility = 'public' AND p.featured = TRUE
             ORDER BY p.created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Trending public projects: recent projects ranked by engagement
    pub async fn trending(pool: &PgPool, days: i32, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Project>(&format!(
            "SELECT {PROJECT_COLUMNS}, {CREATOR_COLUMNS}
             FROM projects p JOIN users u ON u.id = p.creator_id
             WHERE p.visibility = 'public'
               AND p.created_at >= NOW() - ($1::int * INTERVAL '1 day')
             ORDER BY p.views + p.likes * 3 DESC, p.created_at DESC
             LIMIT $2"
        ))
        .bind(days)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Public project categories with counts
    pub async fn categories(pool: &PgPool) -> Result<Vec<CategoryCount>, sqlx::Error> {
        sqlx::query_as::<_, CategoryCount>(
            "SELECT category, COUNT(*) AS count
             FROM projects
             WHERE visibility = 'public'
             GROUP BY category
             ORDER BY count DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Updates a project; only `Some` fields are written
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProject,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE projects SET
                 title = COALESCE($2, title),
                 description = COALESCE($3, description),
                 short_description = COALESCE($4, short_description),
                 category = COALESCE($5, category),
                 tags = COALESCE($6, tags),
                 technologies = COALESCE($7, technologies),
                 visibility = COALESCE($8, visibility),
                 status = COALESCE($9, status),
                 featured = COALESCE($10, featured),
                 repo_url = COALESCE($11, repo_url),
                 demo_url = COALESCE($12, demo_url),
                 thumbnail_url = COALESCE($13, thumbnail_url),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id",
        )
        .bind(id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.short_description)
        .bind(data.category)
        .bind(data.tags)
        .bind(data.technologies)
        .bind(data.visibility)
        .bind(data.status)
        .bind(data.featured)
        .bind(data.repo_url)
        .bind(data.demo_url)
        .bind(data.thumbnail_url)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Deletes a project
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Increments the view counter
    pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Toggles a like for a user
    ///
    /// A second like from the same user removes the first, so the like set
    /// can never double-count. Refreshes the denormalized `likes` column.
    pub async fn toggle_like(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<LikeOutcome, sqlx::Error> {
        let removed = sqlx::query(
            "DELETE FROM project_likes WHERE project_id = $1 AND user_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

        let liked = if removed == 0 {
            sqlx::query(
                "INSERT INTO project_likes (project_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;
            true
        } else {
            false
        };

        let likes_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM project_likes WHERE project_id = $1")
                .bind(project_id)
                .fetch_one(pool)
                .await?;

        sqlx::query("UPDATE projects SET likes = $2 WHERE id = $1")
            .bind(project_id)
            .bind(likes_count as i32)
            .execute(pool)
            .await?;

        Ok(LikeOutcome { liked, likes_count })
    }

    /// Which of the given projects a user has liked, in one query
    pub async fn liked_set(
        pool: &PgPool,
        user_id: Uuid,
        project_ids: &[Uuid],
    ) -> Result<std::collections::HashSet<Uuid>, sqlx::Error> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT project_id FROM project_likes WHERE user_id = $1 AND project_id = ANY($2)",
        )
        .bind(user_id)
        .bind(project_ids)
        .fetch_all(pool)
        .await?;

        Ok(ids.into_iter().collect())
    }

    /// Whether a user has liked a project
    pub async fn is_liked_by(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM project_likes WHERE project_id = $1 AND user_id = $2)",
        )
        .bind(project_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Adds a comment and returns it joined with its author
    pub async fn add_comment(
        pool: &PgPool,
        project_id: Uuid,
        user_id: Uuid,
        content: &str,
    ) -> Result<CommentView, sqlx::Error> {
        let comment_id: Uuid = sqlx::query_scalar(
            "INSERT INTO project_comments (project_id, user_id, content)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(pool)
        .await?;

        sqlx::query_as::<_, CommentView>(
            "SELECT c.id, c.project_id, c.user_id, u.username, u.avatar_url, c.content, c.created_at
             FROM project_comments c JOIN users u ON u.id = c.user_id
             WHERE c.id = $1",
        )
        .bind(comment_id)
        .fetch_one(pool)
        .await
    }

    /// Comments on a project, oldest first
    pub async fn comments(pool: &PgPool, project_id: Uuid) -> Result<Vec<CommentView>, sqlx::Error> {
        sqlx::query_as::<_, CommentView>(
            "SELECT c.id, c.project_id, c.user_id, u.username, u.avatar_url, c.content, c.created_at
             FROM project_comments c JOIN users u ON u.id = c.user_id
             WHERE c.project_id = $1
             ORDER BY c.created_at ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// Top public projects by raw engagement, for the dashboard chart
    pub async fn top_engagement(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<ProjectEngagement>, sqlx::Error> {
        sqlx::query_as::<_, ProjectEngagement>(
            "SELECT title, views, likes
             FROM projects
             WHERE visibility = 'public'
             ORDER BY views DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Total likes across all projects, for the dashboard engagement block
    pub async fn total_likes(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM project_likes")
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parsing() {
        assert_eq!(ProjectSort::parse("-created_at"), ProjectSort::Newest);
        assert_eq!(ProjectSort::parse("created_at"), ProjectSort::Oldest);
        assert_eq!(ProjectSort::parse("-views"), ProjectSort::MostViewed);
        assert_eq!(ProjectSort::parse("-likes"), ProjectSort::MostLiked);
        assert_eq!(ProjectSort::parse("-updated_at"), ProjectSort::RecentlyUpdated);
        assert_eq!(ProjectSort::parse("garbage"), ProjectSort::Newest);
    }

    #[test]
    fn test_order_clauses_are_fixed_strings() {
        // The ORDER BY fragment is interpolated into SQL, so it must come
        // from this fixed set regardless of input.
        for sort in [
            ProjectSort::Newest,
            ProjectSort::Oldest,
            ProjectSort::MostViewed,
            ProjectSort::MostLiked,
            ProjectSort::RecentlyUpdated,
        ] {
            assert!(sort.order_clause().starts_with("p."));
        }
    }
}
