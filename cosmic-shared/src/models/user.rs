/// User model and database operations
///
/// Accounts carry a flat role (user/moderator/admin), an account status used
/// to lock people out without deleting data, denormalized stat counters, and
/// an achievements list stored as a jsonb array.
///
/// All foreign keys referencing `users` are declared `ON DELETE CASCADE`
/// (or `SET NULL` for moderation attribution), so [`User::delete`] removes an
/// account and everything it owns in one atomic statement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Account role
///
/// Flat hierarchy: admin > moderator > user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account: own projects, likes, comments, replies
    User,

    /// Can moderate guestbook content
    Moderator,

    /// Full control: user management, analytics, everything moderators can do
    Admin,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        }
    }

    /// Parses a role from its lowercase string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "moderator" => Some(Role::Moderator),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Checks whether this role meets or exceeds a required role
    pub fn has_permission(&self, required: Role) -> bool {
        self.permission_level() >= required.permission_level()
    }

    fn permission_level(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Moderator => 2,
            Role::User => 1,
        }
    }
}

/// Account status
///
/// Suspended and inactive accounts fail authentication; their data remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Suspended,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Suspended => "suspended",
        }
    }

    /// Parses a status from its lowercase string form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "suspended" => Some(AccountStatus::Suspended),
            _ => None,
        }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, role, status, full_name, bio, \
     avatar_url, website, location, profile_views, projects_created, messages_posted, \
     likes_received, achievements, login_count, last_login_at, created_at, updated_at";

/// User model representing an account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique account ID (UUID v4)
    pub id: Uuid,

    /// Unique username (lowercase)
    pub username: String,

    /// Unique email address (lowercase)
    pub email: String,

    /// Argon2id password hash, never plaintext
    pub password_hash: String,

    /// Account role
    pub role: Role,

    /// Account status
    pub status: AccountStatus,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional short bio
    pub bio: Option<String>,

    /// Optional avatar URL
    pub avatar_url: Option<String>,

    /// Optional personal website
    pub website: Option<String>,

    /// Optional free-form location
    pub location: Option<String>,

    /// How many times this profile was viewed by others
    pub profile_views: i32,

    /// Denormalized count of projects created
    pub projects_created: i32,

    /// Denormalized count of guestbook messages posted
    pub messages_posted: i32,

    /// Denormalized count of likes received on own projects
    pub likes_received: i32,

    /// Achievements as a jsonb array of {name, description, icon, earned_at}
    pub achievements: JsonValue,

    /// Number of successful logins
    pub login_count: i32,

    /// When the account last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    /// Argon2id hash, not a plaintext password
    pub password_hash: String,
    pub full_name: Option<String>,
}

/// Input for updating profile fields
///
/// Only `Some` fields are written; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateProfile {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
}

/// Filters for the admin user listing
#[derive(Debug, Clone, Default)]
pub struct UserListFilter {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    /// Substring match against username, email, and full name
    pub search: Option<String>,
}

/// Public profile view of an account
///
/// Private fields (email, last login) are only present when the viewer is
/// the owner or an admin.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub profile_views: i32,
    pub projects_created: i32,
    pub messages_posted: i32,
    pub likes_received: i32,
    pub achievements: JsonValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// One row of the public leaderboard
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct LeaderboardEntry {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub projects_created: i32,
    pub messages_posted: i32,
    pub likes_received: i32,
    /// Weighted engagement score used for ranking
    pub score: i32,
}

/// Aggregate overview for the admin stats endpoint
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct UserStatsOverview {
    pub total_users: i64,
    pub active_users: i64,
    pub new_users: i64,
    pub avg_login_count: f64,
    pub total_profile_views: i64,
    pub total_projects_created: i64,
    pub total_messages_posted: i64,
}

/// Count of accounts per role
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

/// Daily active-user count (by last login)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyActive {
    pub day: String,
    pub active_users: i64,
}

impl User {
    /// Creates a new account
    ///
    /// Username and email are stored lowercase. New accounts start as
    /// role=user, status=active.
    ///
    /// # Errors
    ///
    /// Returns an error on duplicate username/email (unique constraint) or
    /// connection failure.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, password_hash, full_name)
             VALUES (LOWER($1), LOWER($2), $3, $4)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(data.username)
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds an account by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Finds an account by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(pool)
        .await
    }

    /// Lists accounts for the admin user listing
    ///
    /// Returns the page of users plus the total matching count.
    pub async fn list(
        pool: &PgPool,
        filter: &UserListFilter,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE ($1::user_role IS NULL OR role = $1)
               AND ($2::account_status IS NULL OR status = $2)
               AND ($3::text IS NULL
                    OR username ILIKE '%' || $3 || '%'
                    OR email ILIKE '%' || $3 || '%'
                    OR full_name ILIKE '%' || $3 || '%')
             ORDER BY created_at DESC
             LIMIT $4 OFFSET $5"
        ))
        .bind(filter.role)
        .bind(filter.status)
        .bind(filter.search.as_deref())
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users
             WHERE ($1::user_role IS NULL OR role = $1)
               AND ($2::account_status IS NULL OR status = $2)
               AND ($3::text IS NULL
                    OR username ILIKE '%' || $3 || '%'
                    OR email ILIKE '%' || $3 || '%'
                    OR full_name ILIKE '%' || $3 || '%')",
        )
        .bind(filter.role)
        .bind(filter.status)
        .bind(filter.search.as_deref())
        .fetch_one(pool)
        .await?;

        Ok((users, total))
    }

    /// Updates profile fields (only `Some` values are written)
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        data: UpdateProfile,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET
                 full_name = COALESCE($2, full_name),
                 bio = COALESCE($3, bio),
                 avatar_url = COALESCE($4, avatar_url),
                 website = COALESCE($5, website),
                 location = COALESCE($6, location),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(data.full_name)
        .bind(data.bio)
        .bind(data.avatar_url)
        .bind(data.website)
        .bind(data.location)
        .fetch_optional(pool)
        .await
    }

    /// Replaces the stored password hash
    pub async fn update_password_hash(
        pool: &PgPool,
        id: Uuid,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Records a successful login
    pub async fn record_login(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET last_login_at = NOW(), login_count = login_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Changes an account's role
    pub async fn set_role(pool: &PgPool, id: Uuid, role: Role) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET role = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .fetch_optional(pool)
        .await
    }

    /// Changes an account's status
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: AccountStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    /// Deletes an account and, via foreign key cascades, all of its projects,
    /// guestbook entries, likes, comments, and analytics events
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Appends an achievement unless one with the same name already exists
    ///
    /// Returns true if the achievement was awarded.
    pub async fn award_achievement(
        pool: &PgPool,
        id: Uuid,
        name: &str,
        description: &str,
        icon: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET achievements = achievements || jsonb_build_array(jsonb_build_object(
                     'name', $2::text,
                     'description', $3::text,
                     'icon', $4::text,
                     'earned_at', NOW())),
                 updated_at = NOW()
             WHERE id = $1
               AND NOT achievements @> jsonb_build_array(jsonb_build_object('name', $2::text))",
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(icon)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Increments the profile view counter
    pub async fn increment_profile_views(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET profile_views = profile_views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Adjusts the projects-created counter, clamped at zero
    pub async fn adjust_projects_created(
        pool: &PgPool,
        id: Uuid,
        delta: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users
             SET projects_created = GREATEST(0, projects_created + $2)
             WHERE id = $1
             RETURNING projects_created",
        )
        .bind(id)
        .bind(delta)
        .fetch_one(pool)
        .await
    }

    /// Increments the messages-posted counter, returning the new value
    pub async fn increment_messages_posted(pool: &PgPool, id: Uuid) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE users SET messages_posted = messages_posted + 1 WHERE id = $1
             RETURNING messages_posted",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Adjusts the likes-received counter, clamped at zero
    pub async fn adjust_likes_received(
        pool: &PgPool,
        id: Uuid,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET likes_received = GREATEST(0, likes_received + $2) WHERE id = $1",
        )
        .bind(id)
        .bind(delta)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Public leaderboard ranked by a weighted engagement score
    pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
        sqlx::query_as::<_, LeaderboardEntry>(
            "SELECT id, username, avatar_url, projects_created, messages_posted, likes_received,
                    projects_created * 3 + likes_received * 2 + messages_posted AS score
             FROM users
             WHERE status = 'active'
             ORDER BY score DESC, created_at ASC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Aggregate account statistics since `since`
    pub async fn stats_overview(
        pool: &PgPool,
        since: DateTime<Utc>,
    ) -> Result<UserStatsOverview, sqlx::Error> {
        sqlx::query_as::<_, UserStatsOverview>(
            "SELECT COUNT(*) AS total_users,
                    COUNT(*) FILTER (WHERE status = 'active') AS active_users,
                    COUNT(*) FILTER (WHERE created_at >= $1) AS new_users,
                    COALESCE(AVG(login_count), 0)::FLOAT8 AS avg_login_count,
                    COALESCE(SUM(profile_views), 0)::BIGINT AS total_profile_views,
                    COALESCE(SUM(projects_created), 0)::BIGINT AS total_projects_created,
                    COALESCE(SUM(messages_posted), 0)::BIGINT AS total_messages_posted
             FROM users",
        )
        .bind(since)
        .fetch_one(pool)
        .await
    }

    /// Number of accounts per role
    pub async fn role_distribution(pool: &PgPool) -> Result<Vec<RoleCount>, sqlx::Error> {
        sqlx::query_as::<_, RoleCount>(
            "SELECT role::TEXT AS role, COUNT(*) AS count FROM users GROUP BY role ORDER BY count DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Daily active accounts (by last login) since `since`
    pub async fn daily_active(
        pool: &PgPool,
        since: DateTime<Utc>,
    ) -> Result<Vec<DailyActive>, sqlx::Error> {
        sqlx::query_as::<_, DailyActive>(
            "SELECT TO_CHAR(last_login_at, 'YYYY-MM-DD') AS day, COUNT(*) AS active_users
             FROM users
             WHERE last_login_at >= $1
             GROUP BY 1
             ORDER BY 1",
        )
        .bind(since)
        .fetch_all(pool)
        .await
    }

    /// Builds the public (or private, for owner/admin) profile view
    pub fn to_profile(&self, include_private: bool) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: include_private.then(|| self.email.clone()),
            role: self.role,
            full_name: self.full_name.clone(),
            bio: self.bio.clone(),
            avatar_url: self.avatar_url.clone(),
            website: self.website.clone(),
            location: self.location.clone(),
            profile_views: self.profile_views,
            projects_created: self.projects_created,
            messages_posted: self.messages_posted,
            likes_received: self.likes_received,
            achievements: self.achievements.clone(),
            last_login_at: if include_private { self.last_login_at } else { None },
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.has_permission(Role::Moderator));
        assert!(Role::Admin.has_permission(Role::User));
        assert!(Role::Moderator.has_permission(Role::User));
        assert!(!Role::Moderator.has_permission(Role::Admin));
        assert!(!Role::User.has_permission(Role::Moderator));
        assert!(Role::User.has_permission(Role::User));
    }

    #[test]
    fn test_role_parse_roundtrip() {
        for role in [Role::User, Role::Moderator, Role::Admin] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("superuser"), None);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AccountStatus::parse("active"), Some(AccountStatus::Active));
        assert_eq!(AccountStatus::parse("suspended"), Some(AccountStatus::Suspended));
        assert_eq!(AccountStatus::parse("banned"), None);
    }

    #[test]
    fn test_profile_hides_private_fields() {
        let user = User {
            id: Uuid::new_v4(),
            username: "astra".to_string(),
            email: "astra@example.com".to_string(),
            password_hash: "$argon2id$test".to_string(),
            role: Role::User,
            status: AccountStatus::Active,
            full_name: None,
            bio: None,
            avatar_url: None,
            website: None,
            location: None,
            profile_views: 0,
            projects_created: 0,
            messages_posted: 0,
            likes_received: 0,
            achievements: serde_json::json!([]),
            login_count: 3,
            last_login_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let public = user.to_profile(false);
        assert!(public.email.is_none());
        assert!(public.last_login_at.is_none());

        let private = user.to_profile(true);
        assert_eq!(private.email.as_deref(), Some("astra@example.com"));
        assert!(private.last_login_at.is_some());

        // The hash must never appear in a serialized profile
        let json = serde_json::to_string(&private).unwrap();
        assert!(!json.contains("argon2id"));
    }
}
