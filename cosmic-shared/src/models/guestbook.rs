/// Guestbook entry model, moderation state, and database operations
///
/// Anonymous visitors and signed-in users both post entries. Every new entry
/// runs through the spam heuristics in [`crate::spam`]; entries above the
/// threshold land flagged, the rest are approved immediately. Likes, replies,
/// and flags live in child tables keyed on the entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::spam;

/// Moderation status of a guestbook entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entry_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    New,
    Approved,
    Rejected,
    Flagged,
    Hidden,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::New => "new",
            EntryStatus::Approved => "approved",
            EntryStatus::Rejected => "rejected",
            EntryStatus::Flagged => "flagged",
            EntryStatus::Hidden => "hidden",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(EntryStatus::New),
            "approved" => Some(EntryStatus::Approved),
            "rejected" => Some(EntryStatus::Rejected),
            "flagged" => Some(EntryStatus::Flagged),
            "hidden" => Some(EntryStatus::Hidden),
            _ => None,
        }
    }
}

/// Reason codes a visitor can attach when flagging an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagReason {
    Spam,
    Inappropriate,
    Offensive,
    Misleading,
    Other,
}

impl FlagReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReason::Spam => "spam",
            FlagReason::Inappropriate => "inappropriate",
            FlagReason::Offensive => "offensive",
            FlagReason::Misleading => "misleading",
            FlagReason::Other => "other",
        }
    }
}

const ENTRY_COLUMNS: &str = "g.id, g.user_id, g.name, g.email, g.message, g.category, g.status, \
     g.featured, g.is_spam, g.spam_score, g.views, g.likes, g.ip_address, g.user_agent, \
     g.country, g.timezone, g.moderated_by, g.moderated_at, g.moderation_reason, \
     g.created_at, g.updated_at";

/// A guestbook entry joined with its author account, when there is one
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GuestbookEntry {
    pub id: Uuid,

    /// Set when the entry was posted by a signed-in account
    pub user_id: Option<Uuid>,

    /// Display name supplied at submission time
    pub name: String,

    /// Never exposed publicly; kept for moderation views only
    #[serde(skip_serializing)]
    pub email: Option<String>,

    pub message: String,
    pub category: String,
    pub status: EntryStatus,
    pub featured: bool,
    pub is_spam: bool,
    pub spam_score: i32,
    pub views: i32,
    pub likes: i32,

    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,

    pub country: Option<String>,
    pub timezone: Option<String>,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub moderation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Author username when the poster was signed in
    pub author_username: Option<String>,
    pub author_avatar_url: Option<String>,
}

/// Input for posting a guestbook entry
#[derive(Debug, Clone)]
pub struct CreateEntry {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: Option<String>,
    pub message: String,
    pub category: Option<String>,
    pub country: Option<String>,
    pub timezone: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Result of a like toggle on an entry
#[derive(Debug, Clone, Serialize)]
pub struct EntryLikeOutcome {
    pub liked: bool,
    pub likes_count: i64,
}

/// A reply joined with its author
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReplyView {
    pub id: Uuid,
    pub entry_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Count of approved entries per category
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct EntryCategoryCount {
    pub category: String,
    pub count: i64,
}

/// Moderation decision applied to an entry
#[derive(Debug, Clone)]
pub struct Moderation {
    pub status: EntryStatus,
    pub reason: Option<String>,
    pub featured: Option<bool>,
    pub moderator_id: Uuid,
}

impl GuestbookEntry {
    /// Stores a new entry after scoring it for spam
    ///
    /// Clean submissions are approved immediately; submissions at or above
    /// the spam threshold are stored flagged and stay out of public listings.
    pub async fn create(pool: &PgPool, data: CreateEntry) -> Result<Self, sqlx::Error> {
        let score = spam::spam_score(&data.message, &data.name);
        let flagged = spam::is_spam(score);
        let status = if flagged {
            EntryStatus::Flagged
        } else {
            EntryStatus::Approved
        };

        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO guestbook_entries
                 (user_id, name, email, message, category, status, is_spam, spam_score,
                  country, timezone, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'general'), $6, $7, $8, $9, $10, $11, $12)
             RETURNING id",
        )
        .bind(data.user_id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.message)
        .bind(data.category)
        .bind(status)
        .bind(flagged)
        .bind(score as i32)
        .bind(data.country)
        .bind(data.timezone)
        .bind(data.ip_address)
        .bind(data.user_agent)
        .fetch_one(pool)
        .await?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// Finds an entry by ID, with author attribution when present
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GuestbookEntry>(&format!(
            "SELECT {ENTRY_COLUMNS},
                    u.username AS author_username, u.avatar_url AS author_avatar_url
             FROM guestbook_entries g LEFT JOIN users u ON u.id = g.user_id
             WHERE g.id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Public listing: approved, non-spam entries, featured first
    pub async fn list_public(
        pool: &PgPool,
        category: Option<&str>,
        featured: Option<bool>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let entries = sqlx::query_as::<_, GuestbookEntry>(&format!(
            "SELECT {ENTRY_COLUMNS},
                    u.username AS author_username, u.avatar_url AS author_avatar_url
             FROM guestbook_entries g LEFT JOIN users u ON u.id = g.user_id
             WHERE g.status = 'approved' AND NOT g.is_spam
               AND ($1::text IS NULL OR g.category = $1)
               AND ($2::bool IS NULL OR g.featured = $2)
             ORDER BY g.featured DESC, g.created_at DESC
             LIMIT $3 OFFSET $4"
        ))
        .bind(category)
        .bind(featured)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM guestbook_entries
             WHERE status = 'approved' AND NOT is_spam
               AND ($1::text IS NULL OR category = $1)
               AND ($2::bool IS NULL OR featured = $2)",
        )
        .bind(category)
        .bind(featured)
        .fetch_one(pool)
        .await?;

        Ok((entries, total))
    }

    /// Moderation listing: entries in a given status, or everything
    pub async fn list_for_moderation(
        pool: &PgPool,
        status: Option<EntryStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let entries = sqlx::query_as::<_, GuestbookEntry>(&format!(
            "SELECT {ENTRY_COLUMNS},
                    u.username AS author_username, u.avatar_url AS author_avatar_url
             FROM guestbook_entries g LEFT JOIN users u ON u.id = g.user_id
             WHERE ($1::entry_status IS NULL OR g.status = $1)
             ORDER BY g.created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM guestbook_entries
             WHERE ($1::entry_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((entries, total))
    }

    /// Featured approved entries
    pub async fn featured(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GuestbookEntry>(&format!(
            "SELECT {ENTRY_COLUMNS},
                    u.username AS author_username, u.avatar_url AS author_avatar_url
             FROM guestbook_entries g LEFT JOIN users u ON u.id = g.user_id
             WHERE g.status = 'approved' AND NOT g.is_spam AND g.featured = TRUE
             ORDER BY g.created_at DESC
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Approved entry categories with counts
    pub async fn categories(pool: &PgPool) -> Result<Vec<EntryCategoryCount>, sqlx::Error> {
        sqlx::query_as::<_, EntryCategoryCount>(
            "SELECT category, COUNT(*) AS count
             FROM guestbook_entries
             WHERE status = 'approved' AND NOT is_spam
             GROUP BY category
             ORDER BY count DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Entries posted by one account, newest first
    pub async fn by_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GuestbookEntry>(&format!(
            "SELECT {ENTRY_COLUMNS},
                    u.username AS author_username, u.avatar_url AS author_avatar_url
             FROM guestbook_entries g LEFT JOIN users u ON u.id = g.user_id
             WHERE g.user_id = $1
             ORDER BY g.created_at DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// How many entries an IP address posted within the last hour
    ///
    /// Backs the per-IP submission limit.
    pub async fn recent_count_by_ip(pool: &PgPool, ip: &str) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM guestbook_entries
             WHERE ip_address = $1 AND created_at >= NOW() - INTERVAL '1 hour'",
        )
        .bind(ip)
        .fetch_one(pool)
        .await
    }

    /// Count of publicly visible entries
    pub async fn count_approved(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM guestbook_entries WHERE status = 'approved' AND NOT is_spam",
        )
        .fetch_one(pool)
        .await
    }

    /// Increments the view counter
    pub async fn increment_views(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE guestbook_entries SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Toggles a like on an entry, refreshing the denormalized count
    pub async fn toggle_like(
        pool: &PgPool,
        entry_id: Uuid,
        user_id: Uuid,
    ) -> Result<EntryLikeOutcome, sqlx::Error> {
        let removed = sqlx::query(
            "DELETE FROM guestbook_likes WHERE entry_id = $1 AND user_id = $2",
        )
        .bind(entry_id)
        .bind(user_id)
        .execute(pool)
        .await?
        .rows_affected();

        let liked = if removed == 0 {
            sqlx::query(
                "INSERT INTO guestbook_likes (entry_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(entry_id)
            .bind(user_id)
            .execute(pool)
            .await?;
            true
        } else {
            false
        };

        let likes_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM guestbook_likes WHERE entry_id = $1")
                .bind(entry_id)
                .fetch_one(pool)
                .await?;

        sqlx::query("UPDATE guestbook_entries SET likes = $2 WHERE id = $1")
            .bind(entry_id)
            .bind(likes_count as i32)
            .execute(pool)
            .await?;

        Ok(EntryLikeOutcome { liked, likes_count })
    }

    /// Adds a reply and returns it joined with its author
    pub async fn add_reply(
        pool: &PgPool,
        entry_id: Uuid,
        user_id: Uuid,
        message: &str,
    ) -> Result<ReplyView, sqlx::Error> {
        let reply_id: Uuid = sqlx::query_scalar(
            "INSERT INTO guestbook_replies (entry_id, user_id, message)
             VALUES ($1, $2, $3)
             RETURNING id",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(message)
        .fetch_one(pool)
        .await?;

        sqlx::query_as::<_, ReplyView>(
            "SELECT r.id, r.entry_id, r.user_id, u.username, u.avatar_url, r.message, r.created_at
             FROM guestbook_replies r JOIN users u ON u.id = r.user_id
             WHERE r.id = $1",
        )
        .bind(reply_id)
        .fetch_one(pool)
        .await
    }

    /// Replies to an entry, oldest first
    pub async fn replies(pool: &PgPool, entry_id: Uuid) -> Result<Vec<ReplyView>, sqlx::Error> {
        sqlx::query_as::<_, ReplyView>(
            "SELECT r.id, r.entry_id, r.user_id, u.username, u.avatar_url, r.message, r.created_at
             FROM guestbook_replies r JOIN users u ON u.id = r.user_id
             WHERE r.entry_id = $1
             ORDER BY r.created_at ASC",
        )
        .bind(entry_id)
        .fetch_all(pool)
        .await
    }

    /// Records a flag from a user
    ///
    /// Returns false if the user already flagged this entry. When an entry
    /// accumulates three or more flags it drops back to `flagged` status for
    /// moderator review.
    pub async fn flag(
        pool: &PgPool,
        entry_id: Uuid,
        user_id: Uuid,
        reason: FlagReason,
        description: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query(
            "INSERT INTO guestbook_flags (entry_id, user_id, reason, description)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (entry_id, user_id) DO NOTHING",
        )
        .bind(entry_id)
        .bind(user_id)
        .bind(reason.as_str())
        .bind(description)
        .execute(pool)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Ok(false);
        }

        let flag_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM guestbook_flags WHERE entry_id = $1")
                .bind(entry_id)
                .fetch_one(pool)
                .await?;

        if flag_count >= 3 {
            sqlx::query(
                "UPDATE guestbook_entries SET status = 'flagged', updated_at = NOW()
                 WHERE id = $1 AND status = 'approved'",
            )
            .bind(entry_id)
            .execute(pool)
            .await?;
        }

        Ok(true)
    }

    /// Applies a moderation decision
    pub async fn moderate(
        pool: &PgPool,
        entry_id: Uuid,
        decision: Moderation,
    ) -> Result<Option<Self>, sqlx::Error> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            "UPDATE guestbook_entries SET
                 status = $2,
                 is_spam = CASE WHEN $2 = 'approved'::entry_status THEN FALSE ELSE is_spam END,
                 featured = COALESCE($3, featured),
                 moderation_reason = $4,
                 moderated_by = $5,
                 moderated_at = NOW(),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING id",
        )
        .bind(entry_id)
        .bind(decision.status)
        .bind(decision.featured)
        .bind(decision.reason)
        .bind(decision.moderator_id)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(id) => Self::find_by_id(pool, id).await,
            None => Ok(None),
        }
    }

    /// Deletes an entry
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM guestbook_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Short excerpt of the message for log lines and live events
    pub fn excerpt(&self) -> String {
        const MAX: usize = 80;
        if self.message.chars().count() <= MAX {
            self.message.clone()
        } else {
            let cut: String = self.message.chars().take(MAX).collect();
            format!("{cut}…")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            EntryStatus::New,
            EntryStatus::Approved,
            EntryStatus::Rejected,
            EntryStatus::Flagged,
            EntryStatus::Hidden,
        ] {
            assert_eq!(EntryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EntryStatus::parse("bogus"), None);
    }

    #[test]
    fn test_flag_reason_strings() {
        assert_eq!(FlagReason::Spam.as_str(), "spam");
        assert_eq!(FlagReason::Other.as_str(), "other");
    }

    #[test]
    fn test_excerpt_truncation() {
        let mut entry = sample_entry("short message");
        assert_eq!(entry.excerpt(), "short message");

        entry.message = "x".repeat(200);
        let excerpt = entry.excerpt();
        assert_eq!(excerpt.chars().count(), 81);
        assert!(excerpt.ends_with('…'));
    }

    fn sample_entry(message: &str) -> GuestbookEntry {
        GuestbookEntry {
            id: Uuid::new_v4(),
            user_id: None,
            name: "visitor".to_string(),
            email: None,
            message: message.to_string(),
            category: "general".to_string(),
            status: EntryStatus::Approved,
            featured: false,
            is_spam: false,
            spam_score: 0,
            views: 0,
            likes: 0,
            ip_address: None,
            user_agent: None,
            country: None,
            timezone: None,
            moderated_by: None,
            moderated_at: None,
            moderation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author_username: None,
            author_avatar_url: None,
        }
    }

    #[test]
    fn test_entry_serialization_hides_contact_details() {
        let mut entry = sample_entry("hello");
        entry.email = Some("private@example.com".to_string());
        entry.ip_address = Some("203.0.113.7".to_string());

        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("private@example.com"));
        assert!(!json.contains("203.0.113.7"));
    }
}
