/// Contact form submissions
///
/// Stored for admin review; the public API only ever inserts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Workflow state of a contact submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contact_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    New,
    Read,
    Responded,
    Archived,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Read => "read",
            ContactStatus::Responded => "responded",
            ContactStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(ContactStatus::New),
            "read" => Some(ContactStatus::Read),
            "responded" => Some(ContactStatus::Responded),
            "archived" => Some(ContactStatus::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub status: ContactStatus,

    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a contact form submission
#[derive(Debug, Clone)]
pub struct CreateContact {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Contact {
    /// Stores a submission
    pub async fn create(pool: &PgPool, data: CreateContact) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "INSERT INTO contacts (name, email, subject, message, ip_address, user_agent)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING id, name, email, subject, message, status, ip_address, user_agent,
                       created_at, updated_at",
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.subject)
        .bind(data.message)
        .bind(data.ip_address)
        .bind(data.user_agent)
        .fetch_one(pool)
        .await
    }

    /// Admin listing, optionally filtered by status
    pub async fn list(
        pool: &PgPool,
        status: Option<ContactStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Self>, i64), sqlx::Error> {
        let contacts = sqlx::query_as::<_, Contact>(
            "SELECT id, name, email, subject, message, status, ip_address, user_agent,
                    created_at, updated_at
             FROM contacts
             WHERE ($1::contact_status IS NULL OR status = $1)
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contacts WHERE ($1::contact_status IS NULL OR status = $1)",
        )
        .bind(status)
        .fetch_one(pool)
        .await?;

        Ok((contacts, total))
    }

    /// Moves a submission to a new workflow state
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        status: ContactStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>(
            "UPDATE contacts SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING id, name, email, subject, message, status, ip_address, user_agent,
                       created_at, updated_at",
        )
        .bind(id)
        .bind(status)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ContactStatus::New,
            ContactStatus::Read,
            ContactStatus::Responded,
            ContactStatus::Archived,
        ] {
            assert_eq!(ContactStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ContactStatus::parse("unknown"), None);
    }

    #[test]
    fn test_serialization_hides_submitter_metadata() {
        let contact = Contact {
            id: Uuid::new_v4(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            message: "Question about a project".to_string(),
            status: ContactStatus::New,
            ip_address: Some("198.51.100.4".to_string()),
            user_agent: Some("curl/8".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_string(&contact).unwrap();
        assert!(!json.contains("198.51.100.4"));
        assert!(!json.contains("curl/8"));
    }
}
