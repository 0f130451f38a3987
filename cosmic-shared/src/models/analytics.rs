/// Analytics event ingest and dashboard aggregates
///
/// Events are append-only. Ingest is best-effort at the API layer, so every
/// write here is a single statement with no surrounding transaction. The
/// aggregate queries back the admin dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AnalyticsEvent {
    pub id: Uuid,
    pub event_type: String,
    pub event_name: String,
    pub user_id: Option<Uuid>,
    pub session_id: String,

    #[serde(skip_serializing)]
    pub ip_address: Option<String>,
    #[serde(skip_serializing)]
    pub user_agent: Option<String>,

    pub page_url: Option<String>,
    pub page_path: Option<String>,
    pub event_data: Value,
    pub is_conversion: bool,
    pub conversion_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for recording an event
#[derive(Debug, Clone, Deserialize)]
pub struct TrackEvent {
    pub event_type: String,
    pub event_name: String,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub page_url: Option<String>,
    pub page_path: Option<String>,
    pub event_data: Option<Value>,
    pub is_conversion: Option<bool>,
    pub conversion_type: Option<String>,
}

/// Event count for one calendar day
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyCount {
    pub day: String,
    pub count: i64,
}

/// Event count for one page path
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PathCount {
    pub page_path: String,
    pub count: i64,
}

/// Event count for one event type
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TypeCount {
    pub event_type: String,
    pub count: i64,
}

impl AnalyticsEvent {
    /// Records one event
    pub async fn track(pool: &PgPool, data: TrackEvent) -> Result<Uuid, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO analytics_events
                 (event_type, event_name, user_id, session_id, ip_address, user_agent,
                  page_url, page_path, event_data, is_conversion, conversion_type)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, COALESCE($9, '{}'::jsonb),
                     COALESCE($10, FALSE), $11)
             RETURNING id",
        )
        .bind(data.event_type)
        .bind(data.event_name)
        .bind(data.user_id)
        .bind(data.session_id)
        .bind(data.ip_address)
        .bind(data.user_agent)
        .bind(data.page_url)
        .bind(data.page_path)
        .bind(data.event_data)
        .bind(data.is_conversion)
        .bind(data.conversion_type)
        .fetch_one(pool)
        .await
    }

    /// Most recent events, for the admin feed
    pub async fn recent(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnalyticsEvent>(
            "SELECT id, event_type, event_name, user_id, session_id, ip_address, user_agent,
                    page_url, page_path, event_data, is_conversion, conversion_type, created_at
             FROM analytics_events
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Events attributed to one account within a window
    pub async fn user_activity(
        pool: &PgPool,
        user_id: Uuid,
        days: i32,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AnalyticsEvent>(
            "SELECT id, event_type, event_name, user_id, session_id, ip_address, user_agent,
                    page_url, page_path, event_data, is_conversion, conversion_type, created_at
             FROM analytics_events
             WHERE user_id = $1 AND created_at >= NOW() - ($2::int * INTERVAL '1 day')
             ORDER BY created_at DESC
             LIMIT $3",
        )
        .bind(user_id)
        .bind(days)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Total page_view events
    pub async fn total_page_views(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM analytics_events WHERE event_type = 'page_view'",
        )
        .fetch_one(pool)
        .await
    }

    /// Distinct sessions seen within a window
    pub async fn unique_sessions_since(pool: &PgPool, days: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(DISTINCT session_id) FROM analytics_events
             WHERE created_at >= NOW() - ($1::int * INTERVAL '1 day')",
        )
        .bind(days)
        .fetch_one(pool)
        .await
    }

    /// Events per day within a window, oldest day first
    pub async fn daily_counts(pool: &PgPool, days: i32) -> Result<Vec<DailyCount>, sqlx::Error> {
        sqlx::query_as::<_, DailyCount>(
            "SELECT TO_CHAR(created_at, 'YYYY-MM-DD') AS day, COUNT(*) AS count
             FROM analytics_events
             WHERE created_at >= NOW() - ($1::int * INTERVAL '1 day')
             GROUP BY day
             ORDER BY day ASC",
        )
        .bind(days)
        .fetch_all(pool)
        .await
    }

    /// Most viewed page paths within a window
    pub async fn path_counts(
        pool: &PgPool,
        days: i32,
        limit: i64,
    ) -> Result<Vec<PathCount>, sqlx::Error> {
        sqlx::query_as::<_, PathCount>(
            "SELECT page_path, COUNT(*) AS count
             FROM analytics_events
             WHERE event_type = 'page_view' AND page_path IS NOT NULL
               AND created_at >= NOW() - ($1::int * INTERVAL '1 day')
             GROUP BY page_path
             ORDER BY count DESC
             LIMIT $2",
        )
        .bind(days)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Event volume by type within a window
    pub async fn type_counts(pool: &PgPool, days: i32) -> Result<Vec<TypeCount>, sqlx::Error> {
        sqlx::query_as::<_, TypeCount>(
            "SELECT event_type, COUNT(*) AS count
             FROM analytics_events
             WHERE created_at >= NOW() - ($1::int * INTERVAL '1 day')
             GROUP BY event_type
             ORDER BY count DESC",
        )
        .bind(days)
        .fetch_all(pool)
        .await
    }

    /// Average session length in seconds, over sessions with 2+ events
    pub async fn avg_session_seconds(pool: &PgPool, days: i32) -> Result<f64, sqlx::Error> {
        let avg: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(EXTRACT(EPOCH FROM span))::FLOAT8
             FROM (SELECT MAX(created_at) - MIN(created_at) AS span
                   FROM analytics_events
                   WHERE created_at >= NOW() - ($1::int * INTERVAL '1 day')
                   GROUP BY session_id
                   HAVING COUNT(*) > 1) sessions",
        )
        .bind(days)
        .fetch_one(pool)
        .await?;

        Ok(avg.unwrap_or(0.0))
    }

    /// Conversion events within a window
    pub async fn conversions_since(pool: &PgPool, days: i32) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM analytics_events
             WHERE is_conversion AND created_at >= NOW() - ($1::int * INTERVAL '1 day')",
        )
        .bind(days)
        .fetch_one(pool)
        .await
    }
}
