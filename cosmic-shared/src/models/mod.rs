/// Database models and their CRUD operations
///
/// # Models
///
/// - `user`: accounts, roles, profile stats, and achievements
/// - `project`: portfolio projects with likes and comments
/// - `guestbook`: public guestbook entries with moderation state
/// - `contact`: contact form submissions
/// - `analytics`: event ingest and dashboard aggregates
///
/// # Example
///
/// ```no_run
/// use cosmic_shared::models::user::{User, CreateUser};
/// use cosmic_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     username: "astra".to_string(),
///     email: "astra@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: None,
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod analytics;
pub mod contact;
pub mod guestbook;
pub mod project;
pub mod user;
