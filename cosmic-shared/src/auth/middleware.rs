/// Authentication context for request handlers
///
/// The API server's auth layer validates the `Authorization: Bearer` header,
/// loads the account, and inserts an [`AuthContext`] into the request
/// extensions. Handlers extract it with Axum's `Extension` extractor, using
/// `Option<Extension<AuthContext>>` on routes where authentication is
/// optional.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use cosmic_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {} ({})", auth.username, auth.user_id)
/// }
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{Role, User};

/// Error type for authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No credentials were provided on a route that requires them
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header was present but malformed
    #[error("Invalid authorization header: {0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The account behind the token no longer exists
    #[error("Account not found")]
    AccountNotFound,

    /// The account is suspended or deactivated
    #[error("Account is {0}")]
    AccountDisabled(&'static str),
}

/// Authentication context added to request extensions
///
/// Role and username are loaded fresh from the database on each request, so
/// moderation actions always see the caller's current privileges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated account ID
    pub user_id: Uuid,

    /// Account username, for attribution in responses and live events
    pub username: String,

    /// Current role
    pub role: Role,
}

impl AuthContext {
    /// Builds an auth context from a freshly loaded user row
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
        }
    }

    /// Whether this account can moderate guestbook content
    pub fn can_moderate(&self) -> bool {
        self.role.has_permission(Role::Moderator)
    }

    /// Whether this account has full administrative access
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            username: "tester".to_string(),
            role,
        }
    }

    #[test]
    fn test_moderation_permissions() {
        assert!(!context(Role::User).can_moderate());
        assert!(context(Role::Moderator).can_moderate());
        assert!(context(Role::Admin).can_moderate());
    }

    #[test]
    fn test_admin_permissions() {
        assert!(!context(Role::User).is_admin());
        assert!(!context(Role::Moderator).is_admin());
        assert!(context(Role::Admin).is_admin());
    }
}
