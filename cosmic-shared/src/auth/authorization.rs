/// Authorization helpers for role-based access control
///
/// The permission model is a flat role hierarchy on the account itself:
///
/// 1. **Admin**: full control, including user management and analytics
/// 2. **Moderator**: can moderate guestbook content
/// 3. **User**: can manage their own projects, likes, comments, and replies
///
/// Resource-level ownership (e.g. "owner or admin may edit a project") is
/// checked by handlers with [`require_owner_or_admin`].
///
/// # Example
///
/// ```
/// use cosmic_shared::auth::authorization::{require_auth, require_role};
/// use cosmic_shared::auth::middleware::AuthContext;
/// use cosmic_shared::models::user::Role;
///
/// fn check(auth: Option<AuthContext>) -> Result<(), Box<dyn std::error::Error>> {
///     let auth = require_auth(auth)?;
///     require_role(&auth, Role::Moderator)?;
///     Ok(())
/// }
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::user::Role;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// The route requires authentication and none was provided
    #[error("Authentication required")]
    NotAuthenticated,

    /// The caller's role is insufficient
    #[error("Insufficient permissions: requires {required:?}, has {actual:?}")]
    InsufficientRole { required: Role, actual: Role },

    /// The caller neither owns the resource nor is an admin
    #[error("Not authorized to access this resource")]
    NotOwner,
}

/// Unwraps an optional auth context, failing if the caller is anonymous
pub fn require_auth(auth: Option<AuthContext>) -> Result<AuthContext, AuthzError> {
    auth.ok_or(AuthzError::NotAuthenticated)
}

/// Checks the caller holds at least the required role
pub fn require_role(auth: &AuthContext, required: Role) -> Result<(), AuthzError> {
    if !auth.role.has_permission(required) {
        return Err(AuthzError::InsufficientRole {
            required,
            actual: auth.role,
        });
    }

    Ok(())
}

/// Checks the caller owns the resource or is an admin
pub fn require_owner_or_admin(auth: &AuthContext, owner_id: Uuid) -> Result<(), AuthzError> {
    if auth.user_id == owner_id || auth.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
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
    fn test_require_auth() {
        assert!(require_auth(None).is_err());
        assert!(require_auth(Some(context(Role::User))).is_ok());
    }

    #[test]
    fn test_require_role_hierarchy() {
        let user = context(Role::User);
        let moderator = context(Role::Moderator);
        let admin = context(Role::Admin);

        assert!(require_role(&user, Role::User).is_ok());
        assert!(require_role(&user, Role::Moderator).is_err());
        assert!(require_role(&moderator, Role::Moderator).is_ok());
        assert!(require_role(&moderator, Role::Admin).is_err());
        assert!(require_role(&admin, Role::Admin).is_ok());
    }

    #[test]
    fn test_require_owner_or_admin() {
        let owner = context(Role::User);
        let other = context(Role::User);
        let admin = context(Role::Admin);

        assert!(require_owner_or_admin(&owner, owner.user_id).is_ok());
        assert!(require_owner_or_admin(&other, owner.user_id).is_err());
        assert!(require_owner_or_admin(&admin, owner.user_id).is_ok());
    }
}
