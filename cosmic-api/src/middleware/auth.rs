/// Bearer token authentication layer
///
/// Applied across the whole `/api` surface. When an `Authorization` header is
/// present it must carry a valid access token: the token is validated, the
/// account loaded fresh from the database, suspended and deactivated accounts
/// rejected, and an [`AuthContext`] inserted into the request extensions.
/// Requests without the header pass through anonymously; routes that require
/// authentication check for the extension themselves.
///
/// A present-but-invalid token is always a 401, even on routes where
/// authentication is optional. Silently downgrading a bad token to an
/// anonymous request would hide expired sessions from clients.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use cosmic_shared::auth::{
    jwt,
    middleware::{AuthContext, AuthError},
};
use cosmic_shared::models::user::{AccountStatus, User};

use crate::app::AppState;
use crate::error::ApiError;

/// Parses and validates the Authorization header when present
pub async fn auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Some(header) = auth_header {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

        let claims = jwt::validate_access_token(token, state.jwt_secret())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        if user.status != AccountStatus::Active {
            return Err(AuthError::AccountDisabled(user.status.as_str()).into());
        }

        req.extensions_mut().insert(AuthContext::from_user(&user));
    }

    Ok(next.run(req).await)
}
