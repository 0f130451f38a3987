/// Authentication endpoints
///
/// Registration, login, token refresh, and own-account management.
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Register a new account
/// - `POST /api/auth/login` - Login and get tokens
/// - `POST /api/auth/refresh` - Refresh access token
/// - `GET /api/auth/me` - Current account profile
/// - `PUT /api/auth/me` - Update own profile fields
/// - `PUT /api/auth/password` - Change own password

use axum::{extract::State, Extension, Json};
use cosmic_shared::{
    auth::{
        authorization::require_auth,
        jwt::{self, Claims, TokenType},
        middleware::AuthContext,
        password,
    },
    models::user::{CreateUser, UpdateProfile, User, UserProfile},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::{check_request, ApiResponse},
};

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (also checked for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional display name
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub full_name: Option<String>,
}

/// Token pair returned by register and login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub user: UserProfile,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Profile update request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMeRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub full_name: Option<String>,

    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[validate(url(message = "Avatar must be a valid URL"))]
    pub avatar_url: Option<String>,

    #[validate(url(message = "Website must be a valid URL"))]
    pub website: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

fn mint_tokens(user: &User, secret: &str) -> Result<(String, String), ApiError> {
    let access = jwt::create_token(&Claims::new(user.id, TokenType::Access), secret)?;
    let refresh = jwt::create_token(&Claims::new(user.id, TokenType::Refresh), secret)?;
    Ok((access, refresh))
}

/// Registers a new account
///
/// New accounts start as role=user, status=active. Returns the profile plus
/// a fresh token pair so the client is signed in immediately.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: validation or password strength failure
/// - `409 Conflict`: username or email already taken
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    check_request(&req)?;

    password::validate_password_strength(&req.password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password".to_string(),
            message: e,
        }])
    })?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            full_name: req.full_name,
        },
    )
    .await?;

    User::record_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Account registered");

    let (access_token, refresh_token) = mint_tokens(&user, state.jwt_secret())?;

    Ok(Json(ApiResponse::ok(
        "Account created",
        TokenResponse {
            user: user.to_profile(true),
            access_token,
            refresh_token,
        },
    )))
}

/// Logs in with email and password
///
/// Records the login time and count. The same "Invalid email or password"
/// message covers unknown accounts and wrong passwords.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<TokenResponse>>> {
    check_request(&req)?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    if user.status != cosmic_shared::models::user::AccountStatus::Active {
        return Err(ApiError::Forbidden(format!(
            "Account is {}",
            user.status.as_str()
        )));
    }

    User::record_login(&state.db, user.id).await?;

    tracing::info!(user_id = %user.id, "Login");

    let (access_token, refresh_token) = mint_tokens(&user, state.jwt_secret())?;

    Ok(Json(ApiResponse::ok(
        "Login successful",
        TokenResponse {
            user: user.to_profile(true),
            access_token,
            refresh_token,
        },
    )))
}

/// Exchanges a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<ApiResponse<RefreshResponse>>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(ApiResponse::ok(
        "Token refreshed",
        RefreshResponse { access_token },
    )))
}

/// Returns the current account's full profile
pub async fn me(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    Ok(Json(ApiResponse::ok("Profile", user.to_profile(true))))
}

/// Updates the current account's profile fields
pub async fn update_me(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Json(req): Json<UpdateMeRequest>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;
    check_request(&req)?;

    let user = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateProfile {
            full_name: req.full_name,
            bio: req.bio,
            avatar_url: req.avatar_url,
            website: req.website,
            location: req.location,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    Ok(Json(ApiResponse::ok(
        "Profile updated",
        user.to_profile(true),
    )))
}

/// Changes the current account's password
///
/// Requires the current password, then applies the same strength rules as
/// registration.
pub async fn change_password(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let auth = require_auth(auth.map(|Extension(a)| a))?;

    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    if !password::verify_password(&req.current_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    password::validate_password_strength(&req.new_password).map_err(|e| {
        ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "new_password".to_string(),
            message: e,
        }])
    })?;

    let new_hash = password::hash_password(&req.new_password)?;
    User::update_password_hash(&state.db, auth.user_id, &new_hash).await?;

    tracing::info!(user_id = %auth.user_id, "Password changed");

    Ok(Json(ApiResponse::ok("Password changed", ())))
}
