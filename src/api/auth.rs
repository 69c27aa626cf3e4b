//! Authentication API endpoints
//!
//! Handles HTTP requests for user authentication:
//! - POST /api/v1/auth/token - Exchange username/password (form) for a bearer token
//! - POST /api/v1/auth/register - User registration
//! - GET /api/v1/auth/me - Get current user
//! - GET /api/v1/auth/admin - Admin check

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateUserInput, User};
use crate::services::UserServiceError;

/// Form body for the token endpoint
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub username: String,
    pub password: String,
}

/// Response for a successful login
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::AuthenticationError(msg) => ApiError::unauthorized(msg),
            UserServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            UserServiceError::UserExists(msg) => ApiError::conflict(msg),
            UserServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// Build public auth routes (no auth required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/token", post(login))
        .route("/auth/register", post(register))
}

/// Build protected auth routes (requires auth middleware)
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_current_user))
}

/// Build admin auth routes (requires auth and admin middleware)
pub fn admin_router() -> Router<AppState> {
    Router::new().route("/auth/admin", get(admin_check))
}

/// POST /api/v1/auth/token
async fn login(
    State(state): State<AppState>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .user_service
        .authenticate(&form.username, &form.password)
        .await?;

    let access_token = state
        .jwt_service
        .create_token(&user)
        .map_err(|e| ApiError::internal_error(e.to_string()))?;

    tracing::info!("User '{}' logged in", user.username);
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// POST /api/v1/auth/register
///
/// The very first account becomes admin.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.user_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/auth/me
async fn get_current_user(user: AuthenticatedUser) -> Json<User> {
    Json(user.0)
}

/// GET /api/v1/auth/admin
async fn admin_check(user: AuthenticatedUser) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: format!("Hello admin {}!", user.0.username),
    })
}
