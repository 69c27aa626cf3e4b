//! Profile API endpoints
//!
//! - GET /api/v1/profiles - List profiles
//! - GET /api/v1/profiles/me - Profile of the caller (bearer)
//! - GET /api/v1/profiles/{id} - Get profile by ID
//! - POST /api/v1/profiles - Create the caller's profile (admin)
//! - PUT /api/v1/profiles/{id} - Update profile (admin)
//! - DELETE /api/v1/profiles/{id} - Delete profile (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{ApiQuery, SkipLimitQuery};
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{CreateProfileInput, Profile, UpdateProfileInput};
use crate::services::ProfileServiceError;

const DEFAULT_LIMIT: i64 = 100;

impl From<ProfileServiceError> for ApiError {
    fn from(err: ProfileServiceError) -> Self {
        match err {
            ProfileServiceError::NotFound(msg) => ApiError::not_found(msg),
            ProfileServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ProfileServiceError::Conflict(msg) => ApiError::conflict(msg),
            ProfileServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/profiles", get(list_profiles))
        .route("/profiles/{id}", get(get_profile))
}

pub fn protected_router() -> Router<AppState> {
    Router::new().route("/profiles/me", get(get_my_profile))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/profiles", post(create_profile))
        .route("/profiles/{id}", put(update_profile).delete(delete_profile))
}

async fn list_profiles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SkipLimitQuery>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    let params = query.into_params(DEFAULT_LIMIT);
    Ok(Json(state.profile_service.list(params).await?))
}

async fn get_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profile_service.get(id).await?))
}

async fn get_my_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profile_service.get_for_user(user.0.id).await?))
}

async fn create_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateProfileInput>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = state.profile_service.create(user.0.id, body).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn update_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProfileInput>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.profile_service.update(id, body).await?))
}

async fn delete_profile(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.profile_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
