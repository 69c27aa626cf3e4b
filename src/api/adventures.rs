//! Adventure API endpoints
//!
//! - GET /api/v1/adventures - List adventures (newest first)
//! - GET /api/v1/adventures/{id} - Get adventure by ID
//! - GET /api/v1/adventures/slug/{slug} - Get adventure by slug
//! - POST /api/v1/adventures - Create adventure (admin)
//! - PUT /api/v1/adventures/{id} - Update adventure (admin)
//! - DELETE /api/v1/adventures/{id} - Delete adventure (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;

use crate::api::common::ApiQuery;
use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::{Adventure, AdventureStatus, CreateAdventureInput, ListParams, UpdateAdventureInput};
use crate::services::AdventureServiceError;

/// Default page size for the adventure list
const DEFAULT_LIMIT: i64 = 10;

/// Query parameters for the adventure list
#[derive(Debug, Deserialize)]
pub struct ListAdventuresQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

impl From<AdventureServiceError> for ApiError {
    fn from(err: AdventureServiceError) -> Self {
        match err {
            AdventureServiceError::NotFound(msg) => ApiError::not_found(msg),
            AdventureServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            e @ AdventureServiceError::DuplicateSlug(_) => ApiError::conflict(e.to_string()),
            AdventureServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

/// Public adventure routes
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/adventures", get(list_adventures))
        .route("/adventures/{id}", get(get_adventure))
        .route("/adventures/slug/{slug}", get(get_adventure_by_slug))
}

/// Adventure routes that require the admin flag
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/adventures", post(create_adventure))
        .route("/adventures/{id}", put(update_adventure).delete(delete_adventure))
}

/// GET /api/v1/adventures
async fn list_adventures(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListAdventuresQuery>,
) -> Result<Json<Vec<Adventure>>, ApiError> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(AdventureStatus::from_str(raw).ok_or_else(|| {
            ApiError::with_details(
                "VALIDATION_ERROR",
                format!("Invalid status '{}'", raw),
                serde_json::json!({ "allowed": ["draft", "published", "planned"] }),
            )
        })?),
        None => None,
    };
    let params = ListParams::from_query(query.skip, query.limit, DEFAULT_LIMIT);

    let adventures = state.adventure_service.list(params, status).await?;
    Ok(Json(adventures))
}

/// GET /api/v1/adventures/{id}
async fn get_adventure(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Adventure>, ApiError> {
    Ok(Json(state.adventure_service.get(id).await?))
}

/// GET /api/v1/adventures/slug/{slug}
async fn get_adventure_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Adventure>, ApiError> {
    Ok(Json(state.adventure_service.get_by_slug(&slug).await?))
}

/// POST /api/v1/adventures
///
/// The caller becomes the author.
async fn create_adventure(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateAdventureInput>,
) -> Result<(StatusCode, Json<Adventure>), ApiError> {
    let adventure = state
        .adventure_service
        .create(body, Some(user.0.id))
        .await?;
    Ok((StatusCode::CREATED, Json(adventure)))
}

/// PUT /api/v1/adventures/{id}
async fn update_adventure(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAdventureInput>,
) -> Result<Json<Adventure>, ApiError> {
    Ok(Json(state.adventure_service.update(id, body).await?))
}

/// DELETE /api/v1/adventures/{id}
async fn delete_adventure(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.adventure_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
