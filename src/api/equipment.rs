//! Equipment API endpoints
//!
//! - GET /api/v1/equipment - List equipment ordered by name
//! - GET /api/v1/equipment/{id} - Get equipment by ID
//! - POST /api/v1/equipment - Create equipment (admin)
//! - PUT /api/v1/equipment/{id} - Update equipment (admin)
//! - DELETE /api/v1/equipment/{id} - Delete equipment (admin)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{ApiQuery, SkipLimitQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateEquipmentInput, Equipment, UpdateEquipmentInput};
use crate::services::{EquipmentServiceError, DEFAULT_EQUIPMENT_LIMIT};

impl From<EquipmentServiceError> for ApiError {
    fn from(err: EquipmentServiceError) -> Self {
        match err {
            EquipmentServiceError::NotFound(msg) => ApiError::not_found(msg),
            EquipmentServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            EquipmentServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/equipment", get(list_equipment))
        .route("/equipment/{id}", get(get_equipment))
}

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/equipment", post(create_equipment))
        .route("/equipment/{id}", put(update_equipment).delete(delete_equipment))
}

async fn list_equipment(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SkipLimitQuery>,
) -> Result<Json<Vec<Equipment>>, ApiError> {
    let params = query.into_params(DEFAULT_EQUIPMENT_LIMIT);
    Ok(Json(state.equipment_service.list(params).await?))
}

async fn get_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Equipment>, ApiError> {
    Ok(Json(state.equipment_service.get(id).await?))
}

async fn create_equipment(
    State(state): State<AppState>,
    Json(body): Json<CreateEquipmentInput>,
) -> Result<(StatusCode, Json<Equipment>), ApiError> {
    let equipment = state.equipment_service.create(body).await?;
    Ok((StatusCode::CREATED, Json(equipment)))
}

async fn update_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEquipmentInput>,
) -> Result<Json<Equipment>, ApiError> {
    Ok(Json(state.equipment_service.update(id, body).await?))
}

async fn delete_equipment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.equipment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
