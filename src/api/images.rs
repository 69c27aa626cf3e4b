//! Image API endpoints
//!
//! - GET /api/v1/images - List images
//! - GET /api/v1/images/{id} - Get image metadata
//! - GET /api/v1/images/adventure/{id} - Images of an adventure, cover first
//! - GET /api/v1/images/equipment/{id} - Images of an equipment item, cover first
//! - POST /api/v1/images/upload - Multipart upload (admin)
//! - PUT /api/v1/images/{id} - Update title, description or cover flag (admin)
//! - DELETE /api/v1/images/{id} - Delete image and file (admin)
//!
//! The stored files themselves are served under `/media`.

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};

use crate::api::common::{ApiQuery, SkipLimitQuery};
use crate::api::middleware::{ApiError, AppState};
use crate::models::{Image, UpdateImageInput};
use crate::services::{ImageServiceError, ImageUpload, UploadedFile, DEFAULT_IMAGE_LIMIT};

/// Room for the non-file multipart fields on top of the image size limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

impl From<ImageServiceError> for ApiError {
    fn from(err: ImageServiceError) -> Self {
        match err {
            ImageServiceError::NotFound(msg) => ApiError::not_found(msg),
            ImageServiceError::ValidationError(msg) => ApiError::validation_error(msg),
            ImageServiceError::StorageError(e) => ApiError::internal_error(e.to_string()),
            ImageServiceError::InternalError(e) => ApiError::internal_error(format!("{:#}", e)),
        }
    }
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large(err.body_text())
    } else {
        ApiError::validation_error(format!("Invalid multipart body: {}", err.body_text()))
    }
}

pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/images", get(list_images))
        .route("/images/{id}", get(get_image))
        .route("/images/adventure/{id}", get(list_adventure_images))
        .route("/images/equipment/{id}", get(list_equipment_images))
}

/// Admin image routes; the upload route accepts bodies up to the image limit
pub fn admin_router(max_image_size: u64) -> Router<AppState> {
    let body_limit = usize::try_from(max_image_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route(
            "/images/upload",
            post(upload_image).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/images/{id}", put(update_image).delete(delete_image))
}

async fn list_images(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SkipLimitQuery>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let params = query.into_params(DEFAULT_IMAGE_LIMIT);
    Ok(Json(state.image_service.list(params).await?))
}

async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Image>, ApiError> {
    Ok(Json(state.image_service.get(id).await?))
}

async fn list_adventure_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Image>>, ApiError> {
    Ok(Json(state.image_service.list_for_adventure(id).await?))
}

async fn list_equipment_images(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Image>>, ApiError> {
    Ok(Json(state.image_service.list_for_equipment(id).await?))
}

/// POST /api/v1/images/upload
///
/// Fields: `file` (required), `title`, `description`, `is_cover`,
/// `adventure_id`, `equipment_id`. Unknown fields are ignored.
async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Image>), ApiError> {
    let mut file = None;
    let mut title = None;
    let mut description = None;
    let mut is_cover = false;
    let mut adventure_id = None;
    let mut equipment_id = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(|s| s.to_string());
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "title" => title = Some(field.text().await.map_err(multipart_error)?),
            "description" => description = Some(field.text().await.map_err(multipart_error)?),
            "is_cover" => is_cover = parse_flag(&field.text().await.map_err(multipart_error)?)?,
            "adventure_id" => {
                adventure_id = parse_id("adventure_id", &field.text().await.map_err(multipart_error)?)?
            }
            "equipment_id" => {
                equipment_id = parse_id("equipment_id", &field.text().await.map_err(multipart_error)?)?
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::validation_error("No file provided"))?;

    let image = state
        .image_service
        .upload(ImageUpload {
            file,
            title,
            description: description.filter(|d| !d.trim().is_empty()),
            is_cover,
            adventure_id,
            equipment_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(image)))
}

async fn update_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateImageInput>,
) -> Result<Json<Image>, ApiError> {
    Ok(Json(state.image_service.update(id, body).await?))
}

async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.image_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Parse a form boolean (`true`/`false`/`1`/`0`/`on`/`off`)
fn parse_flag(value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(ApiError::validation_error(format!(
            "Invalid value for is_cover: '{}'",
            other
        ))),
    }
}

/// Parse an optional numeric id; an empty field means "not set"
fn parse_id(field: &str, value: &str) -> Result<Option<i64>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::validation_error(format!("Invalid {}: '{}'", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        for truthy in ["true", "1", "on", "TRUE", " yes "] {
            assert!(parse_flag(truthy).unwrap(), "{}", truthy);
        }
        for falsy in ["false", "0", "off", ""] {
            assert!(!parse_flag(falsy).unwrap(), "{}", falsy);
        }
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("adventure_id", "42").unwrap(), Some(42));
        assert_eq!(parse_id("adventure_id", " ").unwrap(), None);
        assert!(parse_id("adventure_id", "abc").is_err());
    }
}
