//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The JSON error type returned by every handler
//! - Bearer token authentication and admin authorization

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxAdventureRepository, SqlxEquipmentRepository, SqlxImageRepository, SqlxProfileRepository,
    SqlxTagRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    AdventureService, EquipmentService, ImageService, JwtError, JwtService, ProfileService,
    TagService, UserService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub jwt_service: Arc<JwtService>,
    pub user_service: Arc<UserService>,
    pub tag_service: Arc<TagService>,
    pub adventure_service: Arc<AdventureService>,
    pub equipment_service: Arc<EquipmentService>,
    pub image_service: Arc<ImageService>,
    pub profile_service: Arc<ProfileService>,
}

impl AppState {
    /// Wire repositories and services on top of a migrated pool
    pub fn new(pool: DynDatabasePool, config: Config) -> Self {
        let adventure_repo = SqlxAdventureRepository::boxed(pool.clone());
        let equipment_repo = SqlxEquipmentRepository::boxed(pool.clone());

        let tag_service = Arc::new(TagService::new(SqlxTagRepository::boxed(pool.clone())));
        let adventure_service = Arc::new(AdventureService::new(
            adventure_repo.clone(),
            tag_service.clone(),
        ));
        let equipment_service = Arc::new(EquipmentService::new(equipment_repo.clone()));
        let image_service = Arc::new(ImageService::new(
            SqlxImageRepository::boxed(pool.clone()),
            adventure_repo,
            equipment_repo,
            config.media.clone(),
        ));
        let profile_service = Arc::new(ProfileService::new(SqlxProfileRepository::boxed(pool.clone())));
        let user_service = Arc::new(UserService::new(SqlxUserRepository::boxed(pool)));

        Self {
            jwt_service: Arc::new(JwtService::from_config(&config.auth)),
            config: Arc::new(config),
            user_service,
            tag_service,
            adventure_service,
            equipment_service,
            image_service,
            profile_service,
        }
    }
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new("PAYLOAD_TOO_LARGE", message)
    }

    /// Internal errors are logged here so handlers can map them with `?`
    pub fn internal_error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::error!("Internal error: {}", message);
        Self::new("INTERNAL_ERROR", message)
    }

    pub fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "PAYLOAD_TOO_LARGE" => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = (status, Json(self)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, header::HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(request: &Request) -> Option<&str> {
    let value = request.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Authentication middleware
///
/// Verifies the bearer token, loads its subject and puts the user into the
/// request extensions. Unknown or inactive subjects are rejected.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    let claims = state.jwt_service.verify_token(token).map_err(|e| match e {
        JwtError::Expired => ApiError::unauthorized("Token has expired"),
        other => {
            tracing::debug!("Rejected bearer token: {}", other);
            ApiError::unauthorized("Could not validate credentials")
        }
    })?;

    let user = state
        .user_service
        .get_by_username(&claims.sub)
        .await
        .map_err(|e| ApiError::internal_error(e.to_string()))?
        .ok_or_else(|| ApiError::unauthorized("Could not validate credentials"))?;

    if !user.is_active {
        return Err(ApiError::unauthorized("Inactive user"));
    }

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Admin authorization middleware
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Not authenticated"))?;

    if !user.0.is_admin {
        return Err(ApiError::forbidden("The user doesn't have enough privileges"));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: &str) -> Request {
        Request::builder()
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&request_with_auth("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&request_with_auth("bearer abc")), Some("abc"));
        assert_eq!(extract_bearer_token(&request_with_auth("Basic abc")), None);
        assert_eq!(extract_bearer_token(&request_with_auth("Bearer ")), None);
        assert_eq!(
            extract_bearer_token(&Request::builder().body(Body::empty()).unwrap()),
            None
        );
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::payload_too_large("x").status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ApiError::validation_error("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::new("SOMETHING", "x").status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_shape() {
        let body = serde_json::to_value(ApiError::not_found("Adventure not found")).unwrap();
        assert_eq!(body["error"]["code"], "NOT_FOUND");
        assert_eq!(body["error"]["message"], "Adventure not found");
        assert!(body["error"].get("details").is_none());
    }
}
