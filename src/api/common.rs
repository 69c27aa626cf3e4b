//! Common API utilities and shared types

use axum::{
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::api::middleware::ApiError;
use crate::models::ListParams;

/// Query string extractor whose rejection is a JSON [`ApiError`]
#[derive(Debug, Clone)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Query::<T>::from_request_parts(parts, state)
            .await
            .map(|Query(value)| ApiQuery(value))
            .map_err(|rejection| ApiError::validation_error(rejection.body_text()))
    }
}

/// `?skip=&limit=` query parameters shared by the list endpoints
#[derive(Debug, Default, Deserialize)]
pub struct SkipLimitQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl SkipLimitQuery {
    /// Resolve into clamped list parameters using the endpoint's default limit
    pub fn into_params(self, default_limit: i64) -> ListParams {
        ListParams::from_query(self.skip, self.limit, default_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(uri: &str) -> Result<ApiQuery<SkipLimitQuery>, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ApiQuery::<SkipLimitQuery>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_query_parses_numbers() {
        let ApiQuery(query) = extract("/images?skip=5&limit=7").await.unwrap();
        assert_eq!(query.into_params(20), ListParams::new(5, 7));
    }

    #[tokio::test]
    async fn test_malformed_query_is_validation_error() {
        let err = match extract("/images?skip=abc").await {
            Ok(_) => panic!("skip=abc must be rejected"),
            Err(err) => err,
        };
        assert_eq!(err.error.code, "VALIDATION_ERROR");
        assert!(!err.error.message.is_empty());
    }

    #[test]
    fn test_defaults_and_clamping() {
        assert_eq!(SkipLimitQuery::default().into_params(20), ListParams::new(0, 20));

        let query = SkipLimitQuery {
            skip: Some(-5),
            limit: Some(1000),
        };
        assert_eq!(query.into_params(20), ListParams::new(0, 100));
    }
}
