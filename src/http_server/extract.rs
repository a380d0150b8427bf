use axum::Json;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde::de::value::{Error as ValueError, StrDeserializer};

use crate::error::{AppError, AppResult};

/// `Json<T>` whose rejections (bad syntax, wrong shape, unknown fields) come
/// back as validation errors.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation("body", rejection.body_text())),
        }
    }
}

/// `Path<T>` whose rejections come back as validation errors on `id`.
pub struct ValidPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation("id", rejection.body_text())),
        }
    }
}

/// `Query<T>` whose rejections come back as validation errors on `query`.
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(AppError::validation("query", rejection.body_text())),
        }
    }
}

/// Raw listing query. Values stay strings until each route picks the filters
/// it supports.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub featured: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub artist: Option<String>,
    pub limit: Option<String>,
}

/// `None`, blank and `all` mean no filter.
fn filter_value(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

impl ListQuery {
    /// Parse a closed-set filter using the same wire names as request bodies.
    pub fn enum_filter<T: DeserializeOwned>(
        field: &str,
        value: Option<&str>,
    ) -> AppResult<Option<T>> {
        filter_value(value)
            .map(|v| {
                T::deserialize(StrDeserializer::<ValueError>::new(v))
                    .map_err(|_| AppError::validation(field, format!("unknown value '{v}'")))
            })
            .transpose()
    }

    pub fn featured_only(&self) -> bool {
        self.featured.as_deref().map(str::trim) == Some("true")
    }

    /// SQLite binds integers as `i64`, so larger limits are rejected here.
    pub fn limit(&self) -> AppResult<Option<u64>> {
        filter_value(self.limit.as_deref())
            .map(|v| match v.parse::<i64>() {
                Ok(limit) if limit > 0 => Ok(limit.unsigned_abs()),
                _ => Err(AppError::validation("limit", "must be a positive integer")),
            })
            .transpose()
    }

    pub fn artist_id(&self) -> AppResult<Option<i64>> {
        filter_value(self.artist.as_deref())
            .map(|v| {
                v.parse::<i64>()
                    .map_err(|_| AppError::validation("artist", "must be an artist ID"))
            })
            .transpose()
    }
}
