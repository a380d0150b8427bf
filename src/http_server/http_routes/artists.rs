use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::gate::AdminSession;
use crate::entities::artist::{self, ArtistCategory};
use crate::error::AppResult;
use crate::http_server::extract::{ListQuery, ValidJson, ValidPath, ValidQuery};
use crate::http_server::state::AppState;
use crate::services::artist::{ArtistFilter, ArtistInput, ArtistService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistStatsView {
    years_active: i64,
    tracks_released: i64,
    streams: i64,
}

#[derive(Debug, Serialize)]
pub struct ArtistSocialLinksView {
    #[serde(skip_serializing_if = "Option::is_none")]
    youtube: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    twitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tiktok: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistView {
    id: i64,
    name: String,
    bio: String,
    category: ArtistCategory,
    image: String,
    thumbnail: String,
    stats: ArtistStatsView,
    social_links: ArtistSocialLinksView,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<artist::Model> for ArtistView {
    fn from(model: artist::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            bio: model.bio,
            category: model.category,
            image: model.image,
            thumbnail: model.thumbnail,
            stats: ArtistStatsView {
                years_active: model.years_active,
                tracks_released: model.tracks_released,
                streams: model.streams,
            },
            social_links: ArtistSocialLinksView {
                youtube: model.youtube,
                instagram: model.instagram,
                twitter: model.twitter,
                tiktok: model.tiktok,
            },
            featured: model.featured,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Compact form used where another record points at an artist.
#[derive(Debug, Serialize)]
pub struct ArtistSummary {
    id: i64,
    name: String,
    thumbnail: String,
}

impl From<artist::Model> for ArtistSummary {
    fn from(model: artist::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            thumbnail: model.thumbnail,
        }
    }
}

pub async fn list_artists(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> AppResult<Json<Vec<ArtistView>>> {
    let filter = ArtistFilter {
        category: ListQuery::enum_filter("category", query.category.as_deref())?,
        featured_only: query.featured_only(),
        limit: query.limit()?,
    };
    let artists = ArtistService::new(state.db.clone()).list(&filter).await?;
    Ok(Json(artists.into_iter().map(ArtistView::from).collect()))
}

pub async fn get_artist(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<ArtistView>> {
    let artist = ArtistService::new(state.db.clone()).get(id).await?;
    Ok(Json(artist.into()))
}

pub async fn create_artist(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidJson(input): ValidJson<ArtistInput>,
) -> AppResult<(StatusCode, Json<ArtistView>)> {
    let artist = ArtistService::new(state.db.clone()).create(input).await?;
    Ok((StatusCode::CREATED, Json(artist.into())))
}

pub async fn update_artist(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<ArtistInput>,
) -> AppResult<Json<ArtistView>> {
    let artist = ArtistService::new(state.db.clone()).update(id, input).await?;
    Ok(Json(artist.into()))
}

pub async fn delete_artist(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<StatusCode> {
    ArtistService::new(state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
