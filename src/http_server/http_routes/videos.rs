use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::gate::AdminSession;
use crate::entities::video::VideoCategory;
use crate::error::AppResult;
use crate::http_server::extract::{ListQuery, ValidJson, ValidPath, ValidQuery};
use crate::http_server::http_routes::artists::ArtistSummary;
use crate::http_server::state::AppState;
use crate::services::video::{VideoFilter, VideoInput, VideoRecord, VideoService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    id: i64,
    title: String,
    artist_id: i64,
    artist: Option<ArtistSummary>,
    youtube_id: String,
    description: String,
    thumbnail: String,
    category: VideoCategory,
    views: i64,
    upload_date: DateTime<Utc>,
    featured: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<VideoRecord> for VideoView {
    fn from(record: VideoRecord) -> Self {
        let video = record.video;
        Self {
            id: video.id,
            title: video.title,
            artist_id: video.artist_id,
            artist: record.artist.map(ArtistSummary::from),
            youtube_id: video.youtube_id,
            description: video.description,
            thumbnail: video.thumbnail,
            category: video.category,
            views: video.views,
            upload_date: video.upload_date,
            featured: video.featured,
            created_at: video.created_at,
            updated_at: video.updated_at,
        }
    }
}

pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> AppResult<Json<Vec<VideoView>>> {
    let filter = VideoFilter {
        category: ListQuery::enum_filter("category", query.category.as_deref())?,
        featured_only: query.featured_only(),
        artist_id: query.artist_id()?,
        limit: query.limit()?,
    };
    let videos = VideoService::new(state.db.clone()).list(&filter).await?;
    Ok(Json(videos.into_iter().map(VideoView::from).collect()))
}

pub async fn get_video(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<VideoView>> {
    let video = VideoService::new(state.db.clone()).get(id).await?;
    Ok(Json(video.into()))
}

pub async fn create_video(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidJson(input): ValidJson<VideoInput>,
) -> AppResult<(StatusCode, Json<VideoView>)> {
    let video = VideoService::new(state.db.clone()).create(input).await?;
    Ok((StatusCode::CREATED, Json(video.into())))
}

pub async fn update_video(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<VideoInput>,
) -> AppResult<Json<VideoView>> {
    let video = VideoService::new(state.db.clone()).update(id, input).await?;
    Ok(Json(video.into()))
}

pub async fn delete_video(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<StatusCode> {
    VideoService::new(state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
