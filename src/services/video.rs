use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities::artist;
use crate::entities::video::{self, VideoCategory};
use crate::error::{AppError, AppResult, DbResultExt};
use crate::services::transaction_error;
use crate::services::validate::{count, required_text};

/// Body of a video create or full update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VideoInput {
    pub title: String,
    /// ID of the artist this video belongs to
    pub artist: i64,
    pub youtube_id: String,
    pub description: String,
    pub thumbnail: String,
    pub category: VideoCategory,
    #[serde(default)]
    pub views: u64,
    pub upload_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub featured: bool,
}

impl VideoInput {
    fn into_active_model(self, mut model: video::ActiveModel) -> AppResult<video::ActiveModel> {
        let youtube_id = required_text("youtubeId", &self.youtube_id, 1)?;
        if youtube_id.chars().any(char::is_whitespace) {
            return Err(AppError::validation("youtubeId", "must not contain spaces"));
        }

        model.title = Set(required_text("title", &self.title, 1)?);
        model.artist_id = Set(self.artist);
        model.youtube_id = Set(youtube_id);
        model.description = Set(required_text("description", &self.description, 10)?);
        model.thumbnail = Set(required_text("thumbnail", &self.thumbnail, 1)?);
        model.category = Set(self.category);
        model.views = Set(count("views", self.views)?);
        if let Some(upload_date) = self.upload_date {
            model.upload_date = Set(upload_date);
        }
        model.featured = Set(self.featured);
        Ok(model)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoFilter {
    pub category: Option<VideoCategory>,
    pub featured_only: bool,
    pub artist_id: Option<i64>,
    pub limit: Option<u64>,
}

/// A video with its artist resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub video: video::Model,
    pub artist: Option<artist::Model>,
}

pub struct VideoService {
    db: Arc<Database>,
}

impl VideoService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Newest upload first.
    pub async fn list(&self, filter: &VideoFilter) -> AppResult<Vec<VideoRecord>> {
        let mut query = video::Entity::find();
        if let Some(category) = filter.category {
            query = query.filter(video::Column::Category.eq(category));
        }
        if filter.featured_only {
            query = query.filter(video::Column::Featured.eq(true));
        }
        if let Some(artist_id) = filter.artist_id {
            query = query.filter(video::Column::ArtistId.eq(artist_id));
        }
        query = query
            .order_by_desc(video::Column::UploadDate)
            .order_by_desc(video::Column::Id);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let rows = query
            .find_also_related(artist::Entity)
            .all(&self.db.conn)
            .await
            .db_context("Failed to fetch videos")?;

        Ok(rows
            .into_iter()
            .map(|(video, artist)| VideoRecord { video, artist })
            .collect())
    }

    pub async fn get(&self, id: i64) -> AppResult<VideoRecord> {
        let (video, artist) = video::Entity::find_by_id(id)
            .find_also_related(artist::Entity)
            .one(&self.db.conn)
            .await
            .db_context("Failed to fetch video")?
            .ok_or(AppError::not_found("Video", id))?;
        Ok(VideoRecord { video, artist })
    }

    /// The artist reference and the YouTube id are checked inside the same
    /// transaction as the insert.
    #[instrument(skip(self, input), fields(artist_id = input.artist))]
    pub async fn create(&self, input: VideoInput) -> AppResult<VideoRecord> {
        let (artist_id, youtube_id) = (input.artist, input.youtube_id.trim().to_string());
        let model = input.into_active_model(video::ActiveModel::new())?;

        let record = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    let artist = resolve_artist(txn, artist_id).await?;
                    ensure_youtube_id_free(txn, &youtube_id, None).await?;

                    let video = model
                        .insert(txn)
                        .await
                        .db_context("Failed to create video")?;
                    Ok(VideoRecord {
                        video,
                        artist: Some(artist),
                    })
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to create video"))?;

        log::info!(
            "Video created: '{}' (ID: {}, artist ID: {})",
            record.video.title,
            record.video.id,
            record.video.artist_id
        );
        Ok(record)
    }

    pub async fn update(&self, id: i64, input: VideoInput) -> AppResult<VideoRecord> {
        let record = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    let existing = video::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .db_context("Failed to fetch video")?
                        .ok_or(AppError::not_found("Video", id))?;

                    let (artist_id, youtube_id) =
                        (input.artist, input.youtube_id.trim().to_string());
                    let model = input.into_active_model(existing.into())?;
                    let artist = resolve_artist(txn, artist_id).await?;
                    ensure_youtube_id_free(txn, &youtube_id, Some(id)).await?;

                    let video = model
                        .update(txn)
                        .await
                        .db_context("Failed to update video")?;
                    Ok(VideoRecord {
                        video,
                        artist: Some(artist),
                    })
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to update video"))?;

        log::info!(
            "Video updated: '{}' (ID: {})",
            record.video.title,
            record.video.id
        );
        Ok(record)
    }

    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let result = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    video::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .db_context("Failed to delete video")
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to delete video"))?;
        if result.rows_affected == 0 {
            return Err(AppError::not_found("Video", id));
        }

        log::info!("Video deleted (ID: {})", id);
        Ok(())
    }
}

async fn resolve_artist<C: ConnectionTrait>(
    conn: &C,
    artist_id: i64,
) -> AppResult<artist::Model> {
    artist::Entity::find_by_id(artist_id)
        .one(conn)
        .await
        .db_context("Failed to resolve video artist")?
        .ok_or_else(|| {
            AppError::validation("artist", format!("artist {artist_id} does not exist"))
        })
}

async fn ensure_youtube_id_free<C: ConnectionTrait>(
    conn: &C,
    youtube_id: &str,
    own_id: Option<i64>,
) -> AppResult<()> {
    let mut query = video::Entity::find().filter(video::Column::YoutubeId.eq(youtube_id));
    if let Some(own_id) = own_id {
        query = query.filter(video::Column::Id.ne(own_id));
    }
    let taken = query
        .one(conn)
        .await
        .db_context("Failed to check YouTube id")?;
    if let Some(other) = taken {
        return Err(AppError::Conflict(format!(
            "YouTube id '{youtube_id}' is already used by video {}",
            other.id
        )));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::artist::ArtistService;
    use crate::services::artist::tests::artist_input;
    use crate::test_utils::test_db;
    use chrono::TimeZone;
    use sea_orm::PaginatorTrait;

    pub(crate) fn video_input(artist: i64, youtube_id: &str) -> VideoInput {
        VideoInput {
            title: "Night Drive".to_string(),
            artist,
            youtube_id: youtube_id.to_string(),
            description: "Official video for the lead single.".to_string(),
            thumbnail: "/images/videos/night-drive.jpg".to_string(),
            category: VideoCategory::Music,
            views: 1200,
            upload_date: None,
            featured: false,
        }
    }

    async fn video_count(db: &Database) -> u64 {
        video::Entity::find().count(&db.conn).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_with_existing_artist() {
        let db = test_db().await;
        let artist = ArtistService::new(db.clone())
            .create(artist_input("Owner"))
            .await
            .unwrap();
        let service = VideoService::new(db);

        let record = service.create(video_input(artist.id, "abc123")).await.unwrap();
        assert_eq!(record.video.artist_id, artist.id);
        assert_eq!(record.artist.unwrap().name, "Owner");
        assert_eq!(record.video.views, 1200);
    }

    #[tokio::test]
    async fn test_create_with_missing_artist_persists_nothing() {
        let db = test_db().await;
        let service = VideoService::new(db.clone());

        let err = service.create(video_input(404, "abc123")).await.unwrap_err();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "artist");
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(video_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_youtube_id_conflicts() {
        let db = test_db().await;
        let artist = ArtistService::new(db.clone())
            .create(artist_input("Owner"))
            .await
            .unwrap();
        let service = VideoService::new(db.clone());

        service.create(video_input(artist.id, "same-id")).await.unwrap();
        let err = service
            .create(video_input(artist.id, "same-id"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(video_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_update_keeps_own_youtube_id_and_checks_artist() {
        let db = test_db().await;
        let artist = ArtistService::new(db.clone())
            .create(artist_input("Owner"))
            .await
            .unwrap();
        let service = VideoService::new(db);

        let created = service.create(video_input(artist.id, "keep-me")).await.unwrap();

        let mut input = video_input(artist.id, "keep-me");
        input.title = "Night Drive (Remastered)".into();
        let updated = service.update(created.video.id, input).await.unwrap();
        assert_eq!(updated.video.title, "Night Drive (Remastered)");

        let err = service
            .update(created.video.id, video_input(999, "keep-me"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "artist"));

        let unchanged = service.get(created.video.id).await.unwrap();
        assert_eq!(unchanged.video.artist_id, artist.id);
    }

    #[tokio::test]
    async fn test_list_filters_by_artist_and_sorts_by_upload_date() {
        let db = test_db().await;
        let artists = ArtistService::new(db.clone());
        let a = artists.create(artist_input("A")).await.unwrap();
        let b = artists.create(artist_input("B")).await.unwrap();
        let service = VideoService::new(db);

        let mut old = video_input(a.id, "old");
        old.upload_date = Some(Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap());
        let mut new = video_input(a.id, "new");
        new.upload_date = Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
        new.category = VideoCategory::Live;
        let mut other = video_input(b.id, "other");
        other.upload_date = Some(Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap());

        service.create(old).await.unwrap();
        service.create(new).await.unwrap();
        service.create(other).await.unwrap();

        let all = service.list(&VideoFilter::default()).await.unwrap();
        let order: Vec<&str> = all.iter().map(|r| r.video.youtube_id.as_str()).collect();
        assert_eq!(order, vec!["new", "other", "old"]);

        let by_a = service
            .list(&VideoFilter {
                artist_id: Some(a.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_a.len(), 2);
        assert!(by_a.iter().all(|r| r.artist.as_ref().unwrap().id == a.id));

        let live = service
            .list(&VideoFilter {
                category: Some(VideoCategory::Live),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].video.youtube_id, "new");
    }

    #[tokio::test]
    async fn test_delete_video() {
        let db = test_db().await;
        let artist = ArtistService::new(db.clone())
            .create(artist_input("Owner"))
            .await
            .unwrap();
        let service = VideoService::new(db.clone());

        let created = service.create(video_input(artist.id, "gone")).await.unwrap();
        service.delete(created.video.id).await.unwrap();
        assert_eq!(video_count(&db).await, 0);

        let err = service.delete(created.video.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_conflict_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let db = Arc::new(Database::open(&dir.path().join("videos.db")).await.unwrap());
        let artist = ArtistService::new(db.clone())
            .create(artist_input("Owner"))
            .await
            .unwrap();

        let youtube_ids: Vec<String> = (0..16)
            .map(|i| if i % 2 == 0 { "dup".to_string() } else { format!("solo{i}") })
            .collect();
        let creates = youtube_ids.into_iter().map(|youtube_id| {
            let service = VideoService::new(db.clone());
            let input = video_input(artist.id, &youtube_id);
            tokio::spawn(async move { service.create(input).await })
        });

        let mut created = 0;
        let mut conflicts = 0;
        for result in futures::future::join_all(creates).await {
            match result.unwrap() {
                Ok(_) => created += 1,
                Err(AppError::Conflict(_)) => conflicts += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(created, 9);
        assert_eq!(conflicts, 7);
        assert_eq!(video_count(&db).await, 9);
    }
}
