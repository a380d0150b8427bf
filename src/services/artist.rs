use std::sync::Arc;

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities::artist::{self, ArtistCategory};
use crate::entities::{event_lineup, video};
use crate::error::{AppError, AppResult, DbResultExt};
use crate::services::transaction_error;
use crate::services::validate::{count, optional_url, required_text};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArtistStatsInput {
    pub years_active: u32,
    pub tracks_released: u32,
    pub streams: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArtistSocialLinksInput {
    pub youtube: Option<String>,
    pub instagram: Option<String>,
    pub twitter: Option<String>,
    pub tiktok: Option<String>,
}

/// Body of an artist create or full update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ArtistInput {
    pub name: String,
    pub bio: String,
    pub category: ArtistCategory,
    pub image: String,
    pub thumbnail: String,
    pub stats: ArtistStatsInput,
    #[serde(default)]
    pub social_links: ArtistSocialLinksInput,
    #[serde(default)]
    pub featured: bool,
}

impl ArtistInput {
    fn into_active_model(self, mut model: artist::ActiveModel) -> AppResult<artist::ActiveModel> {
        model.name = Set(required_text("name", &self.name, 1)?);
        model.bio = Set(required_text("bio", &self.bio, 10)?);
        model.category = Set(self.category);
        model.image = Set(required_text("image", &self.image, 1)?);
        model.thumbnail = Set(required_text("thumbnail", &self.thumbnail, 1)?);
        model.years_active = Set(i64::from(self.stats.years_active));
        model.tracks_released = Set(i64::from(self.stats.tracks_released));
        model.streams = Set(count("stats.streams", self.stats.streams)?);
        model.youtube = Set(optional_url("socialLinks.youtube", self.social_links.youtube)?);
        model.instagram = Set(optional_url(
            "socialLinks.instagram",
            self.social_links.instagram,
        )?);
        model.twitter = Set(optional_url("socialLinks.twitter", self.social_links.twitter)?);
        model.tiktok = Set(optional_url("socialLinks.tiktok", self.social_links.tiktok)?);
        model.featured = Set(self.featured);
        Ok(model)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArtistFilter {
    pub category: Option<ArtistCategory>,
    pub featured_only: bool,
    pub limit: Option<u64>,
}

pub struct ArtistService {
    db: Arc<Database>,
}

impl ArtistService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Most recently created first.
    pub async fn list(&self, filter: &ArtistFilter) -> AppResult<Vec<artist::Model>> {
        let mut query = artist::Entity::find();
        if let Some(category) = filter.category {
            query = query.filter(artist::Column::Category.eq(category));
        }
        if filter.featured_only {
            query = query.filter(artist::Column::Featured.eq(true));
        }
        query = query
            .order_by_desc(artist::Column::CreatedAt)
            .order_by_desc(artist::Column::Id);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .all(&self.db.conn)
            .await
            .db_context("Failed to fetch artists")
    }

    pub async fn get(&self, id: i64) -> AppResult<artist::Model> {
        artist::Entity::find_by_id(id)
            .one(&self.db.conn)
            .await
            .db_context("Failed to fetch artist")?
            .ok_or(AppError::not_found("Artist", id))
    }

    pub async fn create(&self, input: ArtistInput) -> AppResult<artist::Model> {
        let model = input.into_active_model(artist::ActiveModel::new())?;
        let created = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    model
                        .insert(txn)
                        .await
                        .db_context("Failed to create artist")
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to create artist"))?;

        log::info!("Artist created: '{}' (ID: {})", created.name, created.id);
        Ok(created)
    }

    pub async fn update(&self, id: i64, input: ArtistInput) -> AppResult<artist::Model> {
        let updated = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    let existing = artist::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .db_context("Failed to fetch artist")?
                        .ok_or(AppError::not_found("Artist", id))?;
                    input
                        .into_active_model(existing.into())?
                        .update(txn)
                        .await
                        .db_context("Failed to update artist")
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to update artist"))?;

        log::info!("Artist updated: '{}' (ID: {})", updated.name, updated.id);
        Ok(updated)
    }

    /// Deletion is refused while any video or event lineup still points at
    /// the artist. References are never cleared implicitly.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.db
            .write(|txn| {
                Box::pin(async move {
                    artist::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .db_context("Failed to fetch artist")?
                        .ok_or(AppError::not_found("Artist", id))?;

                    let videos = video::Entity::find()
                        .filter(video::Column::ArtistId.eq(id))
                        .count(txn)
                        .await
                        .db_context("Failed to count artist videos")?;
                    let lineup_slots = event_lineup::Entity::find()
                        .filter(event_lineup::Column::ArtistId.eq(id))
                        .count(txn)
                        .await
                        .db_context("Failed to count artist lineup slots")?;

                    if videos > 0 || lineup_slots > 0 {
                        return Err(AppError::Conflict(format!(
                            "Artist {id} is still referenced by {videos} video(s) and {lineup_slots} event lineup slot(s)"
                        )));
                    }

                    artist::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .db_context("Failed to delete artist")?;
                    Ok(())
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to delete artist"))?;

        log::info!("Artist deleted (ID: {})", id);
        Ok(())
    }
}
