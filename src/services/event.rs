use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Deserialize;
use tracing::instrument;

use crate::database::Database;
use crate::entities::event::{self, EventStatus, EventType};
use crate::entities::{artist, event_lineup};
use crate::error::{AppError, AppResult, DbResultExt};
use crate::services::transaction_error;
use crate::services::validate::{optional_url, required_text};

/// Body of an event create or full update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub status: EventStatus,
    pub image: String,
    #[serde(default)]
    pub featured: bool,
    /// Artist IDs in running order
    #[serde(default)]
    pub lineup: Vec<i64>,
    pub ticket_price: Option<f64>,
    pub ticket_url: Option<String>,
    pub capacity: Option<i64>,
}

impl EventInput {
    fn into_active_model(
        self,
        mut model: event::ActiveModel,
    ) -> AppResult<(event::ActiveModel, Vec<i64>)> {
        let mut seen = HashSet::new();
        if let Some(dup) = self.lineup.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::validation(
                "lineup",
                format!("artist {dup} appears more than once"),
            ));
        }
        if self.capacity.is_some_and(|capacity| capacity < 1) {
            return Err(AppError::validation("capacity", "must be at least 1"));
        }

        model.title = Set(required_text("title", &self.title, 1)?);
        model.description = Set(required_text("description", &self.description, 20)?);
        model.date = Set(self.date);
        model.location = Set(required_text("location", &self.location, 1)?);
        model.event_type = Set(self.event_type);
        model.status = Set(self.status);
        model.image = Set(required_text("image", &self.image, 1)?);
        model.featured = Set(self.featured);
        model.ticket_price_cents = Set(self.ticket_price.map(price_to_cents).transpose()?);
        model.ticket_url = Set(optional_url("ticketUrl", self.ticket_url)?);
        model.capacity = Set(self.capacity);
        Ok((model, self.lineup))
    }
}

fn price_to_cents(price: f64) -> AppResult<i64> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation(
            "ticketPrice",
            "must be a non-negative number",
        ));
    }
    let cents = (price * 100.0).round();
    if cents > i64::MAX as f64 {
        return Err(AppError::validation("ticketPrice", "is too large"));
    }
    Ok(cents as i64)
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub event_type: Option<EventType>,
    pub featured_only: bool,
    pub limit: Option<u64>,
}

/// An event with its lineup resolved, in running order.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event: event::Model,
    pub lineup: Vec<artist::Model>,
}

pub struct EventService {
    db: Arc<Database>,
}

impl EventService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Soonest first.
    pub async fn list(&self, filter: &EventFilter) -> AppResult<Vec<EventRecord>> {
        let mut query = event::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(event::Column::Status.eq(status));
        }
        if let Some(event_type) = filter.event_type {
            query = query.filter(event::Column::EventType.eq(event_type));
        }
        if filter.featured_only {
            query = query.filter(event::Column::Featured.eq(true));
        }
        query = query
            .order_by_asc(event::Column::Date)
            .order_by_asc(event::Column::Id);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let events = query
            .all(&self.db.conn)
            .await
            .db_context("Failed to fetch events")?;

        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        let mut lineups = load_lineups(&self.db.conn, ids).await?;

        Ok(events
            .into_iter()
            .map(|event| {
                let lineup = lineups.remove(&event.id).unwrap_or_default();
                EventRecord { event, lineup }
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> AppResult<EventRecord> {
        fetch_record(&self.db.conn, id).await
    }

    #[instrument(skip(self, input), fields(lineup_len = input.lineup.len()))]
    pub async fn create(&self, input: EventInput) -> AppResult<EventRecord> {
        let (model, lineup) = input.into_active_model(event::ActiveModel::new())?;

        let record = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    let artists = resolve_lineup(txn, &lineup).await?;

                    let event = model
                        .insert(txn)
                        .await
                        .db_context("Failed to create event")?;
                    write_lineup(txn, event.id, &lineup).await?;

                    Ok(EventRecord {
                        event,
                        lineup: artists,
                    })
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to create event"))?;

        log::info!(
            "Event created: '{}' (ID: {}, {} lineup slot(s))",
            record.event.title,
            record.event.id,
            record.lineup.len()
        );
        Ok(record)
    }

    /// Replaces every field, including the whole lineup.
    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i64, input: EventInput) -> AppResult<EventRecord> {
        let record = self
            .db
            .write(|txn| {
                Box::pin(async move {
                    let existing = event::Entity::find_by_id(id)
                        .one(txn)
                        .await
                        .db_context("Failed to fetch event")?
                        .ok_or(AppError::not_found("Event", id))?;

                    let (model, lineup) = input.into_active_model(existing.into())?;
                    let artists = resolve_lineup(txn, &lineup).await?;

                    let event = model
                        .update(txn)
                        .await
                        .db_context("Failed to update event")?;

                    event_lineup::Entity::delete_many()
                        .filter(event_lineup::Column::EventId.eq(id))
                        .exec(txn)
                        .await
                        .db_context("Failed to clear event lineup")?;
                    write_lineup(txn, id, &lineup).await?;

                    Ok(EventRecord {
                        event,
                        lineup: artists,
                    })
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to update event"))?;

        log::info!(
            "Event updated: '{}' (ID: {})",
            record.event.title,
            record.event.id
        );
        Ok(record)
    }

    /// Lineup rows go with the event.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        self.db
            .write(|txn| {
                Box::pin(async move {
                    event_lineup::Entity::delete_many()
                        .filter(event_lineup::Column::EventId.eq(id))
                        .exec(txn)
                        .await
                        .db_context("Failed to delete event lineup")?;

                    let result = event::Entity::delete_by_id(id)
                        .exec(txn)
                        .await
                        .db_context("Failed to delete event")?;
                    if result.rows_affected == 0 {
                        return Err(AppError::not_found("Event", id));
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| transaction_error(e, "Failed to delete event"))?;

        log::info!("Event deleted (ID: {})", id);
        Ok(())
    }
}

async fn fetch_record<C: ConnectionTrait>(conn: &C, id: i64) -> AppResult<EventRecord> {
    let event = event::Entity::find_by_id(id)
        .one(conn)
        .await
        .db_context("Failed to fetch event")?
        .ok_or(AppError::not_found("Event", id))?;
    let mut lineups = load_lineups(conn, vec![id]).await?;
    Ok(EventRecord {
        event,
        lineup: lineups.remove(&id).unwrap_or_default(),
    })
}

/// Lineups for many events in one query, keyed by event ID.
async fn load_lineups<C: ConnectionTrait>(
    conn: &C,
    event_ids: Vec<i64>,
) -> AppResult<HashMap<i64, Vec<artist::Model>>> {
    if event_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = event_lineup::Entity::find()
        .filter(event_lineup::Column::EventId.is_in(event_ids))
        .order_by_asc(event_lineup::Column::EventId)
        .order_by_asc(event_lineup::Column::Position)
        .find_also_related(artist::Entity)
        .all(conn)
        .await
        .db_context("Failed to fetch event lineups")?;

    let mut lineups: HashMap<i64, Vec<artist::Model>> = HashMap::new();
    for (slot, artist) in rows {
        if let Some(artist) = artist {
            lineups.entry(slot.event_id).or_default().push(artist);
        }
    }
    Ok(lineups)
}

/// Every lineup entry must name an existing artist. The first missing one
/// fails the whole write.
async fn resolve_lineup<C: ConnectionTrait>(
    conn: &C,
    lineup: &[i64],
) -> AppResult<Vec<artist::Model>> {
    if lineup.is_empty() {
        return Ok(Vec::new());
    }

    let found: HashMap<i64, artist::Model> = artist::Entity::find()
        .filter(artist::Column::Id.is_in(lineup.iter().copied()))
        .all(conn)
        .await
        .db_context("Failed to resolve event lineup")?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();

    lineup
        .iter()
        .map(|id| {
            found.get(id).cloned().ok_or_else(|| {
                AppError::validation("lineup", format!("artist {id} does not exist"))
            })
        })
        .collect()
}

async fn write_lineup<C: ConnectionTrait>(conn: &C, event_id: i64, lineup: &[i64]) -> AppResult<()> {
    if lineup.is_empty() {
        return Ok(());
    }

    let mut rows = Vec::with_capacity(lineup.len());
    for (position, artist_id) in lineup.iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| AppError::validation("lineup", "has too many entries"))?;
        rows.push(event_lineup::ActiveModel {
            event_id: Set(event_id),
            position: Set(position),
            artist_id: Set(*artist_id),
        });
    }

    event_lineup::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .db_context("Failed to save event lineup")?;
    Ok(())
}
