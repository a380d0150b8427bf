use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::gate::AdminSession;
use crate::entities::event::{EventStatus, EventType};
use crate::error::AppResult;
use crate::http_server::extract::{ListQuery, ValidJson, ValidPath, ValidQuery};
use crate::http_server::http_routes::artists::ArtistSummary;
use crate::http_server::state::AppState;
use crate::services::event::{EventFilter, EventInput, EventRecord, EventService};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventView {
    id: i64,
    title: String,
    description: String,
    date: DateTime<Utc>,
    location: String,
    #[serde(rename = "type")]
    event_type: EventType,
    status: EventStatus,
    image: String,
    featured: bool,
    lineup: Vec<ArtistSummary>,
    ticket_price: Option<f64>,
    ticket_url: Option<String>,
    capacity: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<EventRecord> for EventView {
    fn from(record: EventRecord) -> Self {
        let event = record.event;
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            date: event.date,
            location: event.location,
            event_type: event.event_type,
            status: event.status,
            image: event.image,
            featured: event.featured,
            lineup: record.lineup.into_iter().map(ArtistSummary::from).collect(),
            ticket_price: event.ticket_price_cents.map(|cents| cents as f64 / 100.0),
            ticket_url: event.ticket_url,
            capacity: event.capacity,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> AppResult<Json<Vec<EventView>>> {
    let filter = EventFilter {
        status: ListQuery::enum_filter("status", query.status.as_deref())?,
        event_type: ListQuery::enum_filter("type", query.event_type.as_deref())?,
        featured_only: query.featured_only(),
        limit: query.limit()?,
    };
    let events = EventService::new(state.db.clone()).list(&filter).await?;
    Ok(Json(events.into_iter().map(EventView::from).collect()))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<Json<EventView>> {
    let event = EventService::new(state.db.clone()).get(id).await?;
    Ok(Json(event.into()))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidJson(input): ValidJson<EventInput>,
) -> AppResult<(StatusCode, Json<EventView>)> {
    let event = EventService::new(state.db.clone()).create(input).await?;
    Ok((StatusCode::CREATED, Json(event.into())))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
    ValidJson(input): ValidJson<EventInput>,
) -> AppResult<Json<EventView>> {
    let event = EventService::new(state.db.clone()).update(id, input).await?;
    Ok(Json(event.into()))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    AdminSession(_claims): AdminSession,
    ValidPath(id): ValidPath<i64>,
) -> AppResult<StatusCode> {
    EventService::new(state.db.clone()).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
