use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};

use crate::auth::gate::AdminSession;
use crate::error::AppResult;
use crate::http_server::extract::ValidJson;
use crate::http_server::state::AppState;
use crate::services::settings::{SettingsInput, SettingsService, SiteSettings};

pub async fn get_settings(State(state): State<Arc<AppState>>) -> AppResult<Json<SiteSettings>> {
    let settings = SettingsService::new(state.db.clone()).get().await?;
    Ok(Json(settings))
}

pub async fn save_settings(
    State(state): State<Arc<AppState>>,
    AdminSession(claims): AdminSession,
    ValidJson(input): ValidJson<SettingsInput>,
) -> AppResult<(StatusCode, Json<SiteSettings>)> {
    let settings = SettingsService::new(state.db.clone()).save(input).await?;
    log::debug!("Site settings saved by '{}'", claims.sub);
    Ok((StatusCode::CREATED, Json(settings)))
}
