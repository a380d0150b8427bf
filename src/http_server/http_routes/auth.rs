use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::SessionCookie;
use crate::error::AppResult;
use crate::http_server::extract::ValidJson;
use crate::http_server::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    #[serde(alias = "email")]
    identity: String,
    #[serde(alias = "password")]
    secret: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    identity: String,
    role: String,
    expires_at: Option<DateTime<Utc>>,
}

fn session_cookie(settings: &SessionCookie, value: String) -> Cookie<'static> {
    Cookie::build((settings.name.clone(), value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(settings.secure)
        .build()
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let issued = state.verifier.login(&body.identity, &body.secret).await?;

    let mut cookie = session_cookie(&state.cookie, issued.token);
    cookie.set_max_age(time::Duration::seconds(state.signer.ttl().num_seconds()));

    let response = LoginResponse {
        expires_at: issued.claims.expires_at(),
        identity: issued.claims.sub,
        role: issued.claims.role,
    };
    Ok((jar.add(cookie), Json(response)))
}

/// Always answers with a removal cookie, whether or not one was sent.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    let mut cookie = session_cookie(&state.cookie, String::new());
    cookie.make_removal();
    (jar.add(cookie), StatusCode::NO_CONTENT)
}
