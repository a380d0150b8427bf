use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;

use crate::http_server::state::AppState;

/// Login entry point. Never gated.
pub const LOGIN_PATH: &str = "/admin";

fn is_guarded(path: &str) -> bool {
    path.starts_with("/admin/")
}

/// Page-navigation gate for `/admin/*`. Any request without a valid session
/// cookie is sent to the login page, whatever the reason. On success the
/// decoded claims are stored in the request extensions.
pub async fn session_guard(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if !is_guarded(request.uri().path()) {
        return next.run(request).await;
    }

    let claims = jar
        .get(&state.cookie.name)
        .and_then(|cookie| match state.signer.verify(cookie.value()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                log::debug!("Session guard rejected token: {e}");
                None
            }
        });

    match claims {
        Some(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        None => Redirect::to(LOGIN_PATH).into_response(),
    }
}
