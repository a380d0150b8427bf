use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware,
    routing::{get, post},
};
use color_eyre::eyre::{Context, eyre};
use serde_json::{Value, json};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{
    auth::guard::{LOGIN_PATH, session_guard},
    config::ServerConfig,
    http_server::{
        http_routes::{admin, artists, auth, events, health, settings, videos},
        state::AppState,
    },
};

async fn not_found() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Permissive in debug builds. Release builds only allow the configured
/// origins, with credentials so the session cookie is sent.
fn cors_layer(allowed_origins: &[String]) -> color_eyre::Result<CorsLayer> {
    if cfg!(debug_assertions) {
        return Ok(CorsLayer::permissive());
    }

    let origins = allowed_origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .wrap_err_with(|| eyre!("Invalid CORS origin: {origin}"))
        })
        .collect::<color_eyre::Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true))
}

pub fn build_router(app_state: Arc<AppState>, cors_layer: CorsLayer) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route(LOGIN_PATH, get(admin::login_page))
        .route("/admin/session", get(admin::session))
        .route(
            "/artists",
            get(artists::list_artists).post(artists::create_artist),
        )
        .route(
            "/artists/{id}",
            get(artists::get_artist)
                .put(artists::update_artist)
                .delete(artists::delete_artist),
        )
        .route("/videos", get(videos::list_videos).post(videos::create_video))
        .route(
            "/videos/{id}",
            get(videos::get_video)
                .put(videos::update_video)
                .delete(videos::delete_video),
        )
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/settings",
            get(settings::get_settings).post(settings::save_settings),
        )
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            session_guard,
        ))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
    log::info!("Shutdown signal received, draining connections");
}

pub async fn start(server: &ServerConfig, app_state: Arc<AppState>) -> color_eyre::Result<()> {
    let app = build_router(app_state, cors_layer(&server.allowed_origins)?);

    let addr = format!("{}:{}", server.host, server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| eyre!("Failed to bind to {}", addr))?;
    log::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Failed to start HTTP server")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionCookie;
    use crate::auth::token::tests::test_signer;
    use crate::auth::token::{Claims, TokenSigner};
    use crate::auth::verifier::CredentialVerifier;
    use crate::services::admin::AdminService;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use axum::response::Response;
    use tower::ServiceExt;

    const IDENTITY: &str = "owner@example.com";
    const PASSWORD: &str = "correct-password";

    async fn test_app() -> (Router, Arc<AppState>) {
        let db = crate::test_utils::test_db().await;
        AdminService::new(db.clone())
            .create(IDENTITY, PASSWORD)
            .await
            .unwrap();
        let signer = Arc::new(test_signer());
        let verifier = Arc::new(CredentialVerifier::new(db.clone(), signer.clone()).unwrap());
        let state = Arc::new(AppState {
            db,
            signer,
            verifier,
            cookie: SessionCookie {
                name: "token".into(),
                secure: false,
            },
        });
        (build_router(state.clone(), CorsLayer::permissive()), state)
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn with_bearer(mut request: Request<Body>, token: &str) -> Request<Body> {
        request.headers_mut().insert(
            header::AUTHORIZATION,
            format!("Bearer {token}").parse().unwrap(),
        );
        request
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn admin_token(signer: &TokenSigner) -> String {
        signer.issue(IDENTITY, "admin").token
    }

    fn artist_body(name: &str) -> Value {
        json!({
            "name": name,
            "bio": "Played the first warehouse parties in town.",
            "category": "pioneers",
            "image": "/images/artists/full.jpg",
            "thumbnail": "/images/artists/thumb.jpg",
            "stats": {"yearsActive": 10, "tracksReleased": 40, "streams": 200000},
            "socialLinks": {"instagram": "https://instagram.com/artist"}
        })
    }

    #[tokio::test]
    async fn test_login_cookie_passes_session_guard() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            json_request(
                Method::POST,
                "/login",
                json!({"email": IDENTITY, "password": PASSWORD}),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));
        assert!(set_cookie.contains("Path=/"));
        assert!(set_cookie.contains("Max-Age=3600"));
        let cookie_pair = set_cookie.split(';').next().unwrap().to_string();

        let body = body_json(response).await;
        assert_eq!(body["identity"], IDENTITY);
        assert_eq!(body["role"], "admin");

        let response = send(&app, get_with_cookie("/admin/session", &cookie_pair)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["identity"], IDENTITY);
    }

    #[tokio::test]
    async fn test_failed_logins_look_the_same() {
        let (app, _) = test_app().await;

        let wrong = send(
            &app,
            json_request(
                Method::POST,
                "/login",
                json!({"identity": IDENTITY, "secret": "wrong-password"}),
            ),
        )
        .await;
        let unknown = send(
            &app,
            json_request(
                Method::POST,
                "/login",
                json!({"identity": "nobody@example.com", "secret": PASSWORD}),
            ),
        )
        .await;

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
        assert!(wrong.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_json(wrong).await, body_json(unknown).await);
    }

    #[tokio::test]
    async fn test_guard_redirects_missing_and_expired_tokens_identically() {
        let (app, state) = test_app().await;

        let missing = send(&app, get("/admin/session")).await;

        let issued = state.signer.issue(IDENTITY, "admin");
        let expired = state.signer.sign(&Claims {
            iat: issued.claims.iat - 7200,
            exp: issued.claims.iat - 3600,
            ..issued.claims
        });
        let expired = send(
            &app,
            get_with_cookie("/admin/session", &format!("token={expired}")),
        )
        .await;

        for response in [&missing, &expired] {
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
            assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/admin");
        }

        let unknown_admin_page = send(&app, get("/admin/anything")).await;
        assert_eq!(unknown_admin_page.status(), StatusCode::SEE_OTHER);

        let login_page = send(&app, get("/admin")).await;
        assert_eq!(login_page.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_mutations_require_admin_token() {
        let (app, state) = test_app().await;

        let response = send(
            &app,
            json_request(Method::POST, "/artists", artist_body("No Cookie")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let editor = state.signer.issue("writer@example.com", "editor").token;
        let response = send(
            &app,
            with_bearer(
                json_request(Method::POST, "/artists", artist_body("Editor")),
                &editor,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let token = admin_token(&state.signer);
        let response = send(
            &app,
            with_bearer(
                json_request(Method::POST, "/artists", artist_body("Admin")),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(
            body["stats"],
            json!({"yearsActive": 10, "tracksReleased": 40, "streams": 200000})
        );
        assert_eq!(body["category"], "pioneers");

        let listed = body_json(send(&app, get("/artists")).await).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_json_field_is_bad_request() {
        let (app, state) = test_app().await;
        let token = admin_token(&state.signer);

        let mut body = artist_body("Extra");
        body["nickname"] = json!("DJ");
        let response = send(
            &app,
            with_bearer(json_request(Method::POST, "/artists", body), &token),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            with_bearer(
                Request::builder()
                    .method(Method::POST)
                    .uri("/artists")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_public_reads_and_not_found() {
        let (app, _) = test_app().await;

        for uri in ["/artists", "/videos?category=all", "/events?status=upcoming", "/health"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }

        let settings = body_json(send(&app, get("/settings")).await).await;
        assert_eq!(settings["socialLinks"], json!([]));

        let response = send(&app, get("/artists/999")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, get("/videos?category=podcast")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, get("/nowhere")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_limit_and_path_id_are_json_validation_errors() {
        let (app, _) = test_app().await;

        for uri in [
            "/artists?limit=18446744073709551615",
            "/videos?limit=18446744073709551615",
            "/events?limit=9223372036854775808",
            "/videos?limit=-1",
        ] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["field"], "limit", "{uri}");
        }

        let response = send(&app, get("/videos?limit=9223372036854775807")).await;
        assert_eq!(response.status(), StatusCode::OK);

        for uri in ["/artists/abc", "/videos/1.5", "/events/99999999999999999999"] {
            let response = send(&app, get(uri)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_json(response).await["field"], "id", "{uri}");
        }
    }

    #[tokio::test]
    async fn test_referenced_artist_delete_conflicts() {
        let (app, state) = test_app().await;
        let token = admin_token(&state.signer);

        let artist = body_json(
            send(
                &app,
                with_bearer(
                    json_request(Method::POST, "/artists", artist_body("Owner")),
                    &token,
                ),
            )
            .await,
        )
        .await;
        let artist_id = artist["id"].as_i64().unwrap();

        let response = send(
            &app,
            with_bearer(
                json_request(
                    Method::POST,
                    "/videos",
                    json!({
                        "title": "Night Drive",
                        "artist": artist_id,
                        "youtubeId": "abc123",
                        "description": "Official video for the lead single.",
                        "thumbnail": "/images/videos/night-drive.jpg",
                        "category": "music"
                    }),
                ),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let video = body_json(response).await;
        assert_eq!(video["artist"]["name"], "Owner");

        let uri = format!("/artists/{artist_id}");
        let delete = |request: Request<Body>| with_bearer(request, &token);
        let response = send(
            &app,
            delete(
                Request::builder()
                    .method(Method::DELETE)
                    .uri(&uri)
                    .body(Body::empty())
                    .unwrap(),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = send(&app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_video_with_missing_artist_is_rejected() {
        let (app, state) = test_app().await;
        let token = admin_token(&state.signer);

        let response = send(
            &app,
            with_bearer(
                json_request(
                    Method::POST,
                    "/videos",
                    json!({
                        "title": "Orphan",
                        "artist": 77,
                        "youtubeId": "orphan",
                        "description": "No artist behind this one.",
                        "thumbnail": "/images/videos/orphan.jpg",
                        "category": "live"
                    }),
                ),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["field"], "artist");

        let listed = body_json(send(&app, get("/videos")).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn test_settings_save_then_read() {
        let (app, state) = test_app().await;
        let token = admin_token(&state.signer);

        let response = send(
            &app,
            with_bearer(
                json_request(
                    Method::POST,
                    "/settings",
                    json!({
                        "socialLinks": [{
                            "platform": "instagram",
                            "label": "Instagram",
                            "url": "https://instagram.com/promo"
                        }],
                        "getInTouch": {"email": "hello@example.com"}
                    }),
                ),
                &token,
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        let settings = body_json(send(&app, get("/settings")).await).await;
        assert_eq!(settings["socialLinks"][0]["platform"], "instagram");
        assert_eq!(settings["getInTouch"]["email"], "hello@example.com");
    }

    #[tokio::test]
    async fn test_logout_clears_cookie() {
        let (app, _) = test_app().await;

        let response = send(
            &app,
            Request::builder()
                .method(Method::POST)
                .uri("/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let set_cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("Max-Age=0"));
    }
}
