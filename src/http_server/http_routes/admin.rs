use axum::{Extension, Json, response::Html};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::token::Claims;

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
  <head><title>Admin login</title></head>
  <body>
    <form id="login">
      <input name="identity" type="text" autocomplete="username" required>
      <input name="secret" type="password" autocomplete="current-password" required>
      <button type="submit">Sign in</button>
    </form>
    <script>
      document.getElementById("login").addEventListener("submit", async (e) => {
        e.preventDefault();
        const form = new FormData(e.target);
        const res = await fetch("/login", {
          method: "POST",
          headers: { "Content-Type": "application/json" },
          body: JSON.stringify({ identity: form.get("identity"), secret: form.get("secret") }),
        });
        if (res.ok) window.location.assign("/admin/session");
      });
    </script>
  </body>
</html>
"#;

/// Login entry point. Rendering proper lives in the front end.
pub async fn login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    identity: String,
    role: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Behind the session guard, which has already put the claims in place.
pub async fn session(Extension(claims): Extension<Claims>) -> Json<SessionView> {
    Json(SessionView {
        expires_at: claims.expires_at(),
        identity: claims.sub,
        role: claims.role,
    })
}
