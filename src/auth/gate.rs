use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum_extra::extract::CookieJar;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};

use crate::auth::token::{Claims, TokenSigner};
use crate::entities::admin::Role;
use crate::error::{AppError, AppResult};
use crate::http_server::state::AppState;

/// Session token from the cookie, or from an `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    let from_cookie = jar
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty());
    from_cookie.or_else(|| {
        headers
            .typed_get::<Authorization<Bearer>>()
            .map(|auth| auth.token().to_string())
    })
}

/// Missing or invalid token is `Unauthorized`; a valid token with the wrong
/// role is `Forbidden`.
pub fn authorize(token: Option<&str>, signer: &TokenSigner, required: Role) -> AppResult<Claims> {
    let token = token.ok_or(AppError::Unauthorized)?;
    let claims = signer.verify(token).map_err(|e| {
        log::debug!("Rejected session token: {e}");
        AppError::Unauthorized
    })?;
    if claims.role != required.as_str() {
        log::warn!(
            "'{}' with role '{}' attempted a {} operation",
            claims.sub,
            claims.role,
            required.as_str()
        );
        return Err(AppError::Forbidden);
    }
    Ok(claims)
}

/// Extractor for handlers that mutate content. Rejects before the handler body
/// runs.
#[derive(Debug, Clone)]
pub struct AdminSession(pub Claims);

impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers, &state.cookie.name);
        authorize(token.as_deref(), &state.signer, Role::Admin).map(AdminSession)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::tests::test_signer;
    use axum::http::header;

    #[test]
    fn test_no_token_is_unauthorized() {
        let signer = test_signer();
        let err = authorize(None, &signer, Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_garbage_token_is_unauthorized() {
        let signer = test_signer();
        let err = authorize(Some("not.a.token"), &signer, Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_other_role_is_forbidden() {
        let signer = test_signer();
        let issued = signer.issue("writer@example.com", "editor");

        let err = authorize(Some(&issued.token), &signer, Role::Admin).unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[test]
    fn test_admin_token_is_authorized() {
        let signer = test_signer();
        let issued = signer.issue("owner@example.com", "admin");
        let claims = authorize(Some(&issued.token), &signer, Role::Admin).unwrap();
        assert_eq!(claims.sub, "owner@example.com");
    }

    #[test]
    fn test_token_sources() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers, "token"), None);

        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(
            session_token(&headers, "token").as_deref(),
            Some("abc.def.ghi")
        );

        headers.insert(header::COOKIE, "theme=dark; token=from-cookie".parse().unwrap());
        assert_eq!(
            session_token(&headers, "token").as_deref(),
            Some("from-cookie")
        );
    }
}
