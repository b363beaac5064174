//! Principal resolution for inbound requests.
//!
//! The authentication provider issues session tokens; this module only reads
//! them. A token arrives in the session cookie or, for non-browser callers,
//! as an `Authorization: Bearer` header.

use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::HeaderMap;
use chrono::Utc;
use serde::Serialize;

use crate::db::{DbError, TestimonialDb};
use crate::error::ServiceError;

/// The authenticated user on whose behalf a request is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Principal {
    pub id: String,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Extract the session token from the request headers.
///
/// The cookie wins when both are present.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| crate::util::cookie_value(header, cookie_name));
    if let Some(token) = from_cookie.filter(|t| !t.is_empty()) {
        return Some(token.to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Resolve the acting principal, or `None` when there is no live session.
pub fn resolve_principal(
    db: &TestimonialDb,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Result<Option<Principal>, DbError> {
    let Some(token) = session_token(headers, cookie_name) else {
        return Ok(None);
    };
    Ok(db.resolve_session(&token, Utc::now())?.map(Principal::new))
}

/// Like [`resolve_principal`], but a missing principal is an error. Mutations
/// never fall back to an empty scope.
pub fn require_principal(
    db: &TestimonialDb,
    headers: &HeaderMap,
    cookie_name: &str,
) -> Result<Principal, ServiceError> {
    resolve_principal(db, headers, cookie_name)?.ok_or(ServiceError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use chrono::Duration;

    use super::*;
    use crate::db::test_utils::{seed_user, test_db};

    const COOKIE_NAME: &str = "testimonials.session_token";

    fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_token_from_cookie() {
        let h = headers(&[(COOKIE, "theme=dark; testimonials.session_token=tok-1")]);
        assert_eq!(session_token(&h, COOKIE_NAME).as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_token_from_second_cookie_header() {
        let h = headers(&[(COOKIE, "theme=dark"), (COOKIE, "testimonials.session_token=tok-2")]);
        assert_eq!(session_token(&h, COOKIE_NAME).as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let h = headers(&[(AUTHORIZATION, "Bearer tok-3")]);
        assert_eq!(session_token(&h, COOKIE_NAME).as_deref(), Some("tok-3"));

        let h = headers(&[(AUTHORIZATION, "Basic dXNlcjpwYXNz")]);
        assert_eq!(session_token(&h, COOKIE_NAME), None);
    }

    #[test]
    fn test_cookie_preferred_over_bearer() {
        let h = headers(&[
            (COOKIE, "testimonials.session_token=from-cookie"),
            (AUTHORIZATION, "Bearer from-header"),
        ]);
        assert_eq!(session_token(&h, COOKIE_NAME).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_resolve_principal_from_session() {
        let db = test_db();
        seed_user(&db, "u1");
        db.create_session("tok-1", "u1", Utc::now() + Duration::hours(1))
            .unwrap();

        let h = headers(&[(COOKIE, "testimonials.session_token=tok-1")]);
        let principal = resolve_principal(&db, &h, COOKIE_NAME).unwrap();
        assert_eq!(principal, Some(Principal::new("u1")));
    }

    #[test]
    fn test_require_principal_rejects_missing_session() {
        let db = test_db();
        let err = require_principal(&db, &HeaderMap::new(), COOKIE_NAME).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));

        let h = headers(&[(COOKIE, "testimonials.session_token=forged")]);
        let err = require_principal(&db, &h, COOKIE_NAME).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
    }
}
