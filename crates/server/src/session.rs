//! Session cookie plumbing for handlers.
//!
//! The codec lives in `flagboard_api::session`; this module extracts the
//! cookie from requests and attaches the `Set-Cookie` header to responses.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderValue, header, request::Parts},
    response::Response,
};

use flagboard_api::session::{SESSION_COOKIE, SessionData};

use crate::AppConfig;

/// Session extractor. Never rejects: a missing, malformed, or tampered
/// cookie yields an empty session.
pub struct Session(pub SessionData);

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);
        Ok(Session(from_parts(parts, &config.session_secret)))
    }
}

/// Decode the session from request parts.
pub fn from_parts(parts: &Parts, secret: &str) -> SessionData {
    parts
        .headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|cookies| find_cookie(cookies, SESSION_COOKIE))
        .map(|value| SessionData::decode(value, secret))
        .unwrap_or_default()
}

/// Attach the (re-signed) session cookie to a response.
pub fn save(session: &SessionData, secret: &str, mut resp: Response) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_COOKIE,
        session.encode(secret)
    );
    // Cookie value is base64url — always valid ASCII.
    let value = HeaderValue::from_str(&cookie).expect("session cookie is ASCII");
    resp.headers_mut().append(header::SET_COOKIE, value);
    resp
}

fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.split_once('=').filter(|(k, _)| *k == name).map(|(_, v)| v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let header = "theme=dark; flagboard_session=abc.def; other=1";
        assert_eq!(find_cookie(header, SESSION_COOKIE), Some("abc.def"));
    }

    #[test]
    fn missing_cookie_is_none() {
        assert_eq!(find_cookie("theme=dark", SESSION_COOKIE), None);
        assert_eq!(find_cookie("", SESSION_COOKIE), None);
    }

    #[test]
    fn save_appends_set_cookie() {
        let mut session = SessionData::default();
        session.login("u-1");
        let resp = save(
            &session,
            "secret",
            axum::response::IntoResponse::into_response("ok"),
        );
        let header = resp
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(header.starts_with("flagboard_session="));
        assert!(header.contains("HttpOnly"));

        let value = header
            .strip_prefix("flagboard_session=")
            .unwrap()
            .split(';')
            .next()
            .unwrap();
        let decoded = SessionData::decode(value, "secret");
        assert_eq!(decoded.user_id.as_deref(), Some("u-1"));
    }
}
