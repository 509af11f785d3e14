use axum::http::{header, HeaderMap, HeaderValue};
use uuid::Uuid;

/// Header carrying the authenticated user id, set by the upstream auth
/// layer. This service consumes identity, it never mints it.
pub const USER_HEADER: &str = "x-user-id";

pub const SESSION_COOKIE: &str = "sid";
const SESSION_COOKIE_MAX_AGE: u32 = 60 * 60 * 24 * 365;

/// Resolves the authenticated identity for a request, if any.
///
/// Kept as a trait so tests can swap in a fixed resolver and so a real
/// session lookup can replace the header source without touching handlers.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> Option<String>;
}

/// Production resolver: trusts the user id header from the auth proxy.
pub struct HeaderIdentity;

impl IdentityResolver for HeaderIdentity {
    fn resolve(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Anonymous session id for the share feature. Returns the id and whether
/// it was freshly minted; a fresh id must be attached to the response as a
/// cookie so repeat requests from the same client stay in one session.
pub fn resolve_session(headers: &HeaderMap) -> (String, bool) {
    if let Some(sid) = session_from_cookies(headers) {
        return (sid, false);
    }
    (Uuid::new_v4().to_string(), true)
}

fn session_from_cookies(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(SESSION_COOKIE) {
            let value = parts.next().unwrap_or("");
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// Set-Cookie value for a new session id. None only if the id contains
/// characters invalid in a header, which a UUID never does.
pub fn session_cookie(session_id: &str) -> Option<HeaderValue> {
    let cookie = format!(
        "{SESSION_COOKIE}={session_id}; Path=/; Max-Age={SESSION_COOKIE_MAX_AGE}; HttpOnly; SameSite=Lax"
    );
    HeaderValue::try_from(cookie).ok()
}
