use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};

use mojung_auth::{IssuedToken, TokenPair};
use mojung_types::models::Identity;

pub const ACCESS_COOKIE: &str = "access_token_cookie";
pub const REFRESH_COOKIE: &str = "refresh_token_cookie";
/// Display-only copies of the token claims for the front-end. The server
/// never reads these back.
pub const ID_COOKIE: &str = "id";
pub const NAME_COOKIE: &str = "name";

const ALL_COOKIES: [&str; 4] = [ACCESS_COOKIE, REFRESH_COOKIE, ID_COOKIE, NAME_COOKIE];

pub fn tokens(jar: &CookieJar) -> (Option<String>, Option<String>) {
    (
        jar.get(ACCESS_COOKIE).map(|c| c.value().to_string()),
        jar.get(REFRESH_COOKIE).map(|c| c.value().to_string()),
    )
}

fn build(name: &'static str, value: String, expires_at: DateTime<Utc>, http_only: bool, secure: bool) -> Cookie<'static> {
    let remaining = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((name, value))
        .path("/")
        .http_only(http_only)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(remaining))
        .build()
}

/// The access cookie outlives its token and lasts until `session_end`, so an
/// expired access token still reaches the server and can be renewed.
pub fn with_access(jar: CookieJar, access: &IssuedToken, session_end: DateTime<Utc>, secure: bool) -> CookieJar {
    jar.add(build(ACCESS_COOKIE, access.token.clone(), session_end, true, secure))
}

/// Sets both token cookies plus the display cookies, all living as long as
/// the refresh token.
pub fn with_session(jar: CookieJar, pair: &TokenPair, identity: &Identity, secure: bool) -> CookieJar {
    let session_end = pair.refresh.claims.expires_at();
    with_access(jar, &pair.access, session_end, secure)
        .add(build(REFRESH_COOKIE, pair.refresh.token.clone(), session_end, true, secure))
        .add(build(ID_COOKIE, identity.id.to_string(), session_end, false, secure))
        .add(build(NAME_COOKIE, identity.name.clone(), session_end, false, secure))
}

pub fn cleared(mut jar: CookieJar) -> CookieJar {
    for name in ALL_COOKIES {
        jar = jar.remove(Cookie::build(name).path("/"));
    }
    jar
}
