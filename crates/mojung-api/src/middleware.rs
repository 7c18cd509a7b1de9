use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use mojung_auth::SessionState;
use mojung_types::error::BoardError;
use mojung_types::models::Identity;

use crate::auth::AppState;
use crate::cookies;
use crate::error::ApiError;

/// Validate the session cookies and put the caller's `Identity` in the
/// request extensions.
///
/// An expired or missing access token with a live refresh token is renewed
/// in place: the request proceeds and the response carries the new access
/// cookie.
/// Terminal failures also clear every session cookie.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let (access, refresh) = cookies::tokens(&jar);

    let mut renewed = None;
    let identity = match state.sessions.assess(access.as_deref(), refresh.as_deref()) {
        SessionState::AccessExpiredRefreshValid(identity) => {
            match state.sessions.refresh(refresh.as_deref()) {
                Ok(renewal) => {
                    debug!("Silently refreshed access token for {}", identity.id);
                    renewed = Some(renewal);
                    identity
                }
                Err(e) => return reject(jar, ApiError(e)),
            }
        }
        other => match other.into_result() {
            Ok(identity) => identity,
            Err(e) => return reject(jar, e.into()),
        },
    };

    req.extensions_mut().insert(identity);
    let response = next.run(req).await;

    match renewed {
        Some(renewal) => {
            let jar = cookies::with_access(jar, &renewal.access, renewal.session_end, state.secure_cookies);
            (jar, response).into_response()
        }
        None => response,
    }
}

/// Identity for optional-auth routes; anonymous when the cookies don't
/// amount to a live session.
pub fn viewer(state: &AppState, jar: &CookieJar) -> Option<Identity> {
    let (access, refresh) = cookies::tokens(jar);
    match state.sessions.assess(access.as_deref(), refresh.as_deref()) {
        SessionState::AccessValid(identity) | SessionState::AccessExpiredRefreshValid(identity) => {
            Some(identity)
        }
        _ => None,
    }
}

pub(crate) fn reject(jar: CookieJar, err: ApiError) -> Response {
    let terminal = matches!(&err.0, BoardError::Auth(e) if e.is_terminal());
    if terminal {
        (cookies::cleared(jar), err).into_response()
    } else {
        err.into_response()
    }
}
