use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use mojung_auth::SessionManager;
use mojung_auth::password::hash_password;
use mojung_db::Database;
use mojung_types::api::{
    CheckIdRequest, CheckIdResponse, Envelope, LoginRequest, LoginResponse, RefreshResponse,
    RegisterRequest, SessionResponse,
};
use mojung_types::error::ValidationError;

use crate::cookies;
use crate::error::{ApiError, json_body, run_blocking};
use crate::middleware::reject;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionManager,
    pub page_size: u64,
    pub secure_cookies: bool,
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    let user_id = ValidationError::require("userId", &req.user_id)?.to_string();
    let name = ValidationError::require("name", &req.name)?.to_string();
    if req.password.is_empty() {
        return Err(ValidationError::EmptyField("password").into());
    }

    let db = state.clone();
    let handle = user_id.clone();
    run_blocking(move || {
        let password_hash = hash_password(&req.password)?;
        db.db
            .create_user(Uuid::new_v4(), &handle, &name, &password_hash, Utc::now())
    })
    .await?;

    info!("Registered user {}", user_id);
    Ok((StatusCode::CREATED, Json(Envelope::done("registration complete"))))
}

/// Duplicate handles are a normal answer, not a failure.
pub async fn check_id(
    State(state): State<AppState>,
    body: Result<Json<CheckIdRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    let user_id = ValidationError::require("userId", &req.user_id)?.to_string();

    let db = state.clone();
    let taken = run_blocking(move || Ok(db.db.user_id_exists(&user_id)?)).await?;

    let message = if taken {
        "this id is already taken"
    } else {
        "this id is available"
    };
    Ok(Json(
        Envelope::success(CheckIdResponse { available: !taken }).with_message(message),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    let handle = ValidationError::require("userId", &req.user_id)?.to_string();
    if req.password.is_empty() {
        return Err(ValidationError::EmptyField("password").into());
    }

    let db = state.clone();
    let lookup = handle.clone();
    let pair = run_blocking(move || {
        let account = db.db.find_active_user(&lookup)?;
        db.sessions.login(account.as_ref(), &req.password)
    })
    .await
    .inspect_err(|e| info!("Failed login for '{}': {}", handle, e.code()))?;

    let identity = pair.access.claims.identity();
    info!("{} ({}) logged in", identity.name, identity.id);

    let jar = cookies::with_session(jar, &pair, &identity, state.secure_cookies);
    Ok((
        jar,
        Json(Envelope::success(LoginResponse {
            id: identity.id,
            name: identity.name,
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
        })),
    ))
}

/// Reports the session state without renewing anything, so the client can
/// offer to extend an expired access token.
pub async fn check_session(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (access, refresh) = cookies::tokens(&jar);
    match state.sessions.validate(access.as_deref(), refresh.as_deref()) {
        Ok(identity) => Json(
            Envelope::success(SessionResponse {
                id: identity.id,
                name: identity.name,
            })
            .with_message("session is valid"),
        )
        .into_response(),
        Err(e) => reject(jar, e.into()),
    }
}

pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let (_, refresh) = cookies::tokens(&jar);
    match state.sessions.refresh(refresh.as_deref()) {
        Ok(renewal) => {
            let body = RefreshResponse {
                access_token: renewal.access.token.clone(),
                expires_at: renewal.access.claims.expires_at(),
            };
            (
                cookies::with_access(jar, &renewal.access, renewal.session_end, state.secure_cookies),
                Json(Envelope::success(body)),
            )
                .into_response()
        }
        Err(e) => reject(jar, ApiError(e)),
    }
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    state.sessions.logout();
    (cookies::cleared(jar), Json(Envelope::done("logged out")))
}
