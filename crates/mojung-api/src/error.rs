use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{debug, error};

use mojung_types::api::Envelope;
use mojung_types::error::{
    AuthError, BoardError, BoardResult, ConflictError, IntegrityError, ValidationError,
};

/// Handler error: any board error, rendered as a `fail` envelope.
#[derive(Debug)]
pub struct ApiError(pub BoardError);

impl<E> From<E> for ApiError
where
    E: Into<BoardError>,
{
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BoardError::Auth(_) => StatusCode::UNAUTHORIZED,
            BoardError::Validation(_) => StatusCode::BAD_REQUEST,
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::Conflict(_) => StatusCode::CONFLICT,
            BoardError::Integrity(_) | BoardError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match &self.0 {
            BoardError::Auth(e) => match e {
                AuthError::MissingCredentials => "LOGIN_REQUIRED",
                AuthError::InvalidToken => "INVALID_SESSION",
                AuthError::AccessExpired => "ACCESS_EXPIRED",
                AuthError::SessionExpired => "SESSION_EXPIRED",
                AuthError::BadPassword | AuthError::NotFound => "INVALID_CREDENTIALS",
            },
            BoardError::Validation(e) => match e {
                ValidationError::EmptyField(_) => "EMPTY_FIELD",
                ValidationError::DuplicateOption(_) => "DUPLICATE_OPTION",
                ValidationError::InvalidOption => "INVALID_OPTION",
                ValidationError::InvalidPage => "INVALID_PAGE",
                ValidationError::MalformedBody(_) => "MALFORMED_REQUEST",
            },
            BoardError::Conflict(e) => match e {
                ConflictError::AlreadyVoted => "ALREADY_VOTED",
                ConflictError::UserIdTaken => "USER_ID_TAKEN",
            },
            BoardError::NotFound(_) => "NOT_FOUND",
            BoardError::Integrity(IntegrityError::PartialWrite { .. }) => "PARTIAL_WRITE",
            BoardError::Integrity(IntegrityError::DanglingReference { .. }) => "INTEGRITY_FAULT",
            BoardError::Storage(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // Internal detail stays in the logs.
        let message = match &self.0 {
            BoardError::Integrity(IntegrityError::PartialWrite { post_id }) => {
                error!("Partial write for post {}", post_id);
                "your post was saved but may not appear on the board yet".to_string()
            }
            BoardError::Integrity(e) => {
                error!("Integrity fault: {}", e);
                "something went wrong, please try again".to_string()
            }
            BoardError::Storage(e) => {
                error!("Storage failure: {:#}", e);
                "something went wrong, please try again".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(Envelope::fail(code, message))).into_response()
    }
}

/// Unwraps a JSON body extracted as `Result`, so unreadable input gets a
/// `fail` envelope instead of axum's plain-text rejection.
pub fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            let detail = rejection.body_text();
            debug!("Rejected request body ({}): {}", rejection.status(), detail);
            Err(ValidationError::MalformedBody(detail).into())
        }
    }
}

/// Runs blocking work (SQLite, Argon2) off the async runtime.
pub async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> BoardResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError(anyhow::anyhow!("blocking task failed: {}", e).into())
        })?
        .map_err(ApiError)
}
