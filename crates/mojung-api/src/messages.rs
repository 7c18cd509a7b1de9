use axum::{
    Extension, Json, extract::State, extract::rejection::JsonRejection, http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;

use mojung_types::api::{CreateMessageRequest, CreatedResponse, Envelope};
use mojung_types::models::Identity;

use crate::auth::AppState;
use crate::error::{ApiError, json_body, run_blocking};

/// The author is always the verified caller, never a field of the body.
pub async fn create_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = json_body(body)?;
    let db = state.clone();
    let author = identity.id;
    let id = run_blocking(move || {
        db.db
            .create_message(author, &req.recipient, &req.content, Utc::now())
    })
    .await?;

    info!("Message {} posted by {}", id, identity.name);
    Ok((StatusCode::CREATED, Json(Envelope::success(CreatedResponse { id }))))
}
