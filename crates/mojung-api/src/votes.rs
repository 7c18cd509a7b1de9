use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use mojung_types::api::{BallotResponse, CreateVoteRequest, CreatedResponse, Envelope};
use mojung_types::error::BoardError;
use mojung_types::models::Identity;

use crate::auth::AppState;
use crate::error::{ApiError, json_body, run_blocking};

pub async fn create_vote(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<CreateVoteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (title, options) = json_body(body)?.into_options();
    let option_count = options.len();

    let db = state.clone();
    let author = identity.id;
    let id = run_blocking(move || db.db.create_vote(author, &title, &options, Utc::now())).await?;

    info!("Poll {} with {} options created by {}", id, option_count, identity.name);
    Ok((StatusCode::CREATED, Json(Envelope::success(CreatedResponse { id }))))
}

/// One ballot per voter per poll; a repeat is answered with `ALREADY_VOTED`
/// and changes nothing. A vote id that is not even well-formed names no poll.
pub async fn cast_ballot(
    State(state): State<AppState>,
    path: Result<Path<(Uuid, String)>, PathRejection>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((vote_id, option_id)) = path.map_err(|e| {
        debug!("Unroutable ballot path: {}", e.body_text());
        ApiError(BoardError::NotFound("poll"))
    })?;

    let db = state.clone();
    let voter = identity.id;
    let choice = option_id.clone();
    run_blocking(move || db.db.cast_ballot(voter, vote_id, &choice, Utc::now()))
        .await
        .inspect_err(|e| debug!("Ballot by {} on {} refused: {}", voter, vote_id, e.code()))?;

    info!("{} voted '{}' on {}", identity.name, option_id, vote_id);
    Ok(Json(Envelope::success(BallotResponse { vote_id, option_id })))
}
