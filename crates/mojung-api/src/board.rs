use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use tracing::debug;

use mojung_types::api::{BoardQuery, Envelope, PostView};
use mojung_types::error::ValidationError;

use crate::auth::AppState;
use crate::error::{ApiError, run_blocking};
use crate::feed::{FeedAggregator, FeedPage};
use crate::middleware::viewer;

/// GET /mainBoard?page=N
///
/// Readable without a session; logged-in viewers also see which option they
/// picked on each poll. An empty board and a page past the end are both
/// successful answers with no posts, told apart by `code`. A `page` that is
/// not a number is as invalid as one below 1.
pub async fn main_board(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<BoardQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Ok(Query(query)) = query else {
        return Err(ValidationError::InvalidPage.into());
    };
    let page = query.page.unwrap_or(1);
    let viewer_id = viewer(&state, &jar).map(|identity| identity.id);

    let db = state.clone();
    let feed = run_blocking(move || {
        FeedAggregator::new(&db.db).page(page, db.page_size, viewer_id)
    })
    .await?;

    let body = match feed {
        FeedPage::Posts(posts) => {
            debug!("Board page {} served {} posts", page, posts.len());
            Envelope::success(posts)
        }
        FeedPage::NoPosts => Envelope::success(Vec::<PostView>::new())
            .with_message("No post in the database.")
            .with_code("NO_POSTS"),
        FeedPage::OutOfRange => Envelope::success(Vec::<PostView>::new())
            .with_message("No posts found for the page.")
            .with_code("PAGE_OUT_OF_RANGE"),
    };
    Ok(Json(body))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
