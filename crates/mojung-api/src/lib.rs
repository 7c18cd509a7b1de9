pub mod auth;
pub mod board;
pub mod cookies;
pub mod error;
pub mod feed;
pub mod messages;
pub mod middleware;
pub mod votes;

use axum::{
    Router,
    routing::{get, post},
};

use crate::auth::AppState;

/// All board routes. Posting and voting sit behind the session middleware;
/// everything else checks credentials itself or needs none.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/users/register", post(auth::register))
        .route("/users/check-id", post(auth::check_id))
        .route("/users/login", post(auth::login))
        .route("/users/logout", get(auth::logout))
        .route("/auth/check", get(auth::check_session))
        .route("/auth/refresh", get(auth::refresh))
        .route("/mainBoard", get(board::main_board))
        .route("/health", get(board::health));

    let protected_routes = Router::new()
        .route("/messages", post(messages::create_message))
        .route("/votes", post(votes::create_vote))
        .route("/votes/{vote_id}/options/{option_id}", post(votes::cast_ballot))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
