//! HTTP routes for refinement endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    accept_suggestions, finalize, get_session, start_refinement, submit_answers_and_continue,
    submit_answers_and_get_suggestions, RefinementHandlers,
};

/// Creates the refinement router, mounted under `/api/refine`.
pub fn refinement_routes(handlers: RefinementHandlers) -> Router {
    Router::new()
        .route("/start", post(start_refinement))
        .route("/submit_answers_and_continue", post(submit_answers_and_continue))
        .route(
            "/submit_answers_and_get_suggestions",
            post(submit_answers_and_get_suggestions),
        )
        .route("/accept_suggestions", post(accept_suggestions))
        .route("/finalize", post(finalize))
        .route("/sessions/:id", get(get_session))
        .with_state(handlers)
}
