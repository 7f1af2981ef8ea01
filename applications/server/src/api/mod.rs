/// API route modules
pub mod health;
pub mod users;

use crate::state::AppState;
use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

/// Build the HTTP router over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/user", post(users::create_user))
        .route("/user/:id", get(users::get_user))
        .route("/user/:id/password", put(users::update_password))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}
