/// Common test utilities and fixtures
use axum::{
    body::Body,
    http::{header, Request},
    response::Response,
    Router,
};
use persona_server::{api, state::AppState};
use persona_storage::InMemoryUserRepository;
use std::sync::Arc;
use tower::util::ServiceExt;

/// Router over a fresh in-memory repository
pub fn create_test_app() -> Router {
    api::router(AppState::new(Arc::new(InMemoryUserRepository::new())))
}

/// Send a JSON request through the router
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    body: &serde_json::Value,
) -> Response {
    let request = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap();

    app.clone().oneshot(request).await.unwrap()
}

/// Send a GET through the router
pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Parse a response body as JSON
pub async fn body_json(response: Response) -> serde_json::Value {
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body_bytes).unwrap()
}

/// Test fixtures
pub mod fixtures {
    pub fn user() -> serde_json::Value {
        serde_json::json!({
            "username": "the_user_name",
            "name": "The User",
            "surname": "Name",
            "age": 42,
            "password": "the_password"
        })
    }
}
