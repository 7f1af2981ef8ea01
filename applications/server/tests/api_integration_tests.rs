/// API integration tests
/// Tests complete HTTP request/response cycles against the in-memory backend
mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::DateTime;
use common::{body_json, create_test_app, fixtures, get, send_json};
use serde_json::json;
use tower::util::ServiceExt;

/// Test GET /health reports the active backend
#[tokio::test]
async fn test_health() {
    let app = create_test_app();

    let response = get(&app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["backend"], "memory");
    assert!(body["version"].is_string());
}

/// Test POST /user then GET /user/:id
#[tokio::test]
async fn test_create_and_get_user() {
    let app = create_test_app();

    let response = send_json(&app, "POST", "/user", &fixtures::user()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;

    assert!(!created["id"].is_null());
    assert_eq!(created["username"], "the_user_name");
    assert_eq!(created["age"], 42);
    assert_eq!(created["password"], "the_password");
    assert_eq!(created["createdAt"], created["updatedAt"]);
    assert!(DateTime::parse_from_rfc3339(created["createdAt"].as_str().unwrap()).is_ok());

    let response = get(&app, &format!("/user/{}", created["id"])).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, created);
}

/// Test GET for an id that was never assigned
#[tokio::test]
async fn test_get_unknown_user_is_404() {
    let app = create_test_app();

    let response = get(&app, "/user/-1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["error"], "User with id -1 not found");
}

/// Test POST with a client-supplied id
#[tokio::test]
async fn test_create_with_id_is_rejected() {
    let app = create_test_app();

    let mut user = fixtures::user();
    user["id"] = json!(7);

    let response = send_json(&app, "POST", "/user", &user).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

/// Test PUT /user/:id/password success path
#[tokio::test]
async fn test_update_password() {
    let app = create_test_app();

    let created = body_json(send_json(&app, "POST", "/user", &fixtures::user()).await).await;
    let id = created["id"].clone();

    let response = send_json(
        &app,
        "PUT",
        &format!("/user/{id}/password"),
        &json!({ "password": "the_password", "newPassword": "new_password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "id": id }));

    let fetched = body_json(get(&app, &format!("/user/{id}")).await).await;
    assert_eq!(fetched["password"], "new_password");

    let created_at = DateTime::parse_from_rfc3339(fetched["createdAt"].as_str().unwrap()).unwrap();
    let updated_at = DateTime::parse_from_rfc3339(fetched["updatedAt"].as_str().unwrap()).unwrap();
    assert!(updated_at > created_at);
}

/// Test PUT with the wrong current password
#[tokio::test]
async fn test_update_password_mismatch_is_400() {
    let app = create_test_app();

    let created = body_json(send_json(&app, "POST", "/user", &fixtures::user()).await).await;
    let id = created["id"].clone();

    let response = send_json(
        &app,
        "PUT",
        &format!("/user/{id}/password"),
        &json!({ "password": "invalid_password", "newPassword": "new_password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let fetched = body_json(get(&app, &format!("/user/{id}")).await).await;
    assert_eq!(fetched["password"], "the_password");
}

/// Test PUT for an id that was never assigned
#[tokio::test]
async fn test_update_password_unknown_user_is_404() {
    let app = create_test_app();

    let response = send_json(
        &app,
        "PUT",
        "/user/-1/password",
        &json!({ "password": "the_password", "newPassword": "new_password" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// Test POST bodies that do not deserialize get the JSON error shape
#[tokio::test]
async fn test_create_with_malformed_body_is_400_json() {
    let app = create_test_app();

    let mut missing_field = fixtures::user();
    missing_field.as_object_mut().unwrap().remove("surname");

    let mut wrong_type = fixtures::user();
    wrong_type["age"] = json!("forty-two");

    for body in [missing_field, wrong_type] {
        let response = send_json(&app, "POST", "/user", &body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error = body_json(response).await;
        assert!(error["error"].is_string(), "unexpected body {error}");
    }
}

/// Test PUT with a body that is not JSON at all
#[tokio::test]
async fn test_update_password_with_invalid_json_is_400_json() {
    let app = create_test_app();

    let created = body_json(send_json(&app, "POST", "/user", &fixtures::user()).await).await;
    let request = Request::builder()
        .uri(format!("/user/{}/password", created["id"]))
        .method("PUT")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"password\": "))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}
