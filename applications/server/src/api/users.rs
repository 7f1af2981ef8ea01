/// User API routes
use crate::{error::Result, error::ServerError, state::AppState};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use persona_core::{CreateUser, PasswordUpdate, PasswordUpdated, User, UserId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Ids are assigned by the backend; a client-supplied one is rejected
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    pub username: String,
    pub name: String,
    pub surname: String,
    pub age: i32,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub password: String,
    pub new_password: String,
}

/// GET /user/:id
pub async fn get_user(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<User>> {
    let user = app_state.users.get_by_id(&UserId::parse(&id)).await?;
    Ok(Json(user))
}

/// POST /user
pub async fn create_user(
    State(app_state): State<AppState>,
    payload: std::result::Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<User>> {
    let Json(req) = payload?;
    if req.id.is_some() {
        return Err(ServerError::BadRequest(
            "id is assigned by the server and must not be sent".to_string(),
        ));
    }

    let user = app_state
        .users
        .create(CreateUser {
            username: req.username,
            name: req.name,
            surname: req.surname,
            age: req.age,
            password: req.password,
        })
        .await?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(Json(user))
}

/// PUT /user/:id/password
/// Replace the password after checking the current one
pub async fn update_password(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
    payload: std::result::Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Json<PasswordUpdated>> {
    let Json(req) = payload?;
    let updated = app_state
        .users
        .update_password(PasswordUpdate {
            id: UserId::parse(&id),
            password: req.password,
            new_password: req.new_password,
        })
        .await?;

    Ok(Json(updated))
}
