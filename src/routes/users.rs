use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};

use super::{respond, ApiResult, AppState};
use crate::auth::AuthUser;
use crate::models::{ProfileRequest, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/login", post(login))
        .route("/user/fetch", get(fetch_user))
        .route("/user/update", put(update_user))
        .route("/user/delete", delete(delete_user))
}

async fn login(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    body: Option<Json<ProfileRequest>>,
) -> ApiResult<User> {
    let profile = body.map(|Json(p)| p).unwrap_or_default();
    let user = state.service.login(&user_id, profile).await?;
    respond(StatusCode::OK, "User logged in successfully", Some(user))
}

async fn fetch_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<User> {
    let user = state.service.fetch_user(&user_id).await?;
    respond(StatusCode::OK, "User fetched successfully", Some(user))
}

async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(profile): Json<ProfileRequest>,
) -> ApiResult<User> {
    let user = state.service.update_user(&user_id, profile).await?;
    respond(StatusCode::OK, "User updated successfully", Some(user))
}

async fn delete_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> ApiResult<()> {
    state.service.delete_user(&user_id).await?;
    respond(StatusCode::OK, "User deleted successfully", None)
}
