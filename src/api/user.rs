use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::*;
use serde_json::json;

use crate::models::user::{self, Entity as User, UserDto};

pub async fn list_users(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let users = User::find().all(&db).await.unwrap_or(vec![]);
    (StatusCode::OK, Json(users)).into_response()
}

pub async fn create_user(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<UserDto>,
) -> impl IntoResponse {
    if payload.username.trim().is_empty() || payload.email.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "username and email are required" })),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let model = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    match model.insert(&db).await {
        Ok(saved) => (StatusCode::CREATED, Json(saved)).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn get_user(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let found = User::find_by_id(id).one(&db).await.unwrap_or(None);
    match found {
        Some(u) => (StatusCode::OK, Json(u)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "User not found" })),
        )
            .into_response(),
    }
}
