use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sea_orm::*;
use serde_json::json;

use crate::models::category::{self, CategoryDto, Entity as Category};

pub async fn list_categories(State(db): State<DatabaseConnection>) -> impl IntoResponse {
    let categories = Category::find()
        .order_by_asc(category::Column::Name)
        .all(&db)
        .await
        .unwrap_or(vec![]);
    (StatusCode::OK, Json(categories)).into_response()
}

pub async fn create_category(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CategoryDto>,
) -> impl IntoResponse {
    if payload.kind != "expense" && payload.kind != "income" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "kind must be 'expense' or 'income'" })),
        )
            .into_response();
    }

    let now = chrono::Utc::now().to_rfc3339();
    let model = category::ActiveModel {
        name: Set(payload.name),
        kind: Set(payload.kind),
        icon: Set(payload.icon),
        color: Set(payload.color),
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

pub async fn get_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let found = Category::find_by_id(id).one(&db).await.unwrap_or(None);
    match found {
        Some(c) => (StatusCode::OK, Json(c)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Category not found" })),
        )
            .into_response(),
    }
}

pub async fn delete_category(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> impl IntoResponse {
    let found = Category::find_by_id(id).one(&db).await.unwrap_or(None);
    match found {
        Some(c) => match c.delete(&db).await {
            Ok(_) => (
                StatusCode::OK,
                Json(json!({ "message": "Category deleted" })),
            )
                .into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response(),
        },
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Category not found" })),
        )
            .into_response(),
    }
}
