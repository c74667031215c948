use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::notification::{self, Entity as Notification};

#[derive(Deserialize)]
pub struct NotificationQuery {
    pub user_id: i32,
    pub unread_only: Option<bool>,
    pub limit: Option<u64>,
}

pub async fn list_notifications(
    State(db): State<DatabaseConnection>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut condition = Condition::all().add(notification::Column::UserId.eq(query.user_id));
    if query.unread_only.unwrap_or(false) {
        condition = condition.add(notification::Column::IsRead.eq(false));
    }

    let notifications = Notification::find()
        .filter(condition)
        .order_by_desc(notification::Column::CreatedAt)
        .limit(query.limit.unwrap_or(100))
        .all(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "notifications": notifications })))
}

pub async fn get_summary(
    State(db): State<DatabaseConnection>,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let notifications = Notification::find()
        .filter(notification::Column::UserId.eq(query.user_id))
        .all(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let total_count = notifications.len();
    let unread_count = notifications.iter().filter(|n| !n.is_read).count();

    let mut by_kind: std::collections::HashMap<String, u64> = Default::default();
    for n in &notifications {
        *by_kind.entry(n.kind.clone()).or_insert(0) += 1;
    }

    Ok(Json(json!({
        "unread_count": unread_count,
        "total_count": total_count,
        "by_kind": by_kind,
    })))
}

pub async fn mark_read(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Notification::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Notification not found".to_string()))?;

    if found.is_read {
        return Ok(Json(json!({ "notification": found })));
    }

    let mut active: notification::ActiveModel = found.into();
    active.is_read = Set(true);
    active.read_at = Set(Some(Utc::now().to_rfc3339()));
    let updated = active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "notification": updated })))
}

#[derive(Deserialize)]
pub struct UserBody {
    pub user_id: i32,
}

pub async fn mark_all_read(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<UserBody>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let now = Utc::now().to_rfc3339();
    let res = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .col_expr(notification::Column::ReadAt, Expr::value(Some(now)))
        .filter(notification::Column::UserId.eq(payload.user_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "marked_read": res.rows_affected })))
}

pub async fn delete_notification(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let res = Notification::delete_by_id(id)
        .exec(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if res.rows_affected == 0 {
        return Err((StatusCode::NOT_FOUND, "Notification not found".to_string()));
    }
    Ok(Json(json!({ "message": "Notification deleted" })))
}
