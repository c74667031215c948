use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::models::savings_contribution::ContributionDto;
use crate::models::savings_goal::{self, Entity as SavingsGoal, SavingsGoalDto};
use crate::services::savings_service;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

pub async fn list_goals(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let goals = SavingsGoal::find()
        .filter(savings_goal::Column::UserId.eq(query.user_id))
        .order_by_asc(savings_goal::Column::CreatedAt)
        .all(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "goals": goals })))
}

pub async fn create_goal(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<SavingsGoalDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    if payload.target_amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Target amount must be greater than 0".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let model = savings_goal::ActiveModel {
        user_id: Set(payload.user_id),
        name: Set(payload.name),
        description: Set(payload.description),
        target_amount: Set(payload.target_amount),
        current_amount: Set(0.0),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".to_string())),
        deadline: Set(payload.deadline),
        icon: Set(payload.icon),
        color: Set(payload.color),
        is_completed: Set(false),
        completed_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = model
        .insert(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "goal": saved }))))
}

pub async fn get_goal(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = SavingsGoal::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Goal not found".to_string()))?;

    Ok(Json(json!({ "goal": found })))
}

pub async fn update_goal(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<SavingsGoalDto>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = SavingsGoal::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Goal not found".to_string()))?;

    if payload.target_amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Target amount must be greater than 0".to_string(),
        ));
    }

    let current_amount = found.current_amount;
    let mut active: savings_goal::ActiveModel = found.into();
    active.name = Set(payload.name);
    active.target_amount = Set(payload.target_amount);
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if payload.deadline.is_some() {
        active.deadline = Set(payload.deadline);
    }
    if payload.icon.is_some() {
        active.icon = Set(payload.icon);
    }
    if payload.color.is_some() {
        active.color = Set(payload.color);
    }
    // Raising the target can re-open a completed goal
    if current_amount < payload.target_amount {
        active.is_completed = Set(false);
        active.completed_at = Set(None);
    }
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "goal": updated })))
}

pub async fn delete_goal(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let res = SavingsGoal::delete_by_id(id)
        .exec(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if res.rows_affected == 0 {
        return Err((StatusCode::NOT_FOUND, "Goal not found".to_string()));
    }
    Ok(Json(json!({ "message": "Goal deleted" })))
}

pub async fn add_contribution(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<ContributionDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let (contribution, goal) = savings_service::add_contribution(&db, id, payload)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "contribution": contribution, "goal": goal })),
    ))
}

pub async fn list_contributions(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let contributions = savings_service::list_contributions(&db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "contributions": contributions })))
}

pub async fn get_progress(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let progress = savings_service::get_progress(&db, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "progress": progress })))
}
