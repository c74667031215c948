use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Datelike, Local, NaiveDate, Utc};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::models::budget::{self, BudgetDto, Entity as Budget};
use crate::services::budget_service;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

pub async fn list_budgets(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let budgets = Budget::find()
        .filter(budget::Column::UserId.eq(query.user_id))
        .order_by_asc(budget::Column::StartDate)
        .all(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "budgets": budgets })))
}

/// Derive the period's end date when the caller doesn't set one.
fn default_end_date(start: &str, period_type: &str) -> Option<String> {
    let start = NaiveDate::parse_from_str(start, "%Y-%m-%d").ok()?;
    let end = match period_type {
        "weekly" => start + chrono::Duration::days(6),
        "monthly" => {
            let first_next = if start.month() == 12 {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)?
            };
            first_next - chrono::Duration::days(1)
        }
        "quarterly" => start + chrono::Duration::days(89),
        "yearly" => NaiveDate::from_ymd_opt(start.year() + 1, start.month(), start.day().min(28))?
            - chrono::Duration::days(1),
        _ => return None,
    };
    Some(end.format("%Y-%m-%d").to_string())
}

pub async fn create_budget(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<BudgetDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Budget amount must be greater than 0".to_string(),
        ));
    }

    let end_date = match payload.end_date {
        Some(end) => end,
        None => default_end_date(&payload.start_date, &payload.period_type).ok_or((
            StatusCode::BAD_REQUEST,
            "end_date is required for custom periods".to_string(),
        ))?,
    };

    let now = Utc::now().to_rfc3339();
    let model = budget::ActiveModel {
        user_id: Set(payload.user_id),
        category_id: Set(payload.category_id),
        amount: Set(payload.amount),
        spent_amount: Set(0.0),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".to_string())),
        period_type: Set(payload.period_type),
        start_date: Set(payload.start_date),
        end_date: Set(end_date),
        alert_threshold: Set(payload.alert_threshold),
        is_active: Set(true),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = model
        .insert(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "budget": saved }))))
}

pub async fn get_budget(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let found = Budget::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(crate::services::ServiceError::NotFound))?;

    // Refresh the spent amount on read
    let refreshed = budget_service::recompute_spent(&db, found)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "budget": refreshed })))
}

#[derive(Deserialize)]
pub struct UpdateBudgetRequest {
    pub amount: Option<f64>,
    pub category_id: Option<i32>,
    pub alert_threshold: Option<f64>,
    pub is_active: Option<bool>,
    pub end_date: Option<String>,
}

pub async fn update_budget(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBudgetRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Budget::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Budget not found".to_string()))?;

    let mut active: budget::ActiveModel = found.into();
    if let Some(amount) = payload.amount {
        if amount <= 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Budget amount must be greater than 0".to_string(),
            ));
        }
        active.amount = Set(amount);
    }
    if payload.category_id.is_some() {
        active.category_id = Set(payload.category_id);
    }
    if payload.alert_threshold.is_some() {
        active.alert_threshold = Set(payload.alert_threshold);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(end_date) = payload.end_date {
        active.end_date = Set(end_date);
    }
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "budget": updated })))
}

pub async fn delete_budget(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let res = Budget::delete_by_id(id)
        .exec(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if res.rows_affected == 0 {
        return Err((StatusCode::NOT_FOUND, "Budget not found".to_string()));
    }
    Ok(Json(json!({ "message": "Budget deleted" })))
}

pub async fn get_performance(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let performances = budget_service::get_performance(&db, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "performance": performances,
        "as_of": Local::now().format("%Y-%m-%d").to_string(),
    })))
}
