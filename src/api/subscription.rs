use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::models::subscription::{self, Entity as Subscription, SubscriptionDto};
use crate::services::subscription_service;

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
    pub is_active: Option<bool>,
}

const BILLING_CYCLES: [&str; 5] = ["daily", "weekly", "monthly", "quarterly", "yearly"];

pub async fn list_subscriptions(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut condition = Condition::all().add(subscription::Column::UserId.eq(query.user_id));
    if let Some(is_active) = query.is_active {
        condition = condition.add(subscription::Column::IsActive.eq(is_active));
    }

    let subscriptions = Subscription::find()
        .filter(condition)
        .order_by_asc(subscription::Column::NextBillingDate)
        .all(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "subscriptions": subscriptions })))
}

pub async fn create_subscription(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<SubscriptionDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than 0".to_string(),
        ));
    }
    if !BILLING_CYCLES.contains(&payload.billing_cycle.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Invalid billing cycle: {}", payload.billing_cycle),
        ));
    }

    // First billing lands one cycle after the start date
    let start = NaiveDate::parse_from_str(&payload.start_date, "%Y-%m-%d")
        .map_err(|_| (StatusCode::BAD_REQUEST, "Invalid start_date".to_string()))?;
    let next_billing =
        subscription_service::advance_billing_date(start, &payload.billing_cycle)
            .format("%Y-%m-%d")
            .to_string();

    let now = Utc::now().to_rfc3339();
    let model = subscription::ActiveModel {
        user_id: Set(payload.user_id),
        name: Set(payload.name),
        description: Set(payload.description),
        amount: Set(payload.amount),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".to_string())),
        billing_cycle: Set(payload.billing_cycle),
        start_date: Set(payload.start_date),
        next_billing_date: Set(next_billing),
        end_date: Set(payload.end_date),
        category: Set(payload.category),
        payment_method: Set(payload.payment_method),
        is_active: Set(true),
        reminder_days: Set(payload.reminder_days),
        notes: Set(payload.notes),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = model
        .insert(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "subscription": saved }))))
}

pub async fn get_subscription(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Subscription::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Subscription not found".to_string()))?;

    Ok(Json(json!({ "subscription": found })))
}

#[derive(Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub name: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub reminder_days: Option<i32>,
    pub notes: Option<String>,
    pub is_active: Option<bool>,
    pub end_date: Option<String>,
}

pub async fn update_subscription(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Subscription::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Subscription not found".to_string()))?;

    let mut active: subscription::ActiveModel = found.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(amount) = payload.amount {
        if amount <= 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Amount must be greater than 0".to_string(),
            ));
        }
        active.amount = Set(amount);
    }
    if payload.category.is_some() {
        active.category = Set(payload.category);
    }
    if payload.payment_method.is_some() {
        active.payment_method = Set(payload.payment_method);
    }
    if payload.reminder_days.is_some() {
        active.reminder_days = Set(payload.reminder_days);
    }
    if payload.notes.is_some() {
        active.notes = Set(payload.notes);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    if payload.end_date.is_some() {
        active.end_date = Set(payload.end_date);
    }
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "subscription": updated })))
}

pub async fn delete_subscription(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let res = Subscription::delete_by_id(id)
        .exec(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if res.rows_affected == 0 {
        return Err((StatusCode::NOT_FOUND, "Subscription not found".to_string()));
    }
    Ok(Json(json!({ "message": "Subscription deleted" })))
}

pub async fn get_summary(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let summary = subscription_service::get_summary(&db, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "summary": summary })))
}
