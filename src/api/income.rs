use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::income::{self, Entity as Income, IncomeDto};

#[derive(Deserialize)]
pub struct IncomeQuery {
    pub user_id: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<i32>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn list_incomes(
    State(db): State<DatabaseConnection>,
    Query(query): Query<IncomeQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut condition = Condition::all()
        .add(income::Column::UserId.eq(query.user_id))
        .add(income::Column::DeletedAt.is_null());

    if let Some(start_date) = query.start_date {
        condition = condition.add(income::Column::IncomeDate.gte(start_date));
    }
    if let Some(end_date) = query.end_date {
        condition = condition.add(income::Column::IncomeDate.lte(end_date));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(income::Column::CategoryId.eq(category_id));
    }
    if let Some(min) = query.min_amount {
        condition = condition.add(income::Column::Amount.gte(min));
    }
    if let Some(max) = query.max_amount {
        condition = condition.add(income::Column::Amount.lte(max));
    }
    if let Some(search) = query.search {
        condition = condition.add(
            Condition::any()
                .add(income::Column::Source.contains(&search))
                .add(income::Column::Description.contains(&search)),
        );
    }

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let paginator = Income::find()
        .filter(condition)
        .order_by_desc(income::Column::IncomeDate)
        .paginate(&db, limit);

    let total = paginator
        .num_items()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    let items = paginator
        .fetch_page(page - 1)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let total_pages = total.div_ceil(limit);

    Ok(Json(json!({
        "income": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "total_pages": total_pages,
            "has_more": page < total_pages,
        }
    })))
}

pub async fn create_income(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<IncomeDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than 0".to_string(),
        ));
    }

    let is_recurring = payload.is_recurring.unwrap_or(false);
    if is_recurring && payload.recurring_frequency.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Recurring income needs a recurring_frequency".to_string(),
        ));
    }

    let next_occurrence = if is_recurring {
        Some(payload.income_date.clone())
    } else {
        None
    };

    let now = Utc::now().to_rfc3339();
    let model = income::ActiveModel {
        user_id: Set(payload.user_id),
        category_id: Set(payload.category_id),
        amount: Set(payload.amount),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".to_string())),
        source: Set(payload.source),
        description: Set(payload.description),
        income_date: Set(payload.income_date),
        payment_method: Set(payload.payment_method),
        notes: Set(payload.notes),
        is_recurring: Set(is_recurring),
        recurring_frequency: Set(payload.recurring_frequency),
        next_occurrence: Set(next_occurrence),
        deleted_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let saved = model
        .insert(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((StatusCode::CREATED, Json(json!({ "income": saved }))))
}

pub async fn get_income(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Income::find_by_id(id)
        .filter(income::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Income not found".to_string()))?;

    Ok(Json(json!({ "income": found })))
}

pub async fn update_income(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<IncomeDto>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Income::find_by_id(id)
        .filter(income::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Income not found".to_string()))?;

    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than 0".to_string(),
        ));
    }

    let mut active: income::ActiveModel = found.into();
    active.amount = Set(payload.amount);
    active.source = Set(payload.source);
    active.income_date = Set(payload.income_date);
    if let Some(currency) = payload.currency {
        active.currency = Set(currency);
    }
    if payload.category_id.is_some() {
        active.category_id = Set(payload.category_id);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if payload.payment_method.is_some() {
        active.payment_method = Set(payload.payment_method);
    }
    if payload.notes.is_some() {
        active.notes = Set(payload.notes);
    }
    active.updated_at = Set(Utc::now().to_rfc3339());

    let updated = active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "income": updated })))
}

pub async fn delete_income(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Income::find_by_id(id)
        .filter(income::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Income not found".to_string()))?;

    let now = Utc::now().to_rfc3339();
    let mut active: income::ActiveModel = found.into();
    active.deleted_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "message": "Income deleted" })))
}
