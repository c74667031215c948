use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::expense::{self, Entity as Expense, ExpenseDto, UpdateExpenseDto};

#[derive(Deserialize)]
pub struct ExpenseQuery {
    pub user_id: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category_id: Option<i32>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub payment_method: Option<String>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

pub async fn list_expenses(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ExpenseQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut condition = Condition::all()
        .add(expense::Column::UserId.eq(query.user_id))
        .add(expense::Column::DeletedAt.is_null());

    if let Some(start_date) = query.start_date {
        condition = condition.add(expense::Column::ExpenseDate.gte(start_date));
    }
    if let Some(end_date) = query.end_date {
        condition = condition.add(expense::Column::ExpenseDate.lte(end_date));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(expense::Column::CategoryId.eq(category_id));
    }
    if let Some(min) = query.min_amount {
        condition = condition.add(expense::Column::Amount.gte(min));
    }
    if let Some(max) = query.max_amount {
        condition = condition.add(expense::Column::Amount.lte(max));
    }
    if let Some(method) = query.payment_method {
        condition = condition.add(expense::Column::PaymentMethod.eq(method));
    }
    if let Some(search) = query.search {
        condition = condition.add(
            Condition::any()
                .add(expense::Column::Description.contains(&search))
                .add(expense::Column::Notes.contains(&search)),
        );
    }

    let sort_column = match query.sort_by.as_deref() {
        Some("amount") => expense::Column::Amount,
        Some("created_at") => expense::Column::CreatedAt,
        _ => expense::Column::ExpenseDate,
    };
    let ascending = matches!(query.sort_order.as_deref(), Some("asc"));

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(50).clamp(1, 200);

    let mut select = Expense::find().filter(condition);
    select = if ascending {
        select.order_by_asc(sort_column)
    } else {
        select.order_by_desc(sort_column)
    };

    let paginator = select.paginate(&db, limit);
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
        "expenses": items,
        "pagination": {
            "page": page,
            "limit": limit,
            "total": total,
            "total_pages": total_pages,
            "has_more": page < total_pages,
        }
    })))
}

pub async fn create_expense(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<ExpenseDto>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, String)> {
    if payload.amount <= 0.0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "Amount must be greater than 0".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let is_recurring = payload.is_recurring.unwrap_or(false);

    if is_recurring && payload.recurring_frequency.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Recurring expenses need a recurring_frequency".to_string(),
        ));
    }

    // A recurring template starts spawning from its own date
    let next_occurrence = if is_recurring {
        Some(payload.expense_date.clone())
    } else {
        None
    };

    let model = expense::ActiveModel {
        user_id: Set(payload.user_id),
        category_id: Set(payload.category_id),
        amount: Set(payload.amount),
        currency: Set(payload.currency.unwrap_or_else(|| "USD".to_string())),
        description: Set(payload.description),
        expense_date: Set(payload.expense_date),
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

    Ok((StatusCode::CREATED, Json(json!({ "expense": saved }))))
}

pub async fn get_expense(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Expense::find_by_id(id)
        .filter(expense::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Expense not found".to_string()))?;

    Ok(Json(json!({ "expense": found })))
}

pub async fn update_expense(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateExpenseDto>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Expense::find_by_id(id)
        .filter(expense::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Expense not found".to_string()))?;

    if let Some(amount) = payload.amount {
        if amount <= 0.0 {
            return Err((
                StatusCode::BAD_REQUEST,
                "Amount must be greater than 0".to_string(),
            ));
        }
    }

    let mut active: expense::ActiveModel = found.into();
    if let Some(amount) = payload.amount {
        active.amount = Set(amount);
    }
    if let Some(currency) = payload.currency {
        active.currency = Set(currency);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(date) = payload.expense_date {
        active.expense_date = Set(date);
    }
    if payload.category_id.is_some() {
        active.category_id = Set(payload.category_id);
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

    Ok(Json(json!({ "expense": updated })))
}

/// Soft delete: the row keeps its history but drops out of listings
/// and summaries.
pub async fn delete_expense(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let found = Expense::find_by_id(id)
        .filter(expense::Column::DeletedAt.is_null())
        .one(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, "Expense not found".to_string()))?;

    let now = Utc::now().to_rfc3339();
    let mut active: expense::ActiveModel = found.into();
    active.deleted_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    active
        .update(&db)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({ "message": "Expense deleted" })))
}
