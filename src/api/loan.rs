use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::models::loan::LoanDto;
use crate::models::loan_adjustment::LoanAdjustmentDto;
use crate::services::loan_service::{self, LoanFilter};

type ApiError = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct ListLoansQuery {
    pub user_id: i32,
    pub role: Option<String>,
    pub status: Option<String>,
    pub overdue: Option<bool>,
}

pub async fn list_loans(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ListLoansQuery>,
) -> Result<Json<Value>, ApiError> {
    let loans = loan_service::list_loans(
        &db,
        LoanFilter {
            user_id: query.user_id,
            role: query.role,
            status: query.status,
            overdue: query.overdue.unwrap_or(false),
        },
    )
    .await
    .map_err(error_response)?;

    Ok(Json(json!({ "loans": loans })))
}

pub async fn create_loan(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoanDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let loan = loan_service::create_loan(&db, payload)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "loan": loan, "message": "Loan created successfully" })),
    ))
}

pub async fn get_loan(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let (loan, adjustments) = loan_service::get_loan(&db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "loan": loan, "adjustments": adjustments })))
}

pub async fn delete_loan(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    loan_service::delete_loan(&db, id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "message": "Loan deleted" })))
}

pub async fn add_adjustment(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<LoanAdjustmentDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let (adjustment, loan) = loan_service::add_adjustment(&db, id, payload)
        .await
        .map_err(error_response)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "adjustment": adjustment, "loan": loan })),
    ))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

pub async fn get_statistics(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let statistics = loan_service::get_statistics(&db, query.user_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({ "statistics": statistics })))
}
