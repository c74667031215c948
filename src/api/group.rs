use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error_response;
use crate::models::group::GroupDto;
use crate::models::group_expense::{GroupExpenseDto, SettleExpenseDto, UpdateGroupExpenseDto};
use crate::models::group_member::AddMemberDto;
use crate::models::settlement::SettlementDto;
use crate::services::{group_expense_service, group_service};

type ApiError = (StatusCode, Json<Value>);

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

pub async fn list_groups(
    State(db): State<DatabaseConnection>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let groups = group_service::list_groups(&db, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "groups": groups })))
}

#[derive(Deserialize)]
pub struct CreateGroupRequest {
    pub user_id: i32,
    #[serde(flatten)]
    pub group: GroupDto,
}

pub async fn create_group(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let group = group_service::create_group(&db, payload.group, payload.user_id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "group": group }))))
}

pub async fn get_group(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let group = group_service::get_group(&db, id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "group": group })))
}

pub async fn update_group(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
    Json(payload): Json<GroupDto>,
) -> Result<Json<Value>, ApiError> {
    let group = group_service::update_group(&db, id, payload, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "group": group })))
}

pub async fn delete_group(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    group_service::delete_group(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "message": "Group deleted" })))
}

pub async fn add_member(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
    Json(payload): Json<AddMemberDto>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let group = group_service::add_member(&db, id, payload.user_id, payload.role, query.user_id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "group": group }))))
}

pub async fn remove_member(
    State(db): State<DatabaseConnection>,
    Path((id, member_id)): Path<(i32, i32)>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    group_service::remove_member(&db, id, member_id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "message": "Member removed" })))
}

pub async fn leave_group(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    group_service::leave_group(&db, id, payload.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "message": "Left group" })))
}

// ==================== GROUP EXPENSES ====================

pub async fn list_expenses(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    group_service::verify_membership(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    let expenses = group_expense_service::list_expenses(&db, id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "expenses": expenses })))
}

#[derive(Deserialize)]
pub struct CreateExpenseRequest {
    pub user_id: i32,
    #[serde(flatten)]
    pub expense: GroupExpenseDto,
}

pub async fn create_expense(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let expense = group_expense_service::create_expense(&db, id, payload.expense, payload.user_id)
        .await
        .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "expense": expense }))))
}

pub async fn get_expense(
    State(db): State<DatabaseConnection>,
    Path((id, expense_id)): Path<(i32, i32)>,
) -> Result<Json<Value>, ApiError> {
    let expense = group_expense_service::get_expense(&db, id, expense_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "expense": expense })))
}

#[derive(Deserialize)]
pub struct UpdateExpenseRequest {
    pub user_id: i32,
    #[serde(flatten)]
    pub expense: UpdateGroupExpenseDto,
}

pub async fn update_expense(
    State(db): State<DatabaseConnection>,
    Path((id, expense_id)): Path<(i32, i32)>,
    Json(payload): Json<UpdateExpenseRequest>,
) -> Result<Json<Value>, ApiError> {
    let expense = group_expense_service::update_expense(
        &db,
        id,
        expense_id,
        payload.expense,
        payload.user_id,
    )
    .await
    .map_err(error_response)?;
    Ok(Json(json!({ "expense": expense })))
}

pub async fn delete_expense(
    State(db): State<DatabaseConnection>,
    Path((id, expense_id)): Path<(i32, i32)>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    group_expense_service::delete_expense(&db, id, expense_id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "message": "Expense deleted" })))
}

pub async fn settle_expense(
    State(db): State<DatabaseConnection>,
    Path((id, expense_id)): Path<(i32, i32)>,
    Json(payload): Json<SettleExpenseDto>,
) -> Result<Json<Value>, ApiError> {
    let outcome = group_expense_service::settle_expense(&db, id, expense_id, payload)
        .await
        .map_err(error_response)?;
    Ok(Json(json!(outcome)))
}

// ==================== BALANCES & SETTLEMENTS ====================

pub async fn get_balances(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let balances = group_service::get_balances(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "balances": balances })))
}

pub async fn get_user_balance(
    State(db): State<DatabaseConnection>,
    Path((id, target_user_id)): Path<(i32, i32)>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let balance = group_service::get_user_balance(&db, id, target_user_id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "balance": balance })))
}

pub async fn get_simplified_debts(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let debts = group_service::get_simplified_debts(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "debts": debts })))
}

#[derive(Deserialize)]
pub struct RecordSettlementRequest {
    pub user_id: i32,
    #[serde(flatten)]
    pub settlement: SettlementDto,
}

pub async fn record_settlement(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Json(payload): Json<RecordSettlementRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let settlement =
        group_service::record_settlement(&db, id, payload.settlement, payload.user_id)
            .await
            .map_err(error_response)?;
    Ok((StatusCode::CREATED, Json(json!({ "settlement": settlement }))))
}

pub async fn list_settlements(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let settlements = group_service::list_settlements(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "settlements": settlements })))
}

pub async fn get_statistics(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Value>, ApiError> {
    let statistics = group_service::get_statistics(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    Ok(Json(json!({ "statistics": statistics })))
}
