use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use chrono::Local;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::error_response;
use crate::models::{
    budget, category, expense, group, group_expense, income, loan, savings_goal, subscription,
};
use crate::services::report_service::{self, ReportTransaction, SummaryCard};
use crate::services::{group_service, ServiceError};

#[derive(Deserialize)]
pub struct ExportQuery {
    pub user_id: i32,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Serialize)]
pub struct BackupData {
    pub version: String,
    pub snapshot_id: String,
    pub timestamp: String,
    pub expenses: Vec<expense::Model>,
    pub incomes: Vec<income::Model>,
    pub budgets: Vec<budget::Model>,
    pub savings_goals: Vec<savings_goal::Model>,
    pub subscriptions: Vec<subscription::Model>,
    pub loans: Vec<loan::Model>,
    pub categories: Vec<category::Model>,
}

/// Full JSON backup of one user's records.
pub async fn export_data(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ExportQuery>,
) -> impl IntoResponse {
    let user_id = query.user_id;

    let expenses = expense::Entity::find()
        .filter(expense::Column::UserId.eq(user_id))
        .filter(expense::Column::DeletedAt.is_null())
        .all(&db)
        .await
        .unwrap_or_default();
    let incomes = income::Entity::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::DeletedAt.is_null())
        .all(&db)
        .await
        .unwrap_or_default();
    let budgets = budget::Entity::find()
        .filter(budget::Column::UserId.eq(user_id))
        .all(&db)
        .await
        .unwrap_or_default();
    let savings_goals = savings_goal::Entity::find()
        .filter(savings_goal::Column::UserId.eq(user_id))
        .all(&db)
        .await
        .unwrap_or_default();
    let subscriptions = subscription::Entity::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .all(&db)
        .await
        .unwrap_or_default();
    let loans = loan::Entity::find()
        .filter(loan::Column::IsDeleted.eq(false))
        .filter(
            Condition::any()
                .add(loan::Column::LenderUserId.eq(user_id))
                .add(loan::Column::BorrowerUserId.eq(user_id)),
        )
        .all(&db)
        .await
        .unwrap_or_default();
    let categories = category::Entity::find().all(&db).await.unwrap_or_default();

    let backup = BackupData {
        version: "1.0".to_string(),
        snapshot_id: uuid::Uuid::new_v4().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        expenses,
        incomes,
        budgets,
        savings_goals,
        subscriptions,
        loans,
        categories,
    };

    let filename = format!(
        "splitbook_backup_{}.json",
        chrono::Utc::now().format("%Y-%m-%d")
    );

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
    headers.insert(
        header::CONTENT_DISPOSITION,
        format!("attachment; filename=\"{}\"", filename)
            .parse()
            .unwrap(),
    );

    (StatusCode::OK, headers, Json(backup))
}

async fn load_expenses(
    db: &DatabaseConnection,
    query: &ExportQuery,
) -> Result<(Vec<expense::Model>, HashMap<i32, String>), ServiceError> {
    let mut condition = Condition::all()
        .add(expense::Column::UserId.eq(query.user_id))
        .add(expense::Column::DeletedAt.is_null());
    if let Some(start) = &query.start_date {
        condition = condition.add(expense::Column::ExpenseDate.gte(start.clone()));
    }
    if let Some(end) = &query.end_date {
        condition = condition.add(expense::Column::ExpenseDate.lte(end.clone()));
    }

    let expenses = expense::Entity::find()
        .filter(condition)
        .order_by_asc(expense::Column::ExpenseDate)
        .all(db)
        .await?;

    let categories: HashMap<i32, String> = category::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    Ok((expenses, categories))
}

/// Expense rows as a CSV download.
pub async fn expenses_csv(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ExportQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let (expenses, categories) = load_expenses(&db, &query).await.map_err(error_response)?;

    let csv = report_service::expenses_csv(&expenses, &categories).map_err(error_response)?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, "text/csv".parse().unwrap());
    headers.insert(
        header::CONTENT_DISPOSITION,
        "attachment; filename=\"expenses.csv\"".parse().unwrap(),
    );

    Ok((StatusCode::OK, headers, csv))
}

/// Self-contained HTML expense report for the requested period.
pub async fn expense_report(
    State(db): State<DatabaseConnection>,
    Query(query): Query<ExportQuery>,
) -> Result<Html<String>, (StatusCode, Json<Value>)> {
    let (expenses, categories) = load_expenses(&db, &query).await.map_err(error_response)?;

    let total: f64 = expenses.iter().map(|e| e.amount).sum();
    let count = expenses.len();
    let average = if count > 0 { total / count as f64 } else { 0.0 };

    let mut by_category: HashMap<String, f64> = HashMap::new();
    for e in &expenses {
        let name = e
            .category_id
            .and_then(|id| categories.get(&id).cloned())
            .unwrap_or_else(|| "Uncategorized".to_string());
        *by_category.entry(name).or_insert(0.0) += e.amount;
    }

    let transactions: Vec<ReportTransaction> = expenses
        .iter()
        .map(|e| ReportTransaction {
            date: e.expense_date.clone(),
            category: e
                .category_id
                .and_then(|id| categories.get(&id).cloned())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            description: e.description.clone(),
            amount: e.amount,
        })
        .collect();

    let date_range = match (&query.start_date, &query.end_date) {
        (Some(start), Some(end)) => format!("{} to {}", start, end),
        (Some(start), None) => format!("from {}", start),
        (None, Some(end)) => format!("until {}", end),
        (None, None) => "all time".to_string(),
    };

    let cards = vec![
        SummaryCard {
            label: "Total spent".to_string(),
            value: format!("{:.2}", total),
        },
        SummaryCard {
            label: "Transactions".to_string(),
            value: count.to_string(),
        },
        SummaryCard {
            label: "Average".to_string(),
            value: format!("{:.2}", average),
        },
    ];

    let html = report_service::render_expense_report(
        "Expense report",
        "Personal spending overview",
        &date_range,
        &Local::now().format("%Y-%m-%d").to_string(),
        &cards,
        &transactions,
        &report_service::category_distribution(&by_category),
    );

    Ok(Html(html))
}

#[derive(Deserialize)]
pub struct UserQuery {
    pub user_id: i32,
}

/// Group report: balances, settle-up plan, category spending.
pub async fn group_report(
    State(db): State<DatabaseConnection>,
    Path(id): Path<i32>,
    Query(query): Query<UserQuery>,
) -> Result<Html<String>, (StatusCode, Json<Value>)> {
    let group = group::Entity::find_by_id(id)
        .one(&db)
        .await
        .map_err(|e| error_response(e.into()))?
        .ok_or_else(|| error_response(ServiceError::NotFound))?;

    let balances = group_service::get_balances(&db, id, query.user_id)
        .await
        .map_err(error_response)?;
    let transfers = group_service::get_simplified_debts(&db, id, query.user_id)
        .await
        .map_err(error_response)?;

    let expenses = group_expense::Entity::find()
        .filter(group_expense::Column::GroupId.eq(id))
        .all(&db)
        .await
        .map_err(|e| error_response(e.into()))?;
    let categories: HashMap<i32, String> = category::Entity::find()
        .all(&db)
        .await
        .map_err(|e| error_response(e.into()))?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut by_category: HashMap<String, f64> = HashMap::new();
    for e in &expenses {
        let name = e
            .category_id
            .and_then(|cid| categories.get(&cid).cloned())
            .unwrap_or_else(|| "Uncategorized".to_string());
        *by_category.entry(name).or_insert(0.0) += e.amount;
    }

    let html = report_service::render_group_report(
        &group.name,
        &group.currency,
        &Local::now().format("%Y-%m-%d").to_string(),
        &balances,
        &transfers,
        &report_service::category_distribution(&by_category),
    );

    Ok(Html(html))
}
