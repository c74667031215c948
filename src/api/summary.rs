use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use sea_orm::*;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::splits::round2;
use crate::models::expense::{self, Entity as Expense};
use crate::models::income::{self, Entity as Income};

#[derive(Deserialize)]
pub struct MonthlyQuery {
    pub user_id: i32,
    pub year: i32,
    pub month: u32,
    pub currency: Option<String>,
}

#[derive(Deserialize)]
pub struct YearlyQuery {
    pub user_id: i32,
    pub year: i32,
    pub currency: Option<String>,
}

async fn totals_between(
    db: &DatabaseConnection,
    user_id: i32,
    currency: &str,
    start: &str,
    end: &str,
) -> Result<(f64, usize, f64, usize), DbErr> {
    let expenses = Expense::find()
        .filter(expense::Column::UserId.eq(user_id))
        .filter(expense::Column::Currency.eq(currency))
        .filter(expense::Column::DeletedAt.is_null())
        .filter(expense::Column::ExpenseDate.gte(start))
        .filter(expense::Column::ExpenseDate.lte(end))
        .all(db)
        .await?;

    let incomes = Income::find()
        .filter(income::Column::UserId.eq(user_id))
        .filter(income::Column::Currency.eq(currency))
        .filter(income::Column::DeletedAt.is_null())
        .filter(income::Column::IncomeDate.gte(start))
        .filter(income::Column::IncomeDate.lte(end))
        .all(db)
        .await?;

    let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();
    let total_income: f64 = incomes.iter().map(|i| i.amount).sum();

    Ok((
        round2(total_expenses),
        expenses.len(),
        round2(total_income),
        incomes.len(),
    ))
}

pub async fn monthly_summary(
    State(db): State<DatabaseConnection>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    if !(1..=12).contains(&query.month) {
        return Err((StatusCode::BAD_REQUEST, "month must be 1-12".to_string()));
    }

    let currency = query.currency.unwrap_or_else(|| "USD".to_string());
    let start = format!("{:04}-{:02}-01", query.year, query.month);
    // Lexicographic upper bound: the last day of any month is <= 31
    let end = format!("{:04}-{:02}-31", query.year, query.month);

    let (total_expenses, expense_count, total_income, income_count) =
        totals_between(&db, query.user_id, &currency, &start, &end)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({
        "user_id": query.user_id,
        "year": query.year,
        "month": query.month,
        "currency": currency,
        "total_expenses": total_expenses,
        "expense_count": expense_count,
        "total_income": total_income,
        "income_count": income_count,
        "net": round2(total_income - total_expenses),
    })))
}

pub async fn yearly_summary(
    State(db): State<DatabaseConnection>,
    Query(query): Query<YearlyQuery>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let currency = query.currency.unwrap_or_else(|| "USD".to_string());
    let start = format!("{:04}-01-01", query.year);
    let end = format!("{:04}-12-31", query.year);

    let (total_expenses, expense_count, total_income, income_count) =
        totals_between(&db, query.user_id, &currency, &start, &end)
            .await
            .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(json!({
        "user_id": query.user_id,
        "year": query.year,
        "currency": currency,
        "total_expenses": total_expenses,
        "expense_count": expense_count,
        "total_income": total_income,
        "income_count": income_count,
        "net": round2(total_income - total_expenses),
    })))
}
