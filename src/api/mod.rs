pub mod budget;
pub mod category;
pub mod expense;
pub mod export;
pub mod group;
pub mod health;
pub mod income;
pub mod loan;
pub mod notification;
pub mod savings;
pub mod subscription;
pub mod summary;
pub mod user;

use axum::{
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use sea_orm::DatabaseConnection;
use serde_json::{json, Value};

use crate::services::ServiceError;

/// Map a service failure onto an HTTP status + `{ "error": … }` body.
pub(crate) fn error_response(e: ServiceError) -> (StatusCode, Json<Value>) {
    let status = match &e {
        ServiceError::NotFound => StatusCode::NOT_FOUND,
        ServiceError::Validation(_) | ServiceError::InvalidState(_) => StatusCode::BAD_REQUEST,
        ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({ "error": e.to_string() })))
}

pub fn api_router(db: DatabaseConnection) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Users
        .route("/users", get(user::list_users).post(user::create_user))
        .route("/users/:id", get(user::get_user))
        // Categories
        .route(
            "/categories",
            get(category::list_categories).post(category::create_category),
        )
        .route(
            "/categories/:id",
            get(category::get_category).delete(category::delete_category),
        )
        // Expenses
        .route(
            "/expenses",
            get(expense::list_expenses).post(expense::create_expense),
        )
        .route(
            "/expenses/:id",
            get(expense::get_expense)
                .put(expense::update_expense)
                .delete(expense::delete_expense),
        )
        // Income
        .route(
            "/income",
            get(income::list_incomes).post(income::create_income),
        )
        .route(
            "/income/:id",
            get(income::get_income)
                .put(income::update_income)
                .delete(income::delete_income),
        )
        // Budgets
        .route(
            "/budgets",
            get(budget::list_budgets).post(budget::create_budget),
        )
        .route("/budgets/performance", get(budget::get_performance))
        .route(
            "/budgets/:id",
            get(budget::get_budget)
                .put(budget::update_budget)
                .delete(budget::delete_budget),
        )
        // Savings goals
        .route(
            "/savings",
            get(savings::list_goals).post(savings::create_goal),
        )
        .route("/savings/progress", get(savings::get_progress))
        .route(
            "/savings/:id",
            get(savings::get_goal)
                .put(savings::update_goal)
                .delete(savings::delete_goal),
        )
        .route(
            "/savings/:id/contributions",
            get(savings::list_contributions).post(savings::add_contribution),
        )
        // Subscriptions
        .route(
            "/subscriptions",
            get(subscription::list_subscriptions).post(subscription::create_subscription),
        )
        .route("/subscriptions/summary", get(subscription::get_summary))
        .route(
            "/subscriptions/:id",
            get(subscription::get_subscription)
                .put(subscription::update_subscription)
                .delete(subscription::delete_subscription),
        )
        // Notifications
        .route("/notifications", get(notification::list_notifications))
        .route("/notifications/summary", get(notification::get_summary))
        .route("/notifications/read-all", put(notification::mark_all_read))
        .route(
            "/notifications/:id/read",
            put(notification::mark_read),
        )
        .route(
            "/notifications/:id",
            axum::routing::delete(notification::delete_notification),
        )
        // Groups
        .route("/groups", get(group::list_groups).post(group::create_group))
        .route(
            "/groups/:id",
            get(group::get_group)
                .put(group::update_group)
                .delete(group::delete_group),
        )
        .route("/groups/:id/members", post(group::add_member))
        .route(
            "/groups/:id/members/:user_id",
            axum::routing::delete(group::remove_member),
        )
        .route("/groups/:id/leave", post(group::leave_group))
        .route(
            "/groups/:id/expenses",
            get(group::list_expenses).post(group::create_expense),
        )
        .route(
            "/groups/:id/expenses/:expense_id",
            get(group::get_expense)
                .put(group::update_expense)
                .delete(group::delete_expense),
        )
        .route(
            "/groups/:id/expenses/:expense_id/settle",
            post(group::settle_expense),
        )
        .route("/groups/:id/balances", get(group::get_balances))
        .route(
            "/groups/:id/balances/:user_id",
            get(group::get_user_balance),
        )
        .route(
            "/groups/:id/simplified-debts",
            get(group::get_simplified_debts),
        )
        .route(
            "/groups/:id/settlements",
            get(group::list_settlements).post(group::record_settlement),
        )
        .route("/groups/:id/statistics", get(group::get_statistics))
        .route("/groups/:id/report", get(export::group_report))
        // Loans
        .route("/loans", get(loan::list_loans).post(loan::create_loan))
        .route("/loans/statistics", get(loan::get_statistics))
        .route(
            "/loans/:id",
            get(loan::get_loan).delete(loan::delete_loan),
        )
        .route("/loans/:id/adjustments", post(loan::add_adjustment))
        // Summaries
        .route("/summaries/monthly", get(summary::monthly_summary))
        .route("/summaries/yearly", get(summary::yearly_summary))
        // Data export
        .route("/export", get(export::export_data))
        .route("/export/expenses.csv", get(export::expenses_csv))
        .route("/export/report", get(export::expense_report))
        .with_state(db)
}
