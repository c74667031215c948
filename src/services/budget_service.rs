//! Budget service - spend tracking against budget envelopes.

use chrono::Utc;
use sea_orm::*;

use super::ServiceError;
use crate::domain::splits::round2;
use crate::models::budget::{self, Entity as Budget};
use crate::models::expense::{self, Entity as Expense};
use crate::models::notification;

/// Default alert threshold when a budget doesn't set one (percent).
const DEFAULT_ALERT_THRESHOLD: f64 = 80.0;

/// Utilization percent and traffic-light status for a budget.
pub fn budget_status(amount: f64, spent: f64, alert_threshold: Option<f64>) -> (f64, &'static str) {
    let utilization = if amount > 0.0 {
        round2(spent / amount * 100.0)
    } else {
        0.0
    };

    let threshold = alert_threshold.unwrap_or(DEFAULT_ALERT_THRESHOLD);
    let status = if utilization >= 100.0 {
        "exceeded"
    } else if utilization >= threshold {
        "warning"
    } else {
        "on_track"
    };

    (utilization, status)
}

/// Re-sum the user's expenses inside the budget period (and category,
/// when the budget is scoped to one) and persist the result.
pub async fn recompute_spent(
    db: &DatabaseConnection,
    budget_model: budget::Model,
) -> Result<budget::Model, ServiceError> {
    let mut condition = Condition::all()
        .add(expense::Column::UserId.eq(budget_model.user_id))
        .add(expense::Column::DeletedAt.is_null())
        .add(expense::Column::ExpenseDate.gte(budget_model.start_date.clone()))
        .add(expense::Column::ExpenseDate.lte(budget_model.end_date.clone()));

    if let Some(category_id) = budget_model.category_id {
        condition = condition.add(expense::Column::CategoryId.eq(category_id));
    }

    let expenses = Expense::find().filter(condition).all(db).await?;
    let spent = round2(expenses.iter().map(|e| e.amount).sum());

    if spent == budget_model.spent_amount {
        return Ok(budget_model);
    }

    let mut active: budget::ActiveModel = budget_model.into();
    active.spent_amount = Set(spent);
    active.updated_at = Set(Utc::now().to_rfc3339());
    Ok(active.update(db).await?)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BudgetPerformance {
    pub budget_id: i32,
    pub category_id: Option<i32>,
    pub amount: f64,
    pub spent_amount: f64,
    pub remaining: f64,
    pub utilization: f64,
    pub status: &'static str,
    pub period_type: String,
    pub start_date: String,
    pub end_date: String,
}

/// Per-budget performance for all of a user's active budgets, spent
/// amounts refreshed on the way.
pub async fn get_performance(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<BudgetPerformance>, ServiceError> {
    let budgets = Budget::find()
        .filter(budget::Column::UserId.eq(user_id))
        .filter(budget::Column::IsActive.eq(true))
        .order_by_asc(budget::Column::StartDate)
        .all(db)
        .await?;

    let mut performances = Vec::with_capacity(budgets.len());
    for b in budgets {
        let b = recompute_spent(db, b).await?;
        let (utilization, status) = budget_status(b.amount, b.spent_amount, b.alert_threshold);
        performances.push(BudgetPerformance {
            budget_id: b.id,
            category_id: b.category_id,
            amount: b.amount,
            spent_amount: b.spent_amount,
            remaining: round2(b.amount - b.spent_amount),
            utilization,
            status,
            period_type: b.period_type,
            start_date: b.start_date,
            end_date: b.end_date,
        });
    }

    Ok(performances)
}

/// Emit at most one `budget_alert` notification per budget period once
/// utilization crosses the threshold.
pub async fn emit_alerts(db: &DatabaseConnection) -> Result<u64, ServiceError> {
    let budgets = Budget::find()
        .filter(budget::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let mut emitted = 0;
    for b in budgets {
        let b = recompute_spent(db, b).await?;
        let (utilization, status) = budget_status(b.amount, b.spent_amount, b.alert_threshold);
        if status == "on_track" {
            continue;
        }

        // One alert per period: skip if we already notified since the
        // period started
        let already = notification::Entity::find()
            .filter(notification::Column::UserId.eq(b.user_id))
            .filter(notification::Column::Kind.eq("budget_alert"))
            .filter(notification::Column::Metadata.eq(Some(format!("{{\"budget_id\":{}}}", b.id))))
            .filter(notification::Column::CreatedAt.gte(b.start_date.clone()))
            .one(db)
            .await?;
        if already.is_some() {
            continue;
        }

        let title = if status == "exceeded" {
            "Budget exceeded".to_string()
        } else {
            "Budget almost used up".to_string()
        };

        notification::ActiveModel {
            user_id: Set(b.user_id),
            kind: Set("budget_alert".to_string()),
            title: Set(title),
            message: Set(format!(
                "You have spent {:.2} of {:.2} ({:.0}%) for this budget period",
                b.spent_amount, b.amount, utilization
            )),
            is_read: Set(false),
            action_url: Set(Some("/budgets".to_string())),
            metadata: Set(Some(format!("{{\"budget_id\":{}}}", b.id))),
            created_at: Set(Utc::now().to_rfc3339()),
            read_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;
        emitted += 1;
    }

    Ok(emitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::user;

    #[test]
    fn status_thresholds() {
        assert_eq!(budget_status(100.0, 10.0, None), (10.0, "on_track"));
        assert_eq!(budget_status(100.0, 80.0, None), (80.0, "warning"));
        assert_eq!(budget_status(100.0, 120.0, None), (120.0, "exceeded"));
        assert_eq!(budget_status(100.0, 50.0, Some(40.0)), (50.0, "warning"));
        // Degenerate budget never alerts
        assert_eq!(budget_status(0.0, 50.0, None), (0.0, "on_track"));
    }

    async fn seed_user(db: &DatabaseConnection) {
        user::ActiveModel {
            username: Set("alice".to_string()),
            email: Set("alice@example.com".to_string()),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert user");
    }

    async fn seed_expense(db: &DatabaseConnection, amount: f64, date: &str) {
        expense::ActiveModel {
            user_id: Set(1),
            category_id: Set(None),
            amount: Set(amount),
            currency: Set("USD".to_string()),
            description: Set("test".to_string()),
            expense_date: Set(date.to_string()),
            payment_method: Set(None),
            notes: Set(None),
            is_recurring: Set(false),
            recurring_frequency: Set(None),
            next_occurrence: Set(None),
            deleted_at: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert expense");
    }

    #[tokio::test]
    async fn performance_sums_expenses_inside_the_period() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_user(&db).await;

        budget::ActiveModel {
            user_id: Set(1),
            category_id: Set(None),
            amount: Set(200.0),
            spent_amount: Set(0.0),
            currency: Set("USD".to_string()),
            period_type: Set("monthly".to_string()),
            start_date: Set("2025-06-01".to_string()),
            end_date: Set("2025-06-30".to_string()),
            alert_threshold: Set(Some(75.0)),
            is_active: Set(true),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert budget");

        seed_expense(&db, 120.0, "2025-06-10").await;
        seed_expense(&db, 40.0, "2025-06-20").await;
        seed_expense(&db, 999.0, "2025-07-01").await; // outside period

        let performances = get_performance(&db, 1).await.expect("performance failed");
        assert_eq!(performances.len(), 1);
        let p = &performances[0];
        assert_eq!(p.spent_amount, 160.0);
        assert_eq!(p.remaining, 40.0);
        assert_eq!(p.utilization, 80.0);
        assert_eq!(p.status, "warning");

        // Alert fires once, not twice
        assert_eq!(emit_alerts(&db).await.expect("alerts failed"), 1);
        assert_eq!(emit_alerts(&db).await.expect("alerts failed"), 0);
    }
}
