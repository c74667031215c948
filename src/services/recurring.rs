//! Background worker: recurring transactions, subscription billing and
//! budget alerts.
//!
//! Spawned from `main` and left running for the life of the process.
//! Each pass is independent; a failing pass is logged and retried on
//! the next tick.

use chrono::{Local, NaiveDate, Utc};
use sea_orm::*;
use std::time::Duration;

use super::subscription_service::advance_billing_date;
use super::{budget_service, subscription_service, ServiceError};
use crate::models::expense::{self, Entity as Expense};
use crate::models::income::{self, Entity as Income};
use crate::models::notification;
use crate::models::subscription::{self, Entity as Subscription};

pub async fn run_worker(db: DatabaseConnection, interval_secs: u64) {
    tracing::info!("Recurring worker started (every {}s)", interval_secs);

    loop {
        let today = Local::now().date_naive();
        match process_all(&db, today).await {
            Ok(stats) => {
                if stats.total() > 0 {
                    tracing::info!(
                        "Worker pass: {} expenses, {} incomes, {} billings, {} reminders, {} alerts",
                        stats.expenses_created,
                        stats.incomes_created,
                        stats.billings_advanced,
                        stats.reminders_sent,
                        stats.alerts_sent
                    );
                }
            }
            Err(e) => {
                tracing::error!("Worker pass failed: {}", e);
            }
        }

        tokio::time::sleep(Duration::from_secs(interval_secs)).await;
    }
}

#[derive(Debug, Default)]
pub struct WorkerStats {
    pub expenses_created: u64,
    pub incomes_created: u64,
    pub billings_advanced: u64,
    pub reminders_sent: u64,
    pub alerts_sent: u64,
}

impl WorkerStats {
    fn total(&self) -> u64 {
        self.expenses_created
            + self.incomes_created
            + self.billings_advanced
            + self.reminders_sent
            + self.alerts_sent
    }
}

pub async fn process_all(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<WorkerStats, ServiceError> {
    Ok(WorkerStats {
        expenses_created: process_recurring_expenses(db, today).await?,
        incomes_created: process_recurring_incomes(db, today).await?,
        billings_advanced: subscription_service::process_due_billing(db, today).await?,
        reminders_sent: send_subscription_reminders(db, today).await?,
        alerts_sent: budget_service::emit_alerts(db).await?,
    })
}

/// Materialize each due recurring expense as a fresh row and push the
/// template's next occurrence past today. Clones are not themselves
/// recurring, only the template row spawns.
pub async fn process_recurring_expenses(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<u64, ServiceError> {
    let today_str = today.format("%Y-%m-%d").to_string();

    let due = Expense::find()
        .filter(expense::Column::IsRecurring.eq(true))
        .filter(expense::Column::DeletedAt.is_null())
        .filter(expense::Column::NextOccurrence.lte(today_str.clone()))
        .all(db)
        .await?;

    let now = Utc::now().to_rfc3339();
    let mut created = 0;

    for template in due {
        let frequency = match template.recurring_frequency.as_deref() {
            Some(f) => f.to_string(),
            None => continue,
        };

        expense::ActiveModel {
            user_id: Set(template.user_id),
            category_id: Set(template.category_id),
            amount: Set(template.amount),
            currency: Set(template.currency.clone()),
            description: Set(template.description.clone()),
            expense_date: Set(today_str.clone()),
            payment_method: Set(template.payment_method.clone()),
            notes: Set(Some("Auto-created from recurring schedule".to_string())),
            is_recurring: Set(false),
            recurring_frequency: Set(None),
            next_occurrence: Set(None),
            deleted_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let mut next = template
            .next_occurrence
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(today);
        while next <= today {
            next = advance_billing_date(next, &frequency);
        }

        let mut active: expense::ActiveModel = template.into();
        active.next_occurrence = Set(Some(next.format("%Y-%m-%d").to_string()));
        active.updated_at = Set(now.clone());
        active.update(db).await?;

        created += 1;
    }

    Ok(created)
}

pub async fn process_recurring_incomes(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<u64, ServiceError> {
    let today_str = today.format("%Y-%m-%d").to_string();

    let due = Income::find()
        .filter(income::Column::IsRecurring.eq(true))
        .filter(income::Column::DeletedAt.is_null())
        .filter(income::Column::NextOccurrence.lte(today_str.clone()))
        .all(db)
        .await?;

    let now = Utc::now().to_rfc3339();
    let mut created = 0;

    for template in due {
        let frequency = match template.recurring_frequency.as_deref() {
            Some(f) => f.to_string(),
            None => continue,
        };

        income::ActiveModel {
            user_id: Set(template.user_id),
            category_id: Set(template.category_id),
            amount: Set(template.amount),
            currency: Set(template.currency.clone()),
            source: Set(template.source.clone()),
            description: Set(template.description.clone()),
            income_date: Set(today_str.clone()),
            payment_method: Set(template.payment_method.clone()),
            notes: Set(Some("Auto-created from recurring schedule".to_string())),
            is_recurring: Set(false),
            recurring_frequency: Set(None),
            next_occurrence: Set(None),
            deleted_at: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let mut next = template
            .next_occurrence
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or(today);
        while next <= today {
            next = advance_billing_date(next, &frequency);
        }

        let mut active: income::ActiveModel = template.into();
        active.next_occurrence = Set(Some(next.format("%Y-%m-%d").to_string()));
        active.updated_at = Set(now.clone());
        active.update(db).await?;

        created += 1;
    }

    Ok(created)
}

/// Remind `reminder_days` ahead of the next billing date, once per
/// billing date.
pub async fn send_subscription_reminders(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<u64, ServiceError> {
    let subscriptions = Subscription::find()
        .filter(subscription::Column::IsActive.eq(true))
        .filter(subscription::Column::ReminderDays.is_not_null())
        .all(db)
        .await?;

    let mut sent = 0;
    for s in subscriptions {
        let reminder_days = match s.reminder_days {
            Some(d) if d >= 0 => d as i64,
            _ => continue,
        };
        let next = match NaiveDate::parse_from_str(&s.next_billing_date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(_) => continue,
        };

        let days_until = (next - today).num_days();
        if days_until < 0 || days_until > reminder_days {
            continue;
        }

        let marker = format!(
            "{{\"subscription_id\":{},\"billing_date\":\"{}\"}}",
            s.id, s.next_billing_date
        );
        let already = notification::Entity::find()
            .filter(notification::Column::UserId.eq(s.user_id))
            .filter(notification::Column::Kind.eq("subscription_reminder"))
            .filter(notification::Column::Metadata.eq(Some(marker.clone())))
            .one(db)
            .await?;
        if already.is_some() {
            continue;
        }

        notification::ActiveModel {
            user_id: Set(s.user_id),
            kind: Set("subscription_reminder".to_string()),
            title: Set(format!("{} renews soon", s.name)),
            message: Set(format!(
                "{} ({:.2} {}) renews on {}",
                s.name, s.amount, s.currency, s.next_billing_date
            )),
            is_read: Set(false),
            action_url: Set(Some("/subscriptions".to_string())),
            metadata: Set(Some(marker)),
            created_at: Set(Utc::now().to_rfc3339()),
            read_at: Set(None),
            ..Default::default()
        }
        .insert(db)
        .await?;
        sent += 1;
    }

    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::user;

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

    #[tokio::test]
    async fn due_recurring_expense_is_materialized_once() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_user(&db).await;

        expense::ActiveModel {
            user_id: Set(1),
            category_id: Set(None),
            amount: Set(15.0),
            currency: Set("USD".to_string()),
            description: Set("Gym".to_string()),
            expense_date: Set("2025-01-05".to_string()),
            payment_method: Set(None),
            notes: Set(None),
            is_recurring: Set(true),
            recurring_frequency: Set(Some("monthly".to_string())),
            next_occurrence: Set(Some("2025-02-05".to_string())),
            deleted_at: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert expense");

        let today = NaiveDate::from_ymd_opt(2025, 2, 6).unwrap();
        let created = process_recurring_expenses(&db, today).await.expect("worker failed");
        assert_eq!(created, 1);

        let all = Expense::find().all(&db).await.expect("db");
        assert_eq!(all.len(), 2);

        let clone = all.iter().find(|e| !e.is_recurring).unwrap();
        assert_eq!(clone.expense_date, "2025-02-06");
        assert_eq!(clone.amount, 15.0);

        let template = all.iter().find(|e| e.is_recurring).unwrap();
        assert_eq!(template.next_occurrence.as_deref(), Some("2025-03-05"));

        // Second pass on the same day creates nothing
        let created = process_recurring_expenses(&db, today).await.expect("worker failed");
        assert_eq!(created, 0);
    }

    #[tokio::test]
    async fn reminder_fires_once_per_billing_date() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_user(&db).await;

        subscription::ActiveModel {
            user_id: Set(1),
            name: Set("Stream".to_string()),
            description: Set(None),
            amount: Set(9.99),
            currency: Set("USD".to_string()),
            billing_cycle: Set("monthly".to_string()),
            start_date: Set("2025-01-01".to_string()),
            next_billing_date: Set("2025-05-10".to_string()),
            end_date: Set(None),
            category: Set(None),
            payment_method: Set(None),
            is_active: Set(true),
            reminder_days: Set(Some(3)),
            notes: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert subscription");

        // Too early: 5 days out with a 3-day reminder window
        let sent = send_subscription_reminders(&db, NaiveDate::from_ymd_opt(2025, 5, 5).unwrap())
            .await
            .expect("reminders failed");
        assert_eq!(sent, 0);

        let sent = send_subscription_reminders(&db, NaiveDate::from_ymd_opt(2025, 5, 8).unwrap())
            .await
            .expect("reminders failed");
        assert_eq!(sent, 1);

        // Same billing date never notifies twice
        let sent = send_subscription_reminders(&db, NaiveDate::from_ymd_opt(2025, 5, 9).unwrap())
            .await
            .expect("reminders failed");
        assert_eq!(sent, 0);
    }
}
