//! Subscription service - billing-cycle math and renewal tracking.

use chrono::{Datelike, Local, NaiveDate};
use sea_orm::*;

use super::ServiceError;
use crate::domain::splits::round2;
use crate::models::subscription::{self, Entity as Subscription};

/// Monthly-equivalent cost of a subscription for summary totals.
pub fn monthly_equivalent(amount: f64, billing_cycle: &str) -> f64 {
    match billing_cycle {
        "daily" => amount * 30.0,
        "weekly" => amount * 52.0 / 12.0,
        "monthly" => amount,
        "quarterly" => amount / 3.0,
        "yearly" => amount / 12.0,
        _ => amount,
    }
}

/// The billing date one cycle after `date`. Month-based cycles clamp to
/// the last day of the target month (Jan 31 + 1 month = Feb 28/29).
pub fn advance_billing_date(date: NaiveDate, billing_cycle: &str) -> NaiveDate {
    match billing_cycle {
        "daily" => date + chrono::Duration::days(1),
        "weekly" => date + chrono::Duration::days(7),
        "monthly" => add_months(date, 1),
        "quarterly" => add_months(date, 3),
        "yearly" => add_months(date, 12),
        _ => add_months(date, 1),
    }
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month0 = total.rem_euclid(12) as u32;
    let day = date.day();

    // Clamp the day into the target month
    (1..=day)
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month0 + 1, d))
        .unwrap_or(date)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct UpcomingRenewal {
    pub id: i32,
    pub name: String,
    pub amount: f64,
    pub next_billing_date: String,
    pub days_until: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CategoryCost {
    pub category: String,
    pub total_amount: f64,
    pub count: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriptionSummary {
    pub total_monthly: f64,
    pub total_yearly: f64,
    pub active_count: u64,
    pub upcoming_renewals: Vec<UpcomingRenewal>,
    pub category_breakdown: Vec<CategoryCost>,
}

/// Totals normalized across billing cycles, renewals due in the next 30
/// days, and a per-category cost breakdown.
pub async fn get_summary(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<SubscriptionSummary, ServiceError> {
    let subscriptions = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::IsActive.eq(true))
        .all(db)
        .await?;

    let today = Local::now().date_naive();

    let total_monthly: f64 = subscriptions
        .iter()
        .map(|s| monthly_equivalent(s.amount, &s.billing_cycle))
        .sum();

    let mut upcoming: Vec<UpcomingRenewal> = subscriptions
        .iter()
        .filter_map(|s| {
            let next = NaiveDate::parse_from_str(&s.next_billing_date, "%Y-%m-%d").ok()?;
            let days_until = (next - today).num_days();
            if (0..=30).contains(&days_until) {
                Some(UpcomingRenewal {
                    id: s.id,
                    name: s.name.clone(),
                    amount: s.amount,
                    next_billing_date: s.next_billing_date.clone(),
                    days_until,
                })
            } else {
                None
            }
        })
        .collect();
    upcoming.sort_by_key(|r| r.days_until);

    let mut by_category: std::collections::HashMap<String, (f64, u64)> = Default::default();
    for s in &subscriptions {
        let key = s
            .category
            .clone()
            .unwrap_or_else(|| "Uncategorized".to_string());
        let entry = by_category.entry(key).or_insert((0.0, 0));
        entry.0 += monthly_equivalent(s.amount, &s.billing_cycle);
        entry.1 += 1;
    }
    let mut category_breakdown: Vec<CategoryCost> = by_category
        .into_iter()
        .map(|(category, (total, count))| CategoryCost {
            category,
            total_amount: round2(total),
            count,
        })
        .collect();
    category_breakdown.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));

    Ok(SubscriptionSummary {
        total_monthly: round2(total_monthly),
        total_yearly: round2(total_monthly * 12.0),
        active_count: subscriptions.len() as u64,
        upcoming_renewals: upcoming,
        category_breakdown,
    })
}

/// Advance every active subscription whose billing date has passed and
/// return how many were rolled forward. Subscriptions past their end
/// date are deactivated instead.
pub async fn process_due_billing(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<u64, ServiceError> {
    let today_str = today.format("%Y-%m-%d").to_string();

    let due = Subscription::find()
        .filter(subscription::Column::IsActive.eq(true))
        .filter(subscription::Column::NextBillingDate.lte(today_str.clone()))
        .all(db)
        .await?;

    let mut advanced = 0;
    for s in due {
        let ended = s
            .end_date
            .as_deref()
            .is_some_and(|end| end < today_str.as_str());

        let mut active: subscription::ActiveModel = s.clone().into();
        if ended {
            active.is_active = Set(false);
        } else {
            let mut next = NaiveDate::parse_from_str(&s.next_billing_date, "%Y-%m-%d")
                .unwrap_or(today);
            // Catch up past missed cycles in one pass
            while next <= today {
                next = advance_billing_date(next, &s.billing_cycle);
            }
            active.next_billing_date = Set(next.format("%Y-%m-%d").to_string());
            advanced += 1;
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());
        active.update(db).await?;
    }

    Ok(advanced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::user;
    use chrono::Utc;

    #[test]
    fn monthly_equivalents() {
        assert_eq!(monthly_equivalent(10.0, "monthly"), 10.0);
        assert_eq!(monthly_equivalent(120.0, "yearly"), 10.0);
        assert_eq!(monthly_equivalent(30.0, "quarterly"), 10.0);
        assert_eq!(round2(monthly_equivalent(3.0, "weekly")), 13.0);
        assert_eq!(monthly_equivalent(1.0, "daily"), 30.0);
    }

    #[test]
    fn billing_date_advances_by_cycle() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();

        assert_eq!(advance_billing_date(d(2025, 1, 15), "monthly"), d(2025, 2, 15));
        assert_eq!(advance_billing_date(d(2025, 1, 31), "monthly"), d(2025, 2, 28));
        assert_eq!(advance_billing_date(d(2024, 1, 31), "monthly"), d(2024, 2, 29));
        assert_eq!(advance_billing_date(d(2025, 11, 30), "quarterly"), d(2026, 2, 28));
        assert_eq!(advance_billing_date(d(2025, 3, 1), "yearly"), d(2026, 3, 1));
        assert_eq!(advance_billing_date(d(2025, 3, 1), "weekly"), d(2025, 3, 8));
        assert_eq!(advance_billing_date(d(2025, 12, 31), "daily"), d(2026, 1, 1));
    }

    async fn seed_subscription(
        db: &DatabaseConnection,
        name: &str,
        amount: f64,
        cycle: &str,
        next_billing: &str,
        category: Option<&str>,
    ) {
        user_once(db).await;
        subscription::ActiveModel {
            user_id: Set(1),
            name: Set(name.to_string()),
            description: Set(None),
            amount: Set(amount),
            currency: Set("USD".to_string()),
            billing_cycle: Set(cycle.to_string()),
            start_date: Set("2025-01-01".to_string()),
            next_billing_date: Set(next_billing.to_string()),
            end_date: Set(None),
            category: Set(category.map(|s| s.to_string())),
            payment_method: Set(None),
            is_active: Set(true),
            reminder_days: Set(Some(3)),
            notes: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert subscription");
    }

    async fn user_once(db: &DatabaseConnection) {
        let existing = user::Entity::find().one(db).await.expect("db");
        if existing.is_none() {
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
    }

    #[tokio::test]
    async fn summary_normalizes_cycles() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_subscription(&db, "Stream", 12.0, "monthly", "2099-01-01", Some("media")).await;
        seed_subscription(&db, "Backup", 120.0, "yearly", "2099-01-01", Some("tools")).await;

        let summary = get_summary(&db, 1).await.expect("summary failed");
        assert_eq!(summary.active_count, 2);
        assert_eq!(summary.total_monthly, 22.0);
        assert_eq!(summary.total_yearly, 264.0);
        assert_eq!(summary.category_breakdown.len(), 2);
        assert_eq!(summary.category_breakdown[0].category, "media");
        assert!(summary.upcoming_renewals.is_empty());
    }

    #[tokio::test]
    async fn due_billing_rolls_forward_past_cycles() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_subscription(&db, "Gym", 30.0, "monthly", "2025-01-10", None).await;

        let today = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let advanced = process_due_billing(&db, today).await.expect("billing failed");
        assert_eq!(advanced, 1);

        let s = Subscription::find().one(&db).await.expect("db").unwrap();
        assert_eq!(s.next_billing_date, "2025-04-10");

        // Nothing due on a second pass
        let advanced = process_due_billing(&db, today).await.expect("billing failed");
        assert_eq!(advanced, 0);
    }
}
