//! Savings goal service - contributions and progress projection.

use chrono::{Local, NaiveDate, Utc};
use sea_orm::*;

use super::ServiceError;
use crate::domain::splits::round2;
use crate::models::notification;
use crate::models::savings_contribution::{self, ContributionDto, Entity as SavingsContribution};
use crate::models::savings_goal::{self, Entity as SavingsGoal};

/// Record a contribution, bump the goal's saved amount, and mark the
/// goal completed (with a notification) when the target is reached.
pub async fn add_contribution(
    db: &DatabaseConnection,
    goal_id: i32,
    dto: ContributionDto,
) -> Result<(savings_contribution::Model, savings_goal::Model), ServiceError> {
    if dto.amount <= 0.0 {
        return Err(ServiceError::Validation(
            "Contribution amount must be greater than 0".to_string(),
        ));
    }

    let goal = SavingsGoal::find_by_id(goal_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if goal.is_completed {
        return Err(ServiceError::InvalidState(
            "Goal is already completed".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await?;

    let contribution = savings_contribution::ActiveModel {
        savings_goal_id: Set(goal_id),
        amount: Set(dto.amount),
        contribution_date: Set(dto.contribution_date),
        notes: Set(dto.notes),
        created_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let new_amount = round2(goal.current_amount + dto.amount);
    let reached_target = new_amount >= goal.target_amount;
    let goal_user_id = goal.user_id;
    let goal_name = goal.name.clone();

    let mut active: savings_goal::ActiveModel = goal.into();
    active.current_amount = Set(new_amount);
    if reached_target {
        active.is_completed = Set(true);
        active.completed_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now.clone());
    let updated = active.update(&txn).await?;

    if reached_target {
        notification::ActiveModel {
            user_id: Set(goal_user_id),
            kind: Set("goal_achieved".to_string()),
            title: Set("Savings goal reached".to_string()),
            message: Set(format!("You reached your goal \"{}\"", goal_name)),
            is_read: Set(false),
            action_url: Set(Some("/savings".to_string())),
            metadata: Set(None),
            created_at: Set(now),
            read_at: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;

    Ok((contribution, updated))
}

pub async fn list_contributions(
    db: &DatabaseConnection,
    goal_id: i32,
) -> Result<Vec<savings_contribution::Model>, ServiceError> {
    SavingsGoal::find_by_id(goal_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let contributions = SavingsContribution::find()
        .filter(savings_contribution::Column::SavingsGoalId.eq(goal_id))
        .order_by_desc(savings_contribution::Column::ContributionDate)
        .all(db)
        .await?;

    Ok(contributions)
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GoalProgress {
    pub goal_id: i32,
    pub goal_name: String,
    pub target_amount: f64,
    pub current_amount: f64,
    /// percent of target, capped at 100
    pub progress: f64,
    pub remaining: f64,
    pub days_remaining: Option<i64>,
    pub is_on_track: bool,
}

/// Progress percent, remainder, and an on-track flag: with a deadline,
/// saved-so-far must be at least proportional to the elapsed time.
pub fn goal_progress(
    goal: &savings_goal::Model,
    today: NaiveDate,
) -> GoalProgress {
    let progress = if goal.target_amount > 0.0 {
        round2((goal.current_amount / goal.target_amount * 100.0).min(100.0))
    } else {
        100.0
    };
    let remaining = round2((goal.target_amount - goal.current_amount).max(0.0));

    let deadline = goal
        .deadline
        .as_deref()
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
    let created = goal
        .created_at
        .get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

    let days_remaining = deadline.map(|d| (d - today).num_days());

    let is_on_track = match (deadline, created) {
        (Some(deadline), Some(created)) if deadline > created => {
            let total_days = (deadline - created).num_days() as f64;
            let elapsed_days = ((today - created).num_days().max(0) as f64).min(total_days);
            let expected = goal.target_amount * elapsed_days / total_days;
            goal.current_amount + 1e-9 >= expected
        }
        // No deadline (or a degenerate one): any progress counts
        _ => true,
    };

    GoalProgress {
        goal_id: goal.id,
        goal_name: goal.name.clone(),
        target_amount: goal.target_amount,
        current_amount: goal.current_amount,
        progress,
        remaining,
        days_remaining,
        is_on_track: is_on_track || goal.is_completed,
    }
}

pub async fn get_progress(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<GoalProgress>, ServiceError> {
    let goals = SavingsGoal::find()
        .filter(savings_goal::Column::UserId.eq(user_id))
        .order_by_asc(savings_goal::Column::CreatedAt)
        .all(db)
        .await?;

    let today = Local::now().date_naive();
    Ok(goals.iter().map(|g| goal_progress(g, today)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::user;

    fn goal(target: f64, current: f64, deadline: Option<&str>) -> savings_goal::Model {
        savings_goal::Model {
            id: 1,
            user_id: 1,
            name: "Vacation".to_string(),
            description: None,
            target_amount: target,
            current_amount: current,
            currency: "USD".to_string(),
            deadline: deadline.map(|s| s.to_string()),
            icon: None,
            color: None,
            is_completed: false,
            completed_at: None,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn progress_percent_and_remaining() {
        let today = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();

        let p = goal_progress(&goal(1000.0, 250.0, None), today);
        assert_eq!(p.progress, 25.0);
        assert_eq!(p.remaining, 750.0);
        assert_eq!(p.days_remaining, None);
        assert!(p.is_on_track);

        let p = goal_progress(&goal(1000.0, 1500.0, None), today);
        assert_eq!(p.progress, 100.0);
        assert_eq!(p.remaining, 0.0);
    }

    #[test]
    fn on_track_tracks_elapsed_time() {
        // Goal runs all of 2025; halfway through, 50% is expected
        let g = goal(1200.0, 500.0, Some("2025-12-31"));
        let mid = NaiveDate::from_ymd_opt(2025, 7, 2).unwrap();
        let p = goal_progress(&g, mid);
        assert!(!p.is_on_track);

        let g = goal(1200.0, 700.0, Some("2025-12-31"));
        let p = goal_progress(&g, mid);
        assert!(p.is_on_track);
        assert!(p.days_remaining.unwrap() > 0);
    }

    #[tokio::test]
    async fn contribution_completes_goal_and_notifies() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        user::ActiveModel {
            username: Set("alice".to_string()),
            email: Set("alice@example.com".to_string()),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert user");

        let g = savings_goal::ActiveModel {
            user_id: Set(1),
            name: Set("Bike".to_string()),
            description: Set(None),
            target_amount: Set(300.0),
            current_amount: Set(0.0),
            currency: Set("USD".to_string()),
            deadline: Set(None),
            icon: Set(None),
            color: Set(None),
            is_completed: Set(false),
            completed_at: Set(None),
            created_at: Set(Utc::now().to_rfc3339()),
            updated_at: Set(Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .expect("Failed to insert goal");

        let (_, g) = add_contribution(
            &db,
            g.id,
            ContributionDto {
                amount: 120.0,
                contribution_date: "2025-03-01".to_string(),
                notes: None,
            },
        )
        .await
        .expect("contribution failed");
        assert_eq!(g.current_amount, 120.0);
        assert!(!g.is_completed);

        let (_, g) = add_contribution(
            &db,
            g.id,
            ContributionDto {
                amount: 180.0,
                contribution_date: "2025-04-01".to_string(),
                notes: None,
            },
        )
        .await
        .expect("contribution failed");
        assert!(g.is_completed);
        assert!(g.completed_at.is_some());

        let notifications = notification::Entity::find().all(&db).await.expect("db");
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].kind, "goal_achieved");

        // No further contributions once completed
        let err = add_contribution(
            &db,
            g.id,
            ContributionDto {
                amount: 10.0,
                contribution_date: "2025-05-01".to_string(),
                notes: None,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));

        let contributions = list_contributions(&db, g.id).await.expect("list failed");
        assert_eq!(contributions.len(), 2);
    }
}
