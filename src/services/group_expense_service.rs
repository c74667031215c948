//! Group expense service - shared expenses and their splits.
//!
//! Creating or editing an expense always goes through the split
//! calculator, and splits are written in the same transaction as the
//! expense so the "splits sum to the amount" invariant can't be
//! observed broken.

use chrono::{Local, Utc};
use sea_orm::*;

use super::group_service;
use super::ServiceError;
use crate::domain::splits::{
    self, round2, CalculatedSplit, SplitParticipant, SplitType, AMOUNT_TOLERANCE,
};
use crate::models::expense_split::{self, Entity as ExpenseSplit};
use crate::models::group_expense::{
    self, Entity as GroupExpense, GroupExpenseDto, SettleExpenseDto, UpdateGroupExpenseDto,
};

/// A group expense together with its splits.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExpenseWithSplits {
    #[serde(flatten)]
    pub expense: group_expense::Model,
    pub splits: Vec<expense_split::Model>,
}

pub async fn list_expenses(
    db: &DatabaseConnection,
    group_id: i32,
) -> Result<Vec<ExpenseWithSplits>, ServiceError> {
    let expenses = GroupExpense::find()
        .filter(group_expense::Column::GroupId.eq(group_id))
        .order_by_desc(group_expense::Column::ExpenseDate)
        .all(db)
        .await?;

    let expense_ids: Vec<i32> = expenses.iter().map(|e| e.id).collect();
    let splits = if expense_ids.is_empty() {
        vec![]
    } else {
        ExpenseSplit::find()
            .filter(expense_split::Column::GroupExpenseId.is_in(expense_ids))
            .all(db)
            .await?
    };

    Ok(expenses
        .into_iter()
        .map(|expense| {
            let expense_splits = splits
                .iter()
                .filter(|s| s.group_expense_id == expense.id)
                .cloned()
                .collect();
            ExpenseWithSplits {
                expense,
                splits: expense_splits,
            }
        })
        .collect())
}

pub async fn get_expense(
    db: &DatabaseConnection,
    group_id: i32,
    expense_id: i32,
) -> Result<ExpenseWithSplits, ServiceError> {
    let expense = GroupExpense::find_by_id(expense_id)
        .filter(group_expense::Column::GroupId.eq(group_id))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let splits = ExpenseSplit::find()
        .filter(expense_split::Column::GroupExpenseId.eq(expense.id))
        .all(db)
        .await?;

    Ok(ExpenseWithSplits { expense, splits })
}

/// Create a shared expense: membership check, split calculation,
/// validation, then expense + splits in one transaction.
pub async fn create_expense(
    db: &DatabaseConnection,
    group_id: i32,
    dto: GroupExpenseDto,
    user_id: i32,
) -> Result<ExpenseWithSplits, ServiceError> {
    let member_ids = group_service::accepted_member_ids(db, group_id).await?;

    if !member_ids.contains(&user_id) {
        return Err(ServiceError::Forbidden(
            "You are not a member of this group".to_string(),
        ));
    }

    let payer_id = dto.paid_by_user_id.unwrap_or(user_id);
    let split_type = SplitType::parse(&dto.split_type)?;

    let calculated = splits::calculate_splits(dto.amount, split_type, &dto.participants, payer_id)?;
    splits::validate_splits(dto.amount, &calculated)?;
    splits::validate_participants(&dto.participants, &member_ids)?;

    let now = Utc::now().to_rfc3339();
    let expense_date = dto
        .expense_date
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

    let txn = db.begin().await?;

    let expense = group_expense::ActiveModel {
        group_id: Set(group_id),
        paid_by_user_id: Set(payer_id),
        amount: Set(dto.amount),
        currency: Set(dto.currency.unwrap_or_else(|| "USD".to_string())),
        description: Set(dto.description),
        expense_date: Set(expense_date),
        category_id: Set(dto.category_id),
        split_type: Set(split_type.as_str().to_string()),
        notes: Set(dto.notes),
        is_settled: Set(false),
        has_adjustments: Set(calculated.iter().any(|s| s.is_rounding_adjustment)),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let saved_splits = insert_splits(&txn, expense.id, &calculated, &now).await?;

    txn.commit().await?;

    Ok(ExpenseWithSplits {
        expense,
        splits: saved_splits,
    })
}

/// Update an expense. Amount/split-type/participant changes recompute
/// the splits; edits are refused once settled or partially paid.
pub async fn update_expense(
    db: &DatabaseConnection,
    group_id: i32,
    expense_id: i32,
    dto: UpdateGroupExpenseDto,
    user_id: i32,
) -> Result<ExpenseWithSplits, ServiceError> {
    let existing = get_expense(db, group_id, expense_id).await?;
    let expense = existing.expense;

    let is_payer = expense.paid_by_user_id == user_id;
    let is_admin = group_service::is_group_admin(db, group_id, user_id).await?;
    if !is_payer && !is_admin {
        return Err(ServiceError::Forbidden(
            "Only the payer or admin can edit this expense".to_string(),
        ));
    }

    if expense.is_settled {
        return Err(ServiceError::InvalidState(
            "Cannot edit a fully settled expense".to_string(),
        ));
    }

    if existing.splits.iter().any(|s| s.amount_paid > 0.0) {
        return Err(ServiceError::InvalidState(
            "Cannot edit expense with partial payments. Please settle or cancel payments first."
                .to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let needs_recalculation =
        dto.amount.is_some() || dto.split_type.is_some() || dto.participants.is_some();

    if needs_recalculation {
        let new_amount = dto.amount.unwrap_or(expense.amount);
        let new_split_type = match &dto.split_type {
            Some(s) => SplitType::parse(s)?,
            None => SplitType::parse(&expense.split_type)?,
        };
        // Without an explicit participant list, re-split over the
        // existing participants with their current owed amounts
        let participants: Vec<SplitParticipant> = match dto.participants {
            Some(p) => p,
            None => existing
                .splits
                .iter()
                .map(|s| SplitParticipant {
                    user_id: s.user_id,
                    amount: Some(s.amount_owed),
                    percentage: s.percentage,
                    shares: s.shares,
                })
                .collect(),
        };

        let member_ids = group_service::accepted_member_ids(db, group_id).await?;
        let calculated =
            splits::calculate_splits(new_amount, new_split_type, &participants, expense.paid_by_user_id)?;
        splits::validate_splits(new_amount, &calculated)?;
        splits::validate_participants(&participants, &member_ids)?;

        let txn = db.begin().await?;

        ExpenseSplit::delete_many()
            .filter(expense_split::Column::GroupExpenseId.eq(expense_id))
            .exec(&txn)
            .await?;

        let mut active: group_expense::ActiveModel = expense.into();
        active.amount = Set(new_amount);
        active.split_type = Set(new_split_type.as_str().to_string());
        active.has_adjustments = Set(calculated.iter().any(|s| s.is_rounding_adjustment));
        if let Some(description) = dto.description {
            active.description = Set(description);
        }
        if let Some(date) = dto.expense_date {
            active.expense_date = Set(date);
        }
        if dto.category_id.is_some() {
            active.category_id = Set(dto.category_id);
        }
        if dto.notes.is_some() {
            active.notes = Set(dto.notes);
        }
        active.updated_at = Set(now.clone());
        let updated = active.update(&txn).await?;

        let saved_splits = insert_splits(&txn, expense_id, &calculated, &now).await?;

        txn.commit().await?;

        return Ok(ExpenseWithSplits {
            expense: updated,
            splits: saved_splits,
        });
    }

    // Simple update without split recalculation
    let mut active: group_expense::ActiveModel = expense.into();
    if let Some(description) = dto.description {
        active.description = Set(description);
    }
    if let Some(date) = dto.expense_date {
        active.expense_date = Set(date);
    }
    if dto.category_id.is_some() {
        active.category_id = Set(dto.category_id);
    }
    if dto.notes.is_some() {
        active.notes = Set(dto.notes);
    }
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    Ok(ExpenseWithSplits {
        expense: updated,
        splits: existing.splits,
    })
}

pub async fn delete_expense(
    db: &DatabaseConnection,
    group_id: i32,
    expense_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    let existing = get_expense(db, group_id, expense_id).await?;

    let is_payer = existing.expense.paid_by_user_id == user_id;
    let is_admin = group_service::is_group_admin(db, group_id, user_id).await?;
    if !is_payer && !is_admin {
        return Err(ServiceError::Forbidden(
            "Only the payer or admin can delete this expense".to_string(),
        ));
    }

    if existing.expense.is_settled {
        return Err(ServiceError::InvalidState(
            "Cannot delete a settled expense".to_string(),
        ));
    }

    let txn = db.begin().await?;
    ExpenseSplit::delete_many()
        .filter(expense_split::Column::GroupExpenseId.eq(expense_id))
        .exec(&txn)
        .await?;
    GroupExpense::delete_by_id(expense_id).exec(&txn).await?;
    txn.commit().await?;

    Ok(())
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SettleOutcome {
    pub amount_paid: f64,
    pub remaining_owed: f64,
    pub is_fully_paid: bool,
    pub expense_settled: bool,
}

/// Record a payment against one member's split. Overpayment is
/// rejected; when every split is paid the expense flips to settled.
pub async fn settle_expense(
    db: &DatabaseConnection,
    group_id: i32,
    expense_id: i32,
    dto: SettleExpenseDto,
) -> Result<SettleOutcome, ServiceError> {
    let existing = get_expense(db, group_id, expense_id).await?;

    let split = existing
        .splits
        .iter()
        .find(|s| s.user_id == dto.user_id)
        .ok_or_else(|| ServiceError::Validation("User is not part of this expense".to_string()))?;

    let remaining_owed = round2(split.amount_owed - split.amount_paid);
    if dto.amount > remaining_owed + AMOUNT_TOLERANCE {
        return Err(ServiceError::Validation(format!(
            "Overpayment detected. Remaining owed: {:.2}, Payment: {:.2}",
            remaining_owed, dto.amount
        )));
    }

    let now = Utc::now().to_rfc3339();
    let new_amount_paid = round2(split.amount_paid + dto.amount);
    let is_fully_paid = new_amount_paid >= split.amount_owed - AMOUNT_TOLERANCE;

    let mut active: expense_split::ActiveModel = split.clone().into();
    active.amount_paid = Set(new_amount_paid);
    active.is_paid = Set(is_fully_paid || dto.mark_as_fully_paid);
    if is_fully_paid {
        active.paid_at = Set(Some(now.clone()));
    }
    active.updated_at = Set(now.clone());
    active.update(db).await?;

    // Expense settles when the last open split is paid
    let all_splits = ExpenseSplit::find()
        .filter(expense_split::Column::GroupExpenseId.eq(expense_id))
        .all(db)
        .await?;
    let all_paid = all_splits.iter().all(|s| s.is_paid);

    if all_paid {
        let mut expense_active: group_expense::ActiveModel = existing.expense.into();
        expense_active.is_settled = Set(true);
        expense_active.updated_at = Set(now);
        expense_active.update(db).await?;
    }

    Ok(SettleOutcome {
        amount_paid: dto.amount,
        remaining_owed: round2((remaining_owed - dto.amount).max(0.0)),
        is_fully_paid,
        expense_settled: all_paid,
    })
}

async fn insert_splits(
    txn: &DatabaseTransaction,
    expense_id: i32,
    calculated: &[CalculatedSplit],
    now: &str,
) -> Result<Vec<expense_split::Model>, ServiceError> {
    let mut saved = Vec::with_capacity(calculated.len());
    for split in calculated {
        let model = expense_split::ActiveModel {
            group_expense_id: Set(expense_id),
            user_id: Set(split.user_id),
            amount_owed: Set(split.amount_owed),
            amount_paid: Set(0.0),
            percentage: Set(Some(split.percentage)),
            shares: Set(split.shares),
            calculated_amount: Set(split.calculated_amount),
            adjustment_amount: Set(split.adjustment_amount),
            is_rounding_adjustment: Set(split.is_rounding_adjustment),
            is_paid: Set(false),
            paid_at: Set(None),
            created_at: Set(now.to_owned()),
            updated_at: Set(now.to_owned()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
        saved.push(model);
    }
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::{group, group_member, user};

    async fn setup_group(db: &DatabaseConnection) -> i32 {
        let now = Utc::now().to_rfc3339();

        for (username, email) in [
            ("alice", "alice@example.com"),
            ("bob", "bob@example.com"),
            ("carol", "carol@example.com"),
        ] {
            user::ActiveModel {
                username: Set(username.to_owned()),
                email: Set(email.to_owned()),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("Failed to insert user");
        }

        let group = group::ActiveModel {
            name: Set("Trip".to_owned()),
            description: Set(None),
            currency: Set("USD".to_owned()),
            icon: Set(None),
            color: Set(None),
            created_by: Set(1),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("Failed to insert group");

        for (user_id, role) in [(1, "admin"), (2, "member"), (3, "member")] {
            group_member::ActiveModel {
                group_id: Set(group.id),
                user_id: Set(user_id),
                role: Set(role.to_owned()),
                invite_status: Set("accepted".to_owned()),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("Failed to insert member");
        }

        group.id
    }

    fn equal_dto(amount: f64, participants: &[i32]) -> GroupExpenseDto {
        GroupExpenseDto {
            amount,
            currency: None,
            description: "Dinner".to_owned(),
            expense_date: Some("2025-03-10".to_owned()),
            category_id: None,
            notes: None,
            paid_by_user_id: None,
            split_type: "equal".to_owned(),
            participants: participants
                .iter()
                .map(|id| SplitParticipant {
                    user_id: *id,
                    amount: None,
                    percentage: None,
                    shares: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn create_expense_persists_splits_that_sum_to_amount() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let group_id = setup_group(&db).await;

        let result = create_expense(&db, group_id, equal_dto(100.0, &[1, 2, 3]), 1)
            .await
            .expect("create failed");

        assert_eq!(result.splits.len(), 3);
        let sum: f64 = result.splits.iter().map(|s| s.amount_owed).sum();
        assert_eq!(round2(sum), 100.0);
        assert!(result.expense.has_adjustments);

        // Payer absorbed the rounding cent
        let payer_split = result.splits.iter().find(|s| s.user_id == 1).unwrap();
        assert_eq!(payer_split.amount_owed, 33.34);
    }

    #[tokio::test]
    async fn non_member_cannot_create_expense() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let group_id = setup_group(&db).await;

        let err = create_expense(&db, group_id, equal_dto(50.0, &[1, 2]), 99)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn settle_flow_marks_expense_settled_when_all_paid() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let group_id = setup_group(&db).await;

        let created = create_expense(&db, group_id, equal_dto(60.0, &[1, 2]), 1)
            .await
            .expect("create failed");

        // Overpayment rejected
        let err = settle_expense(
            &db,
            group_id,
            created.expense.id,
            SettleExpenseDto {
                user_id: 2,
                amount: 31.0,
                mark_as_fully_paid: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // Partial then final payment
        let partial = settle_expense(
            &db,
            group_id,
            created.expense.id,
            SettleExpenseDto {
                user_id: 2,
                amount: 10.0,
                mark_as_fully_paid: false,
            },
        )
        .await
        .expect("partial settle failed");
        assert!(!partial.is_fully_paid);
        assert_eq!(partial.remaining_owed, 20.0);

        settle_expense(
            &db,
            group_id,
            created.expense.id,
            SettleExpenseDto {
                user_id: 2,
                amount: 20.0,
                mark_as_fully_paid: false,
            },
        )
        .await
        .expect("final settle failed");

        let outcome = settle_expense(
            &db,
            group_id,
            created.expense.id,
            SettleExpenseDto {
                user_id: 1,
                amount: 30.0,
                mark_as_fully_paid: false,
            },
        )
        .await
        .expect("payer settle failed");

        assert!(outcome.expense_settled);

        let expense = get_expense(&db, group_id, created.expense.id)
            .await
            .expect("get failed");
        assert!(expense.expense.is_settled);
    }

    #[tokio::test]
    async fn cannot_edit_expense_with_partial_payments() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let group_id = setup_group(&db).await;

        let created = create_expense(&db, group_id, equal_dto(60.0, &[1, 2]), 1)
            .await
            .expect("create failed");

        settle_expense(
            &db,
            group_id,
            created.expense.id,
            SettleExpenseDto {
                user_id: 2,
                amount: 5.0,
                mark_as_fully_paid: false,
            },
        )
        .await
        .expect("settle failed");

        let err = update_expense(
            &db,
            group_id,
            created.expense.id,
            UpdateGroupExpenseDto {
                amount: Some(80.0),
                ..Default::default()
            },
            1,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn update_recalculates_splits() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        let group_id = setup_group(&db).await;

        let created = create_expense(&db, group_id, equal_dto(60.0, &[1, 2]), 1)
            .await
            .expect("create failed");

        let updated = update_expense(
            &db,
            group_id,
            created.expense.id,
            UpdateGroupExpenseDto {
                amount: Some(90.0),
                split_type: Some("equal".to_owned()),
                participants: Some(
                    [1, 2, 3]
                        .iter()
                        .map(|id| SplitParticipant {
                            user_id: *id,
                            amount: None,
                            percentage: None,
                            shares: None,
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            1,
        )
        .await
        .expect("update failed");

        assert_eq!(updated.expense.amount, 90.0);
        assert_eq!(updated.splits.len(), 3);
        assert!(updated.splits.iter().all(|s| s.amount_owed == 30.0));
    }
}
