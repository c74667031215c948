//! Loan service - person-to-person loans and their adjustment history.

use chrono::{Local, Utc};
use sea_orm::*;

use super::ServiceError;
use crate::domain::splits::round2;
use crate::models::loan::{self, Entity as Loan, LoanDto};
use crate::models::loan_adjustment::{self, Entity as LoanAdjustment, LoanAdjustmentDto};
use crate::models::user::{self, Entity as User};

/// Enriched loan with both party names.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoanWithDetails {
    #[serde(flatten)]
    pub loan: loan::Model,
    pub lender_username: String,
    pub borrower_username: String,
}

/// Filter parameters for listing loans
#[derive(Debug, Default, Clone)]
pub struct LoanFilter {
    pub user_id: i32,
    /// 'lender', 'borrower' or None for both sides
    pub role: Option<String>,
    pub status: Option<String>,
    pub overdue: bool,
}

pub async fn create_loan(db: &DatabaseConnection, dto: LoanDto) -> Result<loan::Model, ServiceError> {
    if dto.lender_user_id == dto.borrower_user_id {
        return Err(ServiceError::Validation(
            "Cannot create a loan to yourself".to_string(),
        ));
    }

    if dto.amount <= 0.0 {
        return Err(ServiceError::Validation(
            "Loan amount must be greater than 0".to_string(),
        ));
    }

    for id in [dto.lender_user_id, dto.borrower_user_id] {
        User::find_by_id(id)
            .one(db)
            .await?
            .ok_or(ServiceError::NotFound)?;
    }

    let now = Utc::now().to_rfc3339();
    let saved = loan::ActiveModel {
        lender_user_id: Set(dto.lender_user_id),
        borrower_user_id: Set(dto.borrower_user_id),
        amount: Set(dto.amount),
        currency: Set(dto.currency.unwrap_or_else(|| "USD".to_string())),
        description: Set(dto.description),
        loan_date: Set(dto.loan_date),
        due_date: Set(dto.due_date),
        status: Set("active".to_string()),
        amount_paid: Set(0.0),
        amount_remaining: Set(dto.amount),
        interest_rate: Set(dto.interest_rate.unwrap_or(0.0)),
        group_id: Set(dto.group_id),
        source_type: Set(dto.source_type.unwrap_or_else(|| "manual".to_string())),
        last_payment_date: Set(None),
        is_deleted: Set(false),
        deleted_at: Set(None),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(saved)
}

pub async fn list_loans(
    db: &DatabaseConnection,
    filter: LoanFilter,
) -> Result<Vec<LoanWithDetails>, ServiceError> {
    let mut condition = Condition::all().add(loan::Column::IsDeleted.eq(false));

    match filter.role.as_deref() {
        Some("lender") => {
            condition = condition.add(loan::Column::LenderUserId.eq(filter.user_id));
        }
        Some("borrower") => {
            condition = condition.add(loan::Column::BorrowerUserId.eq(filter.user_id));
        }
        _ => {
            condition = condition.add(
                Condition::any()
                    .add(loan::Column::LenderUserId.eq(filter.user_id))
                    .add(loan::Column::BorrowerUserId.eq(filter.user_id)),
            );
        }
    }

    if let Some(status) = filter.status {
        condition = condition.add(loan::Column::Status.eq(status));
    }

    if filter.overdue {
        let today = Local::now().format("%Y-%m-%d").to_string();
        condition = condition
            .add(loan::Column::DueDate.lt(today))
            .add(loan::Column::Status.eq("active"));
    }

    let loans = Loan::find()
        .filter(condition)
        .order_by_desc(loan::Column::CreatedAt)
        .all(db)
        .await?;

    let mut user_ids: Vec<i32> = loans
        .iter()
        .flat_map(|l| [l.lender_user_id, l.borrower_user_id])
        .collect();
    user_ids.sort_unstable();
    user_ids.dedup();

    let usernames: std::collections::HashMap<i32, String> = if user_ids.is_empty() {
        Default::default()
    } else {
        User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect()
    };

    let name = |id: i32| {
        usernames
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    };

    Ok(loans
        .into_iter()
        .map(|l| LoanWithDetails {
            lender_username: name(l.lender_user_id),
            borrower_username: name(l.borrower_user_id),
            loan: l,
        })
        .collect())
}

pub async fn get_loan(
    db: &DatabaseConnection,
    loan_id: i32,
) -> Result<(loan::Model, Vec<loan_adjustment::Model>), ServiceError> {
    let loan = Loan::find_by_id(loan_id)
        .filter(loan::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let adjustments = LoanAdjustment::find()
        .filter(loan_adjustment::Column::LoanId.eq(loan_id))
        .order_by_desc(loan_adjustment::Column::CreatedAt)
        .all(db)
        .await?;

    Ok((loan, adjustments))
}

/// Soft-delete; the row stays for history.
pub async fn delete_loan(db: &DatabaseConnection, loan_id: i32) -> Result<(), ServiceError> {
    let loan = Loan::find_by_id(loan_id)
        .filter(loan::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let now = Utc::now().to_rfc3339();
    let mut active: loan::ActiveModel = loan.into();
    active.is_deleted = Set(true);
    active.deleted_at = Set(Some(now.clone()));
    active.updated_at = Set(now);
    active.update(db).await?;

    Ok(())
}

/// New paid/remaining/status after an adjustment is applied.
fn apply_adjustment_amounts(
    amount_paid: f64,
    amount_remaining: f64,
    adjustment_amount: f64,
    adjustment_type: &str,
) -> Result<(f64, f64, &'static str), ServiceError> {
    let mut paid = amount_paid;
    let mut remaining = amount_remaining;
    let mut status = "active";

    match adjustment_type {
        "payment" => {
            paid = round2(paid + adjustment_amount);
            remaining = round2(remaining - adjustment_amount);
            if remaining <= 0.0 {
                remaining = 0.0;
                status = "paid";
            }
        }
        "increase" => {
            remaining = round2(remaining + adjustment_amount);
        }
        "decrease" => {
            remaining = round2(remaining - adjustment_amount);
            if remaining <= 0.0 {
                remaining = 0.0;
                status = "paid";
            }
        }
        "waive" => {
            remaining = 0.0;
            status = "waived";
        }
        other => {
            return Err(ServiceError::Validation(format!(
                "Invalid adjustment type: {}",
                other
            )));
        }
    }

    Ok((paid, remaining, status))
}

/// Record an adjustment (payment, increase, decrease, waive) and update
/// the loan's amounts and status in one transaction.
pub async fn add_adjustment(
    db: &DatabaseConnection,
    loan_id: i32,
    dto: LoanAdjustmentDto,
) -> Result<(loan_adjustment::Model, loan::Model), ServiceError> {
    let loan = Loan::find_by_id(loan_id)
        .filter(loan::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    if dto.adjustment_type != "waive" && dto.amount <= 0.0 {
        return Err(ServiceError::Validation(
            "Adjustment amount must be greater than 0".to_string(),
        ));
    }

    if dto.adjustment_type == "payment" && dto.amount > loan.amount_remaining {
        return Err(ServiceError::Validation(
            "Payment amount cannot exceed remaining loan amount".to_string(),
        ));
    }

    let (new_paid, new_remaining, new_status) = apply_adjustment_amounts(
        loan.amount_paid,
        loan.amount_remaining,
        dto.amount,
        &dto.adjustment_type,
    )?;

    let now = Utc::now().to_rfc3339();
    let is_payment = dto.adjustment_type == "payment";
    let payment_date = dto
        .payment_date
        .clone()
        .unwrap_or_else(|| Local::now().format("%Y-%m-%d").to_string());

    let txn = db.begin().await?;

    let adjustment = loan_adjustment::ActiveModel {
        loan_id: Set(loan_id),
        adjustment_type: Set(dto.adjustment_type),
        amount: Set(dto.amount),
        currency: Set(loan.currency.clone()),
        reason: Set(dto.reason),
        notes: Set(dto.notes),
        payment_method: Set(dto.payment_method),
        payment_date: Set(Some(payment_date.clone())),
        created_by: Set(dto.created_by),
        created_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut active: loan::ActiveModel = loan.into();
    active.amount_paid = Set(new_paid);
    active.amount_remaining = Set(new_remaining);
    active.status = Set(new_status.to_string());
    if is_payment {
        active.last_payment_date = Set(Some(payment_date));
    }
    active.updated_at = Set(now);
    let updated = active.update(&txn).await?;

    txn.commit().await?;

    Ok((adjustment, updated))
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LoanStatistics {
    pub total_lent: f64,
    pub total_borrowed: f64,
    pub net_position: f64,
    pub total_lent_outstanding: f64,
    pub total_borrowed_outstanding: f64,
    pub active_count: u64,
}

pub async fn get_statistics(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<LoanStatistics, ServiceError> {
    let loans = Loan::find()
        .filter(loan::Column::IsDeleted.eq(false))
        .filter(
            Condition::any()
                .add(loan::Column::LenderUserId.eq(user_id))
                .add(loan::Column::BorrowerUserId.eq(user_id)),
        )
        .all(db)
        .await?;

    let mut stats = LoanStatistics {
        total_lent: 0.0,
        total_borrowed: 0.0,
        net_position: 0.0,
        total_lent_outstanding: 0.0,
        total_borrowed_outstanding: 0.0,
        active_count: 0,
    };

    for l in &loans {
        if l.status == "active" {
            stats.active_count += 1;
        }
        if l.lender_user_id == user_id {
            stats.total_lent += l.amount;
            stats.total_lent_outstanding += l.amount_remaining;
        } else {
            stats.total_borrowed += l.amount;
            stats.total_borrowed_outstanding += l.amount_remaining;
        }
    }

    stats.total_lent = round2(stats.total_lent);
    stats.total_borrowed = round2(stats.total_borrowed);
    stats.total_lent_outstanding = round2(stats.total_lent_outstanding);
    stats.total_borrowed_outstanding = round2(stats.total_borrowed_outstanding);
    stats.net_position = round2(stats.total_lent_outstanding - stats.total_borrowed_outstanding);

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    async fn seed_users(db: &DatabaseConnection) {
        let now = Utc::now().to_rfc3339();
        for name in ["alice", "bob"] {
            user::ActiveModel {
                username: Set(name.to_string()),
                email: Set(format!("{}@example.com", name)),
                created_at: Set(now.clone()),
                updated_at: Set(now.clone()),
                ..Default::default()
            }
            .insert(db)
            .await
            .expect("Failed to insert user");
        }
    }

    fn loan_dto(amount: f64) -> LoanDto {
        LoanDto {
            lender_user_id: 1,
            borrower_user_id: 2,
            amount,
            currency: None,
            description: Some("Rent float".to_string()),
            loan_date: "2025-05-01".to_string(),
            due_date: Some("2025-08-01".to_string()),
            interest_rate: None,
            group_id: None,
            source_type: None,
        }
    }

    fn payment(amount: f64) -> LoanAdjustmentDto {
        LoanAdjustmentDto {
            adjustment_type: "payment".to_string(),
            amount,
            reason: None,
            notes: None,
            payment_method: Some("cash".to_string()),
            payment_date: Some("2025-06-01".to_string()),
            created_by: 2,
        }
    }

    #[tokio::test]
    async fn self_loan_is_rejected() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db).await;

        let mut dto = loan_dto(100.0);
        dto.borrower_user_id = 1;
        let err = create_loan(&db, dto).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn payments_reduce_remaining_until_paid() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db).await;

        let loan = create_loan(&db, loan_dto(100.0)).await.expect("create failed");
        assert_eq!(loan.amount_remaining, 100.0);

        let (_, loan) = add_adjustment(&db, loan.id, payment(40.0))
            .await
            .expect("payment failed");
        assert_eq!(loan.amount_paid, 40.0);
        assert_eq!(loan.amount_remaining, 60.0);
        assert_eq!(loan.status, "active");
        assert_eq!(loan.last_payment_date.as_deref(), Some("2025-06-01"));

        // Overpayment rejected
        let err = add_adjustment(&db, loan.id, payment(61.0)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let (_, loan) = add_adjustment(&db, loan.id, payment(60.0))
            .await
            .expect("payment failed");
        assert_eq!(loan.amount_remaining, 0.0);
        assert_eq!(loan.status, "paid");
    }

    #[tokio::test]
    async fn waive_zeroes_the_loan() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db).await;

        let loan = create_loan(&db, loan_dto(75.0)).await.expect("create failed");
        let (adjustment, loan) = add_adjustment(
            &db,
            loan.id,
            LoanAdjustmentDto {
                adjustment_type: "waive".to_string(),
                amount: 0.0,
                reason: Some("friend".to_string()),
                notes: None,
                payment_method: None,
                payment_date: None,
                created_by: 1,
            },
        )
        .await
        .expect("waive failed");

        assert_eq!(adjustment.adjustment_type, "waive");
        assert_eq!(loan.amount_remaining, 0.0);
        assert_eq!(loan.status, "waived");
    }

    #[tokio::test]
    async fn increase_and_decrease_move_remaining() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db).await;

        let loan = create_loan(&db, loan_dto(50.0)).await.expect("create failed");

        let (_, loan) = add_adjustment(
            &db,
            loan.id,
            LoanAdjustmentDto {
                adjustment_type: "increase".to_string(),
                amount: 25.0,
                reason: None,
                notes: None,
                payment_method: None,
                payment_date: None,
                created_by: 1,
            },
        )
        .await
        .expect("increase failed");
        assert_eq!(loan.amount_remaining, 75.0);

        let (_, loan) = add_adjustment(
            &db,
            loan.id,
            LoanAdjustmentDto {
                adjustment_type: "decrease".to_string(),
                amount: 75.0,
                reason: None,
                notes: None,
                payment_method: None,
                payment_date: None,
                created_by: 1,
            },
        )
        .await
        .expect("decrease failed");
        assert_eq!(loan.amount_remaining, 0.0);
        assert_eq!(loan.status, "paid");
    }

    #[tokio::test]
    async fn statistics_net_lent_against_borrowed() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db).await;

        create_loan(&db, loan_dto(100.0)).await.expect("create failed");

        let mut reverse = loan_dto(30.0);
        reverse.lender_user_id = 2;
        reverse.borrower_user_id = 1;
        create_loan(&db, reverse).await.expect("create failed");

        let stats = get_statistics(&db, 1).await.expect("stats failed");
        assert_eq!(stats.total_lent, 100.0);
        assert_eq!(stats.total_borrowed, 30.0);
        assert_eq!(stats.net_position, 70.0);
        assert_eq!(stats.active_count, 2);

        let filtered = list_loans(
            &db,
            LoanFilter {
                user_id: 1,
                role: Some("lender".to_string()),
                status: None,
                overdue: false,
            },
        )
        .await
        .expect("list failed");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].borrower_username, "bob");
    }
}
