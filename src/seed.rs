use chrono::Utc;
use sea_orm::*;

use crate::domain::splits::SplitParticipant;
use crate::models::{category, group_expense, loan, user};
use crate::services::{group_expense_service, group_service, loan_service};

/// Seed demo users, categories, a group with split expenses and a loan.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = Utc::now().to_rfc3339();

    // 1. Users
    for (username, email) in [
        ("alice", "alice@example.com"),
        ("bob", "bob@example.com"),
        ("carol", "carol@example.com"),
    ] {
        let model = user::ActiveModel {
            username: Set(username.to_owned()),
            email: Set(email.to_owned()),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        user::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(user::Column::Username)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(db)
            .await?;
    }

    // 2. Categories
    for (name, kind) in [
        ("Groceries", "expense"),
        ("Rent", "expense"),
        ("Travel", "expense"),
        ("Dining out", "expense"),
        ("Salary", "income"),
    ] {
        let model = category::ActiveModel {
            name: Set(name.to_owned()),
            kind: Set(kind.to_owned()),
            icon: Set(None),
            color: Set(None),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        // Categories are not unique by name, only seed on an empty table
        let existing = category::Entity::find()
            .filter(category::Column::Name.eq(name))
            .one(db)
            .await?;
        if existing.is_none() {
            category::Entity::insert(model).exec(db).await?;
        }
    }

    // 3. A demo group with a couple of split expenses
    let existing_group = crate::models::group::Entity::find()
        .filter(crate::models::group::Column::Name.eq("Flat 4B"))
        .one(db)
        .await?;

    if existing_group.is_none() {
        let group = group_service::create_group(
            db,
            crate::models::group::GroupDto {
                name: "Flat 4B".to_owned(),
                description: Some("Shared flat expenses".to_owned()),
                currency: Some("USD".to_owned()),
                icon: None,
                color: None,
            },
            1,
        )
        .await
        .map_err(|e| DbErr::Custom(e.to_string()))?;

        for user_id in [2, 3] {
            group_service::add_member(db, group.group.id, user_id, None, 1)
                .await
                .map_err(|e| DbErr::Custom(e.to_string()))?;
        }

        let equal = |amount: f64, description: &str| group_expense::GroupExpenseDto {
            amount,
            currency: None,
            description: description.to_owned(),
            expense_date: None,
            category_id: Some(1),
            notes: None,
            paid_by_user_id: None,
            split_type: "equal".to_owned(),
            participants: [1, 2, 3]
                .iter()
                .map(|id| SplitParticipant {
                    user_id: *id,
                    amount: None,
                    percentage: None,
                    shares: None,
                })
                .collect(),
        };

        group_expense_service::create_expense(db, group.group.id, equal(120.0, "Groceries"), 1)
            .await
            .map_err(|e| DbErr::Custom(e.to_string()))?;
        group_expense_service::create_expense(db, group.group.id, equal(45.0, "Pizza night"), 2)
            .await
            .map_err(|e| DbErr::Custom(e.to_string()))?;
    }

    // 4. A demo loan
    let existing_loan = loan::Entity::find().one(db).await?;
    if existing_loan.is_none() {
        loan_service::create_loan(
            db,
            loan::LoanDto {
                lender_user_id: 1,
                borrower_user_id: 2,
                amount: 200.0,
                currency: None,
                description: Some("Concert tickets".to_owned()),
                loan_date: "2025-01-15".to_owned(),
                due_date: Some("2025-12-31".to_owned()),
                interest_rate: None,
                group_id: None,
                source_type: None,
            },
        )
        .await
        .map_err(|e| DbErr::Custom(e.to_string()))?;
    }

    Ok(())
}
