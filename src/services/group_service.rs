//! Group service - groups, membership, balances and settlements.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::*;

use super::ServiceError;
use crate::domain::balances::{
    self, BalanceDisplay, ExpenseWithShares, MemberBalance, ShareEntry,
};
use crate::domain::settlement::{self, Transfer};
use crate::domain::splits::round2;
use crate::models::expense_split::{self, Entity as ExpenseSplit};
use crate::models::group::{self, Entity as Group, GroupDto};
use crate::models::group_expense::{self, Entity as GroupExpense};
use crate::models::group_member::{self, Entity as GroupMember};
use crate::models::settlement::{self as settlement_model, Entity as Settlement, SettlementDto};
use crate::models::user::{self, Entity as User};

/// A group with its member rows and usernames.
#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupWithMembers {
    #[serde(flatten)]
    pub group: group::Model,
    pub members: Vec<MemberView>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MemberView {
    pub user_id: i32,
    pub username: String,
    pub role: String,
    pub invite_status: String,
}

pub async fn create_group(
    db: &DatabaseConnection,
    dto: GroupDto,
    user_id: i32,
) -> Result<GroupWithMembers, ServiceError> {
    let now = Utc::now().to_rfc3339();

    let txn = db.begin().await?;

    let saved = group::ActiveModel {
        name: Set(dto.name),
        description: Set(dto.description),
        currency: Set(dto.currency.unwrap_or_else(|| "USD".to_string())),
        icon: Set(dto.icon),
        color: Set(dto.color),
        created_by: Set(user_id),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // Creator joins as admin
    group_member::ActiveModel {
        group_id: Set(saved.id),
        user_id: Set(user_id),
        role: Set("admin".to_string()),
        invite_status: Set("accepted".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    get_group(db, saved.id).await
}

pub async fn get_group(
    db: &DatabaseConnection,
    group_id: i32,
) -> Result<GroupWithMembers, ServiceError> {
    let group = Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let members = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .find_also_related(User)
        .all(db)
        .await?;

    let members = members
        .into_iter()
        .map(|(member, user)| MemberView {
            user_id: member.user_id,
            username: user.map(|u| u.username).unwrap_or_else(|| "Unknown".to_string()),
            role: member.role,
            invite_status: member.invite_status,
        })
        .collect();

    Ok(GroupWithMembers { group, members })
}

pub async fn list_groups(
    db: &DatabaseConnection,
    user_id: i32,
) -> Result<Vec<GroupWithMembers>, ServiceError> {
    let memberships = GroupMember::find()
        .filter(group_member::Column::UserId.eq(user_id))
        .filter(group_member::Column::InviteStatus.eq("accepted"))
        .all(db)
        .await?;

    let mut groups = Vec::with_capacity(memberships.len());
    for membership in memberships {
        groups.push(get_group(db, membership.group_id).await?);
    }
    Ok(groups)
}

pub async fn update_group(
    db: &DatabaseConnection,
    group_id: i32,
    dto: GroupDto,
    user_id: i32,
) -> Result<GroupWithMembers, ServiceError> {
    require_admin(db, group_id, user_id).await?;

    let group = Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let mut active: group::ActiveModel = group.into();
    active.name = Set(dto.name);
    active.description = Set(dto.description);
    if let Some(currency) = dto.currency {
        active.currency = Set(currency);
    }
    active.icon = Set(dto.icon);
    active.color = Set(dto.color);
    active.updated_at = Set(Utc::now().to_rfc3339());
    active.update(db).await?;

    get_group(db, group_id).await
}

pub async fn delete_group(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    require_admin(db, group_id, user_id).await?;

    let txn = db.begin().await?;

    let expense_ids: Vec<i32> = GroupExpense::find()
        .filter(group_expense::Column::GroupId.eq(group_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|e| e.id)
        .collect();

    if !expense_ids.is_empty() {
        ExpenseSplit::delete_many()
            .filter(expense_split::Column::GroupExpenseId.is_in(expense_ids))
            .exec(&txn)
            .await?;
    }
    GroupExpense::delete_many()
        .filter(group_expense::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?;
    Settlement::delete_many()
        .filter(settlement_model::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?;
    GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(group_id))
        .exec(&txn)
        .await?;
    Group::delete_by_id(group_id).exec(&txn).await?;

    txn.commit().await?;
    Ok(())
}

pub async fn add_member(
    db: &DatabaseConnection,
    group_id: i32,
    new_user_id: i32,
    role: Option<String>,
    acting_user_id: i32,
) -> Result<GroupWithMembers, ServiceError> {
    require_admin(db, group_id, acting_user_id).await?;

    User::find_by_id(new_user_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let existing = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(new_user_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::Validation(
            "User is already a member of this group".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    group_member::ActiveModel {
        group_id: Set(group_id),
        user_id: Set(new_user_id),
        role: Set(role.unwrap_or_else(|| "member".to_string())),
        invite_status: Set("accepted".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    get_group(db, group_id).await
}

/// Leave a group. Refused while the member still owes money or is the
/// only admin.
pub async fn leave_group(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    let members = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .all(db)
        .await?;

    let member = members
        .iter()
        .find(|m| m.user_id == user_id)
        .ok_or(ServiceError::NotFound)?;

    let admins: Vec<&group_member::Model> = members
        .iter()
        .filter(|m| m.role == "admin" && m.invite_status == "accepted")
        .collect();
    if admins.len() == 1 && member.role == "admin" {
        return Err(ServiceError::Validation(
            "You are the only admin. Please assign another admin before leaving.".to_string(),
        ));
    }

    let balances = load_balances(db, group_id).await?;
    let user_balance = balances::user_balance(&balances, user_id);
    if user_balance < -0.01 {
        return Err(ServiceError::Validation(format!(
            "You cannot leave the group with outstanding debts. You owe {:.2}. Please settle your debts first.",
            user_balance.abs()
        )));
    }

    GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(user_id))
        .exec(db)
        .await?;

    Ok(())
}

pub async fn remove_member(
    db: &DatabaseConnection,
    group_id: i32,
    target_user_id: i32,
    acting_user_id: i32,
) -> Result<(), ServiceError> {
    require_admin(db, group_id, acting_user_id).await?;

    let balances = load_balances(db, group_id).await?;
    let balance = balances::user_balance(&balances, target_user_id);
    if balance.abs() > 0.01 {
        return Err(ServiceError::Validation(format!(
            "Member has an unsettled balance of {:.2} and cannot be removed",
            balance
        )));
    }

    let deleted = GroupMember::delete_many()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(target_user_id))
        .exec(db)
        .await?;

    if deleted.rows_affected == 0 {
        return Err(ServiceError::NotFound);
    }
    Ok(())
}

// ==================== BALANCES & SETTLEMENTS ====================

#[derive(Debug, Clone, serde::Serialize)]
pub struct MemberBalanceView {
    pub user_id: i32,
    pub username: String,
    pub total_paid: f64,
    pub total_owed: f64,
    pub balance: f64,
    pub formatted: BalanceDisplay,
}

pub async fn get_balances(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<Vec<MemberBalanceView>, ServiceError> {
    verify_membership(db, group_id, user_id).await?;

    let group = Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let balances = load_balances(db, group_id).await?;
    let usernames = load_usernames(db, balances.keys().copied().collect()).await?;

    let mut views: Vec<MemberBalanceView> = balances
        .values()
        .map(|b| MemberBalanceView {
            user_id: b.user_id,
            username: usernames
                .get(&b.user_id)
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string()),
            total_paid: b.total_paid,
            total_owed: b.total_owed,
            balance: b.balance,
            formatted: balances::format_balance(b.balance, &group.currency),
        })
        .collect();
    views.sort_by_key(|v| v.user_id);

    Ok(views)
}

pub async fn get_user_balance(
    db: &DatabaseConnection,
    group_id: i32,
    target_user_id: i32,
    user_id: i32,
) -> Result<MemberBalanceView, ServiceError> {
    let views = get_balances(db, group_id, user_id).await?;
    if let Some(view) = views.into_iter().find(|v| v.user_id == target_user_id) {
        return Ok(view);
    }

    // A member with no expenses yet is simply settled up
    let member_ids = accepted_member_ids(db, group_id).await?;
    if !member_ids.contains(&target_user_id) {
        return Err(ServiceError::NotFound);
    }

    let group = Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;
    let usernames = load_usernames(db, vec![target_user_id]).await?;

    Ok(MemberBalanceView {
        user_id: target_user_id,
        username: usernames
            .get(&target_user_id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string()),
        total_paid: 0.0,
        total_owed: 0.0,
        balance: 0.0,
        formatted: balances::format_balance(0.0, &group.currency),
    })
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct TransferView {
    pub from_user_id: i32,
    pub from_username: String,
    pub to_user_id: i32,
    pub to_username: String,
    pub amount: f64,
}

/// Minimal transfer list settling the whole group.
pub async fn get_simplified_debts(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<Vec<TransferView>, ServiceError> {
    verify_membership(db, group_id, user_id).await?;

    let balances = load_balances(db, group_id).await?;
    let transfers = settlement::simplify_debts(&balances);

    let mut ids: Vec<i32> = Vec::new();
    for t in &transfers {
        ids.push(t.from_user_id);
        ids.push(t.to_user_id);
    }
    ids.sort_unstable();
    ids.dedup();
    let usernames = load_usernames(db, ids).await?;

    let name = |id: i32| {
        usernames
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    };

    Ok(transfers
        .iter()
        .map(|t: &Transfer| TransferView {
            from_user_id: t.from_user_id,
            from_username: name(t.from_user_id),
            to_user_id: t.to_user_id,
            to_username: name(t.to_user_id),
            amount: t.amount,
        })
        .collect())
}

pub async fn record_settlement(
    db: &DatabaseConnection,
    group_id: i32,
    dto: SettlementDto,
    user_id: i32,
) -> Result<settlement_model::Model, ServiceError> {
    verify_membership(db, group_id, user_id).await?;

    if dto.amount <= 0.0 {
        return Err(ServiceError::Validation(
            "Settlement amount must be greater than 0".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    let saved = settlement_model::ActiveModel {
        group_id: Set(group_id),
        from_user_id: Set(dto.from_user_id),
        to_user_id: Set(dto.to_user_id),
        amount: Set(round2(dto.amount)),
        currency: Set(dto.currency.unwrap_or_else(|| "USD".to_string())),
        settled_at: Set(now.clone()),
        notes: Set(dto.notes),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(saved)
}

pub async fn list_settlements(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<Vec<settlement_model::Model>, ServiceError> {
    verify_membership(db, group_id, user_id).await?;

    let settlements = Settlement::find()
        .filter(settlement_model::Column::GroupId.eq(group_id))
        .order_by_desc(settlement_model::Column::SettledAt)
        .all(db)
        .await?;

    Ok(settlements)
}

// ==================== STATISTICS ====================

#[derive(Debug, Clone, serde::Serialize)]
pub struct MonthlyStat {
    pub month: String, // YYYY-MM
    pub total: f64,
    pub count: u64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GroupStatistics {
    pub expense_count: u64,
    pub total_spending: f64,
    pub your_total_spending: f64,
    pub your_share: f64,
    pub average_expense: f64,
    pub category_breakdown: HashMap<String, f64>,
    pub monthly: Vec<MonthlyStat>,
}

pub async fn get_statistics(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<GroupStatistics, ServiceError> {
    verify_membership(db, group_id, user_id).await?;

    let expenses = GroupExpense::find()
        .filter(group_expense::Column::GroupId.eq(group_id))
        .all(db)
        .await?;

    let expense_count = expenses.len() as u64;
    let total_spending: f64 = expenses.iter().map(|e| e.amount).sum();
    let your_total_spending: f64 = expenses
        .iter()
        .filter(|e| e.paid_by_user_id == user_id)
        .map(|e| e.amount)
        .sum();
    let average_expense = if expense_count > 0 {
        total_spending / expense_count as f64
    } else {
        0.0
    };

    let expense_ids: Vec<i32> = expenses.iter().map(|e| e.id).collect();
    let your_share: f64 = if expense_ids.is_empty() {
        0.0
    } else {
        ExpenseSplit::find()
            .filter(expense_split::Column::GroupExpenseId.is_in(expense_ids))
            .filter(expense_split::Column::UserId.eq(user_id))
            .all(db)
            .await?
            .iter()
            .map(|s| s.amount_owed)
            .sum()
    };

    // Category breakdown by name
    let category_ids: Vec<i32> = expenses.iter().filter_map(|e| e.category_id).collect();
    let categories = if category_ids.is_empty() {
        vec![]
    } else {
        crate::models::category::Entity::find()
            .filter(crate::models::category::Column::Id.is_in(category_ids))
            .all(db)
            .await?
    };
    let category_names: HashMap<i32, String> =
        categories.into_iter().map(|c| (c.id, c.name)).collect();

    let mut category_breakdown: HashMap<String, f64> = HashMap::new();
    for expense in &expenses {
        let name = expense
            .category_id
            .and_then(|id| category_names.get(&id).cloned())
            .unwrap_or_else(|| "Uncategorized".to_string());
        let entry = category_breakdown.entry(name).or_insert(0.0);
        *entry = round2(*entry + expense.amount);
    }

    // Monthly series keyed on the YYYY-MM prefix of the expense date
    let mut by_month: HashMap<String, (f64, u64)> = HashMap::new();
    for expense in &expenses {
        let month = expense
            .expense_date
            .get(..7)
            .unwrap_or(&expense.expense_date)
            .to_string();
        let entry = by_month.entry(month).or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
    }
    let mut monthly: Vec<MonthlyStat> = by_month
        .into_iter()
        .map(|(month, (total, count))| MonthlyStat {
            month,
            total: round2(total),
            count,
        })
        .collect();
    monthly.sort_by(|a, b| a.month.cmp(&b.month));

    Ok(GroupStatistics {
        expense_count,
        total_spending: round2(total_spending),
        your_total_spending: round2(your_total_spending),
        your_share: round2(your_share),
        average_expense: round2(average_expense),
        category_breakdown,
        monthly,
    })
}

// ==================== HELPERS ====================

/// Ids of accepted members of a group. NotFound when the group doesn't
/// exist.
pub async fn accepted_member_ids(
    db: &DatabaseConnection,
    group_id: i32,
) -> Result<Vec<i32>, ServiceError> {
    Group::find_by_id(group_id)
        .one(db)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let members = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::InviteStatus.eq("accepted"))
        .all(db)
        .await?;

    Ok(members.into_iter().map(|m| m.user_id).collect())
}

pub async fn verify_membership(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    let member_ids = accepted_member_ids(db, group_id).await?;
    if !member_ids.contains(&user_id) {
        return Err(ServiceError::Forbidden(
            "You are not a member of this group".to_string(),
        ));
    }
    Ok(())
}

pub async fn is_group_admin(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<bool, ServiceError> {
    let member = GroupMember::find()
        .filter(group_member::Column::GroupId.eq(group_id))
        .filter(group_member::Column::UserId.eq(user_id))
        .filter(group_member::Column::InviteStatus.eq("accepted"))
        .one(db)
        .await?;

    Ok(member.map(|m| m.role == "admin").unwrap_or(false))
}

async fn require_admin(
    db: &DatabaseConnection,
    group_id: i32,
    user_id: i32,
) -> Result<(), ServiceError> {
    if !is_group_admin(db, group_id, user_id).await? {
        return Err(ServiceError::Forbidden(
            "Only a group admin can do that".to_string(),
        ));
    }
    Ok(())
}

/// Load the group's expenses with their splits and net the balances.
pub async fn load_balances(
    db: &DatabaseConnection,
    group_id: i32,
) -> Result<HashMap<i32, MemberBalance>, ServiceError> {
    let expenses = GroupExpense::find()
        .filter(group_expense::Column::GroupId.eq(group_id))
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

    let with_shares: Vec<ExpenseWithShares> = expenses
        .iter()
        .map(|expense| ExpenseWithShares {
            amount: expense.amount,
            paid_by_user_id: Some(expense.paid_by_user_id),
            shares: splits
                .iter()
                .filter(|s| s.group_expense_id == expense.id)
                .map(|s| ShareEntry {
                    user_id: s.user_id,
                    amount_owed: s.amount_owed,
                })
                .collect(),
        })
        .collect();

    Ok(balances::calculate_group_balances(&with_shares))
}

async fn load_usernames(
    db: &DatabaseConnection,
    ids: Vec<i32>,
) -> Result<HashMap<i32, String>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = User::find()
        .filter(user::Column::Id.is_in(ids))
        .all(db)
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.username)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::domain::splits::SplitParticipant;
    use crate::models::group_expense::GroupExpenseDto;
    use crate::services::group_expense_service;

    async fn seed_users(db: &DatabaseConnection, names: &[&str]) {
        let now = Utc::now().to_rfc3339();
        for name in names {
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

    fn group_dto(name: &str) -> GroupDto {
        GroupDto {
            name: name.to_string(),
            description: None,
            currency: Some("USD".to_string()),
            icon: None,
            color: None,
        }
    }

    fn equal_expense(amount: f64, payer: i32, participants: &[i32]) -> GroupExpenseDto {
        GroupExpenseDto {
            amount,
            currency: None,
            description: "Groceries".to_string(),
            expense_date: Some("2025-04-01".to_string()),
            category_id: None,
            notes: None,
            paid_by_user_id: Some(payer),
            split_type: "equal".to_string(),
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
    async fn creator_becomes_admin_and_can_add_members() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db, &["alice", "bob"]).await;

        let group = create_group(&db, group_dto("Flat"), 1).await.expect("create failed");
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].role, "admin");

        let group = add_member(&db, group.group.id, 2, None, 1)
            .await
            .expect("add failed");
        assert_eq!(group.members.len(), 2);

        // Non-admin cannot add
        let err = add_member(&db, group.group.id, 2, None, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_) | ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn balances_and_simplified_debts_agree() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db, &["alice", "bob", "carol"]).await;

        let group = create_group(&db, group_dto("Trip"), 1).await.expect("create failed");
        add_member(&db, group.group.id, 2, None, 1).await.expect("add failed");
        add_member(&db, group.group.id, 3, None, 1).await.expect("add failed");

        // Alice pays 90 for everyone
        group_expense_service::create_expense(
            &db,
            group.group.id,
            equal_expense(90.0, 1, &[1, 2, 3]),
            1,
        )
        .await
        .expect("expense failed");

        let balances = get_balances(&db, group.group.id, 1).await.expect("balances failed");
        let alice = balances.iter().find(|b| b.user_id == 1).unwrap();
        assert_eq!(alice.balance, 60.0);
        assert!(alice.formatted.text.contains("gets back"));

        let debts = get_simplified_debts(&db, group.group.id, 1)
            .await
            .expect("debts failed");
        assert_eq!(debts.len(), 2);
        assert!(debts.iter().all(|d| d.to_user_id == 1));
        let total: f64 = debts.iter().map(|d| d.amount).sum();
        assert_eq!(round2(total), 60.0);
    }

    #[tokio::test]
    async fn leaving_with_debt_is_refused() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db, &["alice", "bob"]).await;

        let group = create_group(&db, group_dto("Flat"), 1).await.expect("create failed");
        add_member(&db, group.group.id, 2, None, 1).await.expect("add failed");

        group_expense_service::create_expense(
            &db,
            group.group.id,
            equal_expense(50.0, 1, &[1, 2]),
            1,
        )
        .await
        .expect("expense failed");

        let err = leave_group(&db, group.group.id, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        // Only admin cannot leave either
        let err = leave_group(&db, group.group.id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn settlements_are_recorded_and_listed() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db, &["alice", "bob"]).await;

        let group = create_group(&db, group_dto("Flat"), 1).await.expect("create failed");
        add_member(&db, group.group.id, 2, None, 1).await.expect("add failed");

        record_settlement(
            &db,
            group.group.id,
            SettlementDto {
                from_user_id: 2,
                to_user_id: 1,
                amount: 25.0,
                currency: None,
                notes: Some("venmo".to_string()),
            },
            1,
        )
        .await
        .expect("settlement failed");

        let settlements = list_settlements(&db, group.group.id, 1)
            .await
            .expect("list failed");
        assert_eq!(settlements.len(), 1);
        assert_eq!(settlements[0].amount, 25.0);

        let err = record_settlement(
            &db,
            group.group.id,
            SettlementDto {
                from_user_id: 2,
                to_user_id: 1,
                amount: 0.0,
                currency: None,
                notes: None,
            },
            1,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn statistics_aggregate_spending() {
        let db = init_db("sqlite::memory:").await.expect("Failed to init db");
        seed_users(&db, &["alice", "bob"]).await;

        let group = create_group(&db, group_dto("Flat"), 1).await.expect("create failed");
        add_member(&db, group.group.id, 2, None, 1).await.expect("add failed");

        group_expense_service::create_expense(
            &db,
            group.group.id,
            equal_expense(40.0, 1, &[1, 2]),
            1,
        )
        .await
        .expect("expense failed");
        group_expense_service::create_expense(
            &db,
            group.group.id,
            equal_expense(60.0, 2, &[1, 2]),
            2,
        )
        .await
        .expect("expense failed");

        let stats = get_statistics(&db, group.group.id, 1).await.expect("stats failed");
        assert_eq!(stats.expense_count, 2);
        assert_eq!(stats.total_spending, 100.0);
        assert_eq!(stats.your_total_spending, 40.0);
        assert_eq!(stats.your_share, 50.0);
        assert_eq!(stats.average_expense, 50.0);
        assert_eq!(stats.category_breakdown.get("Uncategorized"), Some(&100.0));
        assert_eq!(stats.monthly.len(), 1);
        assert_eq!(stats.monthly[0].month, "2025-04");
        assert_eq!(stats.monthly[0].total, 100.0);
        assert_eq!(stats.monthly[0].count, 2);
    }
}
