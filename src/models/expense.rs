use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub category_id: Option<i32>,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub expense_date: String, // YYYY-MM-DD
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<String>, // 'daily', 'weekly', 'monthly', 'yearly'
    pub next_occurrence: Option<String>,
    pub deleted_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExpenseDto {
    pub user_id: i32,
    pub category_id: Option<i32>,
    pub amount: f64,
    pub currency: Option<String>,
    pub description: String,
    pub expense_date: String,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    pub is_recurring: Option<bool>,
    pub recurring_frequency: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateExpenseDto {
    pub category_id: Option<i32>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub expense_date: Option<String>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}
