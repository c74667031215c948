use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: String, // 'daily', 'weekly', 'monthly', 'quarterly', 'yearly'
    pub start_date: String,
    pub next_billing_date: String,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub is_active: bool,
    pub reminder_days: Option<i32>,
    pub notes: Option<String>,
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
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionDto {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub amount: f64,
    pub currency: Option<String>,
    pub billing_cycle: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub reminder_days: Option<i32>,
    pub notes: Option<String>,
}
