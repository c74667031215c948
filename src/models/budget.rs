use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub category_id: Option<i32>,
    pub amount: f64,
    pub spent_amount: f64,
    pub currency: String,
    pub period_type: String, // 'weekly', 'monthly', 'quarterly', 'yearly', 'custom'
    pub start_date: String,
    pub end_date: String,
    pub alert_threshold: Option<f64>, // percent of amount
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct BudgetDto {
    pub user_id: i32,
    pub category_id: Option<i32>,
    pub amount: f64,
    pub currency: Option<String>,
    pub period_type: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub alert_threshold: Option<f64>,
}
