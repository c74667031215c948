use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub current_amount: f64,
    pub currency: String,
    pub deadline: Option<String>, // YYYY-MM-DD
    pub icon: Option<String>,
    pub color: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::savings_contribution::Entity")]
    SavingsContribution,
}

impl Related<super::savings_contribution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsContribution.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct SavingsGoalDto {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: f64,
    pub currency: Option<String>,
    pub deadline: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}
