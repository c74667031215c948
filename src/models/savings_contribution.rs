use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings_contributions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub savings_goal_id: i32,
    pub amount: f64,
    pub contribution_date: String, // YYYY-MM-DD
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::savings_goal::Entity",
        from = "Column::SavingsGoalId",
        to = "super::savings_goal::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    SavingsGoal,
}

impl Related<super::savings_goal::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavingsGoal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContributionDto {
    pub amount: f64,
    pub contribution_date: String,
    pub notes: Option<String>,
}
