use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::splits::SplitParticipant;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "group_expenses")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_id: i32,
    pub paid_by_user_id: i32,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub expense_date: String, // YYYY-MM-DD
    pub category_id: Option<i32>,
    pub split_type: String, // 'equal', 'exact', 'percentage', 'shares'
    pub notes: Option<String>,
    pub is_settled: bool,
    pub has_adjustments: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group::Entity",
        from = "Column::GroupId",
        to = "super::group::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Group,
    #[sea_orm(has_many = "super::expense_split::Entity")]
    ExpenseSplit,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::expense_split::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseSplit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupExpenseDto {
    pub amount: f64,
    pub currency: Option<String>,
    pub description: String,
    pub expense_date: Option<String>,
    pub category_id: Option<i32>,
    pub notes: Option<String>,
    pub paid_by_user_id: Option<i32>,
    pub split_type: String,
    pub participants: Vec<SplitParticipant>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateGroupExpenseDto {
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub expense_date: Option<String>,
    pub category_id: Option<i32>,
    pub notes: Option<String>,
    pub split_type: Option<String>,
    pub participants: Option<Vec<SplitParticipant>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettleExpenseDto {
    pub user_id: i32,
    pub amount: f64,
    #[serde(default)]
    pub mark_as_fully_paid: bool,
}
