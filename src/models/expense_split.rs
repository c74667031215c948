use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "expense_splits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub group_expense_id: i32,
    pub user_id: i32,
    pub amount_owed: f64,
    pub amount_paid: f64,
    pub percentage: Option<f64>,
    pub shares: Option<f64>,
    pub calculated_amount: f64,
    pub adjustment_amount: f64,
    pub is_rounding_adjustment: bool,
    pub is_paid: bool,
    pub paid_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::group_expense::Entity",
        from = "Column::GroupExpenseId",
        to = "super::group_expense::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    GroupExpense,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::group_expense::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupExpense.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
