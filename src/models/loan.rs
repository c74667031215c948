use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub lender_user_id: i32,
    pub borrower_user_id: i32,
    pub amount: f64,
    pub currency: String,
    pub description: Option<String>,
    pub loan_date: String, // YYYY-MM-DD
    pub due_date: Option<String>,
    pub status: String, // 'active', 'paid', 'waived', 'cancelled'
    pub amount_paid: f64,
    pub amount_remaining: f64,
    pub interest_rate: f64,
    pub group_id: Option<i32>,
    pub source_type: String, // 'manual', 'group_balance'
    pub last_payment_date: Option<String>,
    pub is_deleted: bool,
    pub deleted_at: Option<String>,
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
        on_delete = "SetNull"
    )]
    Group,
    #[sea_orm(has_many = "super::loan_adjustment::Entity")]
    LoanAdjustment,
}

impl Related<super::group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Group.def()
    }
}

impl Related<super::loan_adjustment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LoanAdjustment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanDto {
    pub lender_user_id: i32,
    pub borrower_user_id: i32,
    pub amount: f64,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub loan_date: String,
    pub due_date: Option<String>,
    pub interest_rate: Option<f64>,
    pub group_id: Option<i32>,
    pub source_type: Option<String>,
}
