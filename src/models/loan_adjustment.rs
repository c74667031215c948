use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_adjustments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub loan_id: i32,
    pub adjustment_type: String, // 'payment', 'increase', 'decrease', 'waive'
    pub amount: f64,
    pub currency: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub payment_date: Option<String>,
    pub created_by: i32,
    pub created_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::loan::Entity",
        from = "Column::LoanId",
        to = "super::loan::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Loan,
}

impl Related<super::loan::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Loan.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanAdjustmentDto {
    pub adjustment_type: String,
    pub amount: f64,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub payment_date: Option<String>,
    pub created_by: i32,
}
