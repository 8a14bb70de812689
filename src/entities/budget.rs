//! Budget entity - A spending or earning limit over a date range.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Budget database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    /// Unique identifier for the budget
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `"expenses"`, `"incomes"` or `"category"`
    pub kind: String,
    /// Tracked category when `kind` is `"category"`
    pub category_id: Option<i64>,
    /// First day of the budget, inclusive
    pub start_date: Date,
    /// Last day of the budget, inclusive
    pub end_date: Date,
    /// Limit in minor units
    pub money_limit: i64,
    /// Currency of the limit; only transactions in this currency count
    pub currency: String,
}

/// Defines relationships between Budget and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Category budgets track one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
