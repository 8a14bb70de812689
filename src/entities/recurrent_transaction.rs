//! Recurrent transaction entity - A transaction template repeated on a schedule.
//!
//! `rule` holds an RRULE body (see [`crate::core::recurrence`]). `next_occurrence`
//! is `None` once the schedule is exhausted.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Recurrent transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "recurrent_transactions")]
pub struct Model {
    /// Unique identifier for the recurrence
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Wallet each generated transaction goes to
    pub wallet_id: i64,
    /// Category of each generated transaction
    pub category_id: i64,
    /// `1` income, `0` expense
    pub direction: i32,
    /// Amount in minor units, always positive
    pub amount: i64,
    /// Description copied into each generated transaction
    pub description: String,
    /// First day of the schedule
    pub start_date: Date,
    /// Date of the last generated transaction
    pub last_occurrence: Option<Date>,
    /// Date of the next transaction to generate
    pub next_occurrence: Option<Date>,
    /// RRULE body describing the schedule
    pub rule: String,
}

/// Generated transactions point back through `transaction.recurrence_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each template books into one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
    /// Each template uses one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
