//! Wallet entity - A named money container with a currency and a starting balance.
//!
//! The balance is never stored: it is the start money plus the signed sum of the
//! wallet's confirmed transactions.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    /// Unique identifier for the wallet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g. "Checking account")
    pub name: String,
    /// Optional icon identifier
    pub icon: Option<String>,
    /// Currency code of every amount in this wallet
    pub currency: String,
    /// Free-form note
    pub note: Option<String>,
    /// Opening balance in minor units
    pub start_money: i64,
    /// Whether this wallet contributes to the overall total
    pub count_in_total: bool,
    /// Archived wallets are hidden from lists but keep their history
    pub archived: bool,
    /// User-defined ordering
    pub sort_index: i32,
}

/// Defines relationships between Wallet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each wallet is denominated in one currency
    #[sea_orm(
        belongs_to = "super::currency::Entity",
        from = "Column::Currency",
        to = "super::currency::Column::Code"
    )]
    Currency,
    /// One wallet has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::currency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currency.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
