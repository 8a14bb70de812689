//! Transfer entity - Money moved between two wallets.
//!
//! The money movement itself is recorded as transaction legs pointing back to the
//! transfer through `transaction.transfer_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transfer database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transfers")]
pub struct Model {
    /// Unique identifier for the transfer
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable description
    pub description: String,
    /// When the transfer happened
    pub date: DateTime,
    /// Wallet the money leaves
    pub from_wallet_id: i64,
    /// Wallet the money arrives in
    pub to_wallet_id: i64,
    /// Amount withdrawn from the source wallet, in its minor units
    pub from_amount: i64,
    /// Amount deposited in the destination wallet, in its minor units
    pub to_amount: i64,
    /// Fee charged on the source wallet, zero when none
    pub tax: i64,
    /// Free-form note
    pub note: Option<String>,
}

/// Transfer legs are found through `transaction.transfer_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
