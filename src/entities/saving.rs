//! Saving entity - A money goal funded from a wallet.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Saving database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "savings")]
pub struct Model {
    /// Unique identifier for the saving
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable description
    pub description: String,
    /// Wallet deposits are taken from
    pub wallet_id: i64,
    /// Amount already saved when the saving was created, in minor units
    pub start_money: i64,
    /// Goal amount in minor units
    pub end_money: i64,
    /// Target date
    pub end_date: Option<Date>,
    /// Set once the goal has been reached
    pub complete: bool,
}

/// `Saving` deposits are found through `transaction.saving_id`
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each saving is funded from one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
