//! Debt entity - Money owed to someone (debt) or by someone (credit).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Debt database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "debts")]
pub struct Model {
    /// Unique identifier for the debt
    #[sea_orm(primary_key)]
    pub id: i64,
    /// `0` debt (I owe), `1` credit (I am owed)
    pub kind: i32,
    /// Counterpart of the debt
    pub person_id: Option<i64>,
    /// Wallet the money moved through
    pub wallet_id: i64,
    /// Human-readable description
    pub description: String,
    /// When the debt was opened
    pub date: DateTime,
    /// When the debt should be settled
    pub expiration_date: Option<Date>,
    /// Total amount in minor units
    pub money: i64,
    /// Archived debts are hidden from lists
    pub archived: bool,
}

/// Defines relationships between Debt and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each debt may name one person
    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id"
    )]
    Person,
    /// Each debt moves money through one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
