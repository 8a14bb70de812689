//! Currency entity - ISO currencies wallets can be denominated in.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Currency database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    /// ISO 4217 code (e.g. "EUR"), also the primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    /// Display name
    pub name: String,
    /// Display symbol, if the currency has one
    pub symbol: Option<String>,
    /// Number of decimal digits of the minor unit
    pub decimals: i32,
}

/// Wallets reference currencies by code
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One currency is used by many wallets
    #[sea_orm(has_many = "super::wallet::Entity")]
    Wallets,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
