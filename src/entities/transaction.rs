//! Transaction entity - A single income or expense against a wallet.
//!
//! Amounts are stored unsigned in minor units; `direction` gives the sign
//! (`1` income, `0` expense). Optional foreign keys tie a transaction to the
//! transfer, debt, saving or recurrence that produced it.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Wallet the money moves in or out of
    pub wallet_id: i64,
    /// Category of the transaction
    pub category_id: i64,
    /// `1` income, `0` expense
    pub direction: i32,
    /// Amount in minor units, always positive
    pub amount: i64,
    /// Human-readable description
    pub description: String,
    /// When the transaction happened
    pub date: DateTime,
    /// Unconfirmed (future) transactions do not affect balances
    pub confirmed: bool,
    /// Whether the transaction counts towards totals and reports
    pub count_in_total: bool,
    /// Free-form note
    pub note: Option<String>,
    /// Related event
    pub event_id: Option<i64>,
    /// Where the transaction happened
    pub place_id: Option<i64>,
    /// Saving this transaction deposits to or withdraws from
    pub saving_id: Option<i64>,
    /// Debt this transaction opens or repays
    pub debt_id: Option<i64>,
    /// Recurrent transaction that generated this one
    pub recurrence_id: Option<i64>,
    /// Transfer this transaction is a leg of
    pub transfer_id: Option<i64>,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one wallet
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
    /// Each transaction belongs to one category
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    /// A transaction may carry attachments
    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachments,
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

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
