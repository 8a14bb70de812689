//! Category entity - Income, expense and system categories.
//!
//! System categories are created by the application and identified by their `tag`
//! (see [`crate::core::category::SystemTag`]). User categories may be nested one
//! level deep through `parent_id`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Optional icon identifier
    pub icon: Option<String>,
    /// `0` income, `1` expense, `2` system
    pub category_type: i32,
    /// Parent category for sub-categories
    pub parent_id: Option<i64>,
    /// Tag identifying system categories
    pub tag: Option<String>,
    /// Whether the category appears in reports
    pub show_report: bool,
    /// User-defined ordering
    pub sort_index: i32,
}

/// Defines relationships between Category and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One category has many transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
