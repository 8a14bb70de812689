//! Event entity - A named period transactions can be grouped under (a trip, a party).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// First day of the event
    pub start_date: Date,
    /// Last day of the event
    pub end_date: Date,
    /// Free-form note
    pub note: Option<String>,
}

/// `Event` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
