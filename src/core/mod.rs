//! Core business logic, independent of any user interface.
//!
//! Every operation takes a `SeaORM` connection and returns [`crate::errors::Result`].

pub mod attachment;
pub mod backend;
pub mod backup;
pub mod budget;
pub mod category;
pub mod currency;
pub mod debt;
pub mod event;
pub mod money;
pub mod person;
pub mod place;
pub mod recurrence;
pub mod recurring;
pub mod saving;
pub mod transaction;
pub mod transfer;
pub mod wallet;
