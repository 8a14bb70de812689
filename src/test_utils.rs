//! Shared test utilities for `MoneyWallet`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    config::settings::CurrencyConfig,
    core::{category, currency, transaction, wallet},
    entities,
    errors::Result,
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized, the EUR
/// and USD currencies and every system category.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    currency::seed_currencies(
        &db,
        &[
            CurrencyConfig {
                code: "EUR".to_string(),
                name: "Euro".to_string(),
                symbol: Some("€".to_string()),
                decimals: 2,
            },
            CurrencyConfig {
                code: "USD".to_string(),
                name: "US Dollar".to_string(),
                symbol: Some("$".to_string()),
                decimals: 2,
            },
        ],
    )
    .await?;
    category::ensure_system_categories(&db).await?;
    Ok(db)
}

/// Creates a test wallet with sensible defaults.
///
/// # Defaults
/// * `currency`: "EUR"
/// * `start_money`: 0
/// * `count_in_total`: true
pub async fn create_test_wallet(db: &DatabaseConnection, name: &str) -> Result<entities::WalletModel> {
    wallet::create_wallet(db, name.to_string(), "EUR", 0, true).await
}

/// Creates a top-level user category.
pub async fn create_test_category(
    db: &DatabaseConnection,
    name: &str,
    category_type: category::CategoryType,
) -> Result<entities::CategoryModel> {
    category::create_category(db, name.to_string(), category_type, None, None).await
}

/// Creates a confirmed transaction dated [`test_date`] with the category's direction.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    wallet_id: i64,
    category_id: i64,
    amount: i64,
) -> Result<entities::TransactionModel> {
    transaction::create_transaction(
        db,
        transaction::NewTransaction::new(wallet_id, category_id, amount, "Test transaction", test_date()),
    )
    .await
}

/// Fixed timestamp used by tests that don't care about dates.
pub fn test_date() -> NaiveDateTime {
    date_time(2026, 5, 15)
}

/// Midnight of the given day.
pub fn date_time(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}
