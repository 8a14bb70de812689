//! Transaction business logic - Handles all transaction-related operations.
//!
//! This module provides functions for creating, retrieving, updating and deleting
//! income and expense transactions. Amounts are unsigned minor units; the direction
//! decides the sign. Transactions produced by transfers, debts, savings and
//! recurrences are inserted through [`insert_linked_transaction`] and carry a link
//! back to their origin.

use crate::{
    core::{
        category::{Direction, SystemTag, get_category_by_id},
        wallet::get_wallet_by_id,
    },
    entities::{Transaction, transaction},
    errors::{DataErrorCode, Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::debug;

/// Input for [`create_transaction`].
#[derive(Debug, Clone)]
pub struct NewTransaction {
    /// Wallet the money moves in or out of
    pub wallet_id: i64,
    /// Category of the transaction
    pub category_id: i64,
    /// Amount in minor units, must be positive
    pub amount: i64,
    /// Human-readable description
    pub description: String,
    /// When the transaction happened
    pub date: NaiveDateTime,
    /// Overrides the direction implied by the category
    pub direction: Option<Direction>,
    /// Unconfirmed transactions do not affect balances
    pub confirmed: bool,
    /// Whether the transaction counts towards totals
    pub count_in_total: bool,
    /// Free-form note
    pub note: Option<String>,
    /// Related event
    pub event_id: Option<i64>,
    /// Where the transaction happened
    pub place_id: Option<i64>,
}

impl NewTransaction {
    /// A confirmed transaction counted in totals, with the category's direction.
    pub fn new(
        wallet_id: i64,
        category_id: i64,
        amount: i64,
        description: impl Into<String>,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            wallet_id,
            category_id,
            amount,
            description: description.into(),
            date,
            direction: None,
            confirmed: true,
            count_in_total: true,
            note: None,
            event_id: None,
            place_id: None,
        }
    }
}

/// Origin of a generated transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Leg of a transfer
    Transfer(i64),
    /// Opening or repayment of a debt
    Debt(i64),
    /// Deposit to or withdrawal from a saving
    Saving(i64),
    /// Occurrence of a recurrent transaction
    Recurrence(i64),
}

/// Creates a user transaction after validating the amount, wallet and category.
pub async fn create_transaction(
    db: &DatabaseConnection,
    new: NewTransaction,
) -> Result<transaction::Model> {
    if new.amount <= 0 {
        return Err(Error::InvalidAmount { amount: new.amount });
    }

    get_wallet_by_id(db, new.wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: new.wallet_id })?;
    let category = get_category_by_id(db, new.category_id)
        .await?
        .ok_or(Error::CategoryNotFound {
            id: new.category_id,
        })?;
    if category.system_tag() == Some(SystemTag::Transfer) {
        return Err(Error::invalid_input(
            "Transfer categories can only be used by transfers",
        ));
    }

    let direction = new
        .direction
        .or_else(|| category.direction())
        .ok_or_else(|| Error::invalid_input("A direction is required for this category"))?;

    let model = transaction::ActiveModel {
        wallet_id: Set(new.wallet_id),
        category_id: Set(new.category_id),
        direction: Set(direction.code()),
        amount: Set(new.amount),
        description: Set(new.description),
        date: Set(new.date),
        confirmed: Set(new.confirmed),
        count_in_total: Set(new.count_in_total),
        note: Set(new.note),
        event_id: Set(new.event_id),
        place_id: Set(new.place_id),
        ..Default::default()
    };

    let result = model.insert(db).await?;
    debug!(
        "Created transaction {} of {} on wallet {}",
        result.id, result.amount, result.wallet_id
    );
    Ok(result)
}

/// Inserts a transaction generated by another operation, bypassing category
/// restrictions. Callers are expected to run inside their own database transaction.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn insert_linked_transaction<C>(
    db: &C,
    wallet_id: i64,
    category_id: i64,
    direction: Direction,
    amount: i64,
    description: String,
    date: NaiveDateTime,
    origin: Origin,
) -> Result<transaction::Model>
where
    C: ConnectionTrait,
{
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let mut model = transaction::ActiveModel {
        wallet_id: Set(wallet_id),
        category_id: Set(category_id),
        direction: Set(direction.code()),
        amount: Set(amount),
        description: Set(description),
        date: Set(date),
        confirmed: Set(true),
        count_in_total: Set(true),
        note: Set(None),
        event_id: Set(None),
        place_id: Set(None),
        saving_id: Set(None),
        debt_id: Set(None),
        recurrence_id: Set(None),
        transfer_id: Set(None),
        ..Default::default()
    };
    match origin {
        Origin::Transfer(id) => model.transfer_id = Set(Some(id)),
        Origin::Debt(id) => model.debt_id = Set(Some(id)),
        Origin::Saving(id) => model.saving_id = Set(Some(id)),
        Origin::Recurrence(id) => model.recurrence_id = Set(Some(id)),
    }

    Ok(model.insert(db).await?)
}

/// Retrieves a transaction by ID.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves every transaction of a wallet, newest first.
pub async fn get_transactions_for_wallet(
    db: &DatabaseConnection,
    wallet_id: i64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::WalletId.eq(wallet_id))
        .order_by_desc(transaction::Column::Date)
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves transactions dated between `start` and `end` (both inclusive),
/// optionally restricted to one wallet, oldest first.
pub async fn get_transactions_in_range<C>(
    db: &C,
    start: NaiveDate,
    end: NaiveDate,
    wallet_id: Option<i64>,
) -> Result<Vec<transaction::Model>>
where
    C: ConnectionTrait,
{
    let from = start.and_time(chrono::NaiveTime::MIN);
    let until = end
        .succ_opt()
        .map_or(NaiveDateTime::MAX, |d| d.and_time(chrono::NaiveTime::MIN));

    let mut query = Transaction::find()
        .filter(transaction::Column::Date.gte(from))
        .filter(transaction::Column::Date.lt(until));
    if let Some(wallet_id) = wallet_id {
        query = query.filter(transaction::Column::WalletId.eq(wallet_id));
    }
    query
        .order_by_asc(transaction::Column::Date)
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Updates amount, description and date of a user transaction.
pub async fn update_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    amount: i64,
    description: String,
    date: NaiveDateTime,
) -> Result<transaction::Model> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let existing = get_transaction_by_id(db, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;
    if existing.transfer_id.is_some() {
        return Err(Error::data(DataErrorCode::TransactionInTransfer));
    }

    let mut active: transaction::ActiveModel = existing.into();
    active.amount = Set(amount);
    active.description = Set(description);
    active.date = Set(date);
    Ok(active.update(db).await?)
}

/// Deletes a transaction and its attachments. Transfer legs must be deleted
/// through their transfer.
pub async fn delete_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<()> {
    let existing = get_transaction_by_id(db, transaction_id)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;
    if existing.transfer_id.is_some() {
        return Err(Error::data(DataErrorCode::TransactionInTransfer));
    }

    let txn = db.begin().await?;
    crate::core::attachment::delete_attachments_for_transactions(&txn, &[transaction_id]).await?;
    Transaction::delete_by_id(transaction_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Amount with the direction's sign applied.
#[must_use]
pub const fn signed_amount(model: &transaction::Model) -> i64 {
    Direction::from_code(model.direction).signed(model.amount)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::category::{CategoryType, get_system_category};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_transaction_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;

        let result =
            create_transaction(&db, NewTransaction::new(wallet.id, food.id, 0, "x", test_date())).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        let result =
            create_transaction(&db, NewTransaction::new(999, food.id, 10, "x", test_date())).await;
        assert!(matches!(result, Err(Error::WalletNotFound { id: 999 })));

        let result =
            create_transaction(&db, NewTransaction::new(wallet.id, 999, 10, "x", test_date())).await;
        assert!(matches!(result, Err(Error::CategoryNotFound { id: 999 })));

        let transfer = get_system_category(&db, SystemTag::Transfer).await?;
        let result = create_transaction(
            &db,
            NewTransaction::new(wallet.id, transfer.id, 10, "x", test_date()),
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_direction_follows_category() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let salary = create_test_category(&db, "Salary", CategoryType::Income).await?;

        let expense = create_test_transaction(&db, wallet.id, food.id, 300).await?;
        let income = create_test_transaction(&db, wallet.id, salary.id, 700).await?;
        assert_eq!(signed_amount(&expense), -300);
        assert_eq!(signed_amount(&income), 700);

        let mut refund = NewTransaction::new(wallet.id, food.id, 50, "refund", test_date());
        refund.direction = Some(Direction::Income);
        let refund = create_transaction(&db, refund).await?;
        assert_eq!(signed_amount(&refund), 50);
        Ok(())
    }

    #[tokio::test]
    async fn test_transactions_for_wallet_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;

        let older = NewTransaction::new(wallet.id, food.id, 1, "older", date_time(2026, 1, 1));
        let newer = NewTransaction::new(wallet.id, food.id, 2, "newer", date_time(2026, 2, 1));
        create_transaction(&db, older).await?;
        create_transaction(&db, newer).await?;

        let list = get_transactions_for_wallet(&db, wallet.id).await?;
        assert_eq!(list[0].description, "newer");
        assert_eq!(list[1].description, "older");
        Ok(())
    }

    #[tokio::test]
    async fn test_transactions_in_range_inclusive() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        for day in [1, 15, 31] {
            create_transaction(
                &db,
                NewTransaction::new(wallet.id, food.id, 1, "t", date_time(2026, 1, day)),
            )
            .await?;
        }
        create_transaction(
            &db,
            NewTransaction::new(wallet.id, food.id, 1, "t", date_time(2026, 2, 1)),
        )
        .await?;

        let january = get_transactions_in_range(
            &db,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 1, 31).unwrap(),
            Some(wallet.id),
        )
        .await?;
        assert_eq!(january.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_and_delete_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let created = create_test_transaction(&db, wallet.id, food.id, 100).await?;

        let updated =
            update_transaction(&db, created.id, 250, "Dinner".to_string(), test_date()).await?;
        assert_eq!(updated.amount, 250);
        assert_eq!(updated.description, "Dinner");

        delete_transaction(&db, created.id).await?;
        assert!(get_transaction_by_id(&db, created.id).await?.is_none());
        assert!(matches!(
            delete_transaction(&db, created.id).await,
            Err(Error::TransactionNotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_legs_are_protected() -> Result<()> {
        let db = setup_test_db().await?;
        let from = create_test_wallet(&db, "From").await?;
        let to = create_test_wallet(&db, "To").await?;
        let transfer = crate::core::transfer::create_transfer(
            &db,
            crate::core::transfer::NewTransfer::same_currency(from.id, to.id, 500),
        )
        .await?;
        let leg = crate::core::transfer::get_transfer_legs(&db, transfer.id)
            .await?
            .remove(0);

        assert!(matches!(
            delete_transaction(&db, leg.id).await,
            Err(Error::Data {
                code: DataErrorCode::TransactionInTransfer
            })
        ));
        assert!(matches!(
            update_transaction(&db, leg.id, 1, "x".to_string(), test_date()).await,
            Err(Error::Data {
                code: DataErrorCode::TransactionInTransfer
            })
        ));
        Ok(())
    }
}
