//! Wallet business logic - Handles all wallet-related operations.
//!
//! Provides functions for creating, retrieving, updating and deleting wallets, and
//! for computing balances. Balances are derived from the start money plus every
//! confirmed transaction, never stored.

use crate::{
    core::{category::Direction, currency::get_currency, money::Money},
    entities::{
        Debt, RecurrentTransaction, Saving, Transaction, Transfer, Wallet, debt,
        recurrent_transaction, saving, transaction, transfer, wallet,
    },
    errors::{DataErrorCode, Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Creates a new wallet denominated in an existing currency.
pub async fn create_wallet(
    db: &DatabaseConnection,
    name: String,
    currency: &str,
    start_money: i64,
    count_in_total: bool,
) -> Result<wallet::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Wallet name cannot be empty"));
    }
    let currency = get_currency(db, currency)
        .await?
        .ok_or_else(|| Error::CurrencyNotFound {
            code: currency.to_string(),
        })?;

    let next_index = Wallet::find().count(db).await?;

    let wallet = wallet::ActiveModel {
        name: Set(name.trim().to_string()),
        icon: Set(None),
        currency: Set(currency.code),
        note: Set(None),
        start_money: Set(start_money),
        count_in_total: Set(count_in_total),
        archived: Set(false),
        sort_index: Set(i32::try_from(next_index).unwrap_or(i32::MAX)),
        ..Default::default()
    };

    let result = wallet.insert(db).await?;
    info!("Created wallet '{}' ({})", result.name, result.currency);
    Ok(result)
}

/// Finds a wallet by ID, including archived ones.
pub async fn get_wallet_by_id<C>(db: &C, wallet_id: i64) -> Result<Option<wallet::Model>>
where
    C: ConnectionTrait,
{
    Wallet::find_by_id(wallet_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists non-archived wallets ordered by sort index, then name.
pub async fn get_all_wallets(db: &DatabaseConnection) -> Result<Vec<wallet::Model>> {
    Wallet::find()
        .filter(wallet::Column::Archived.eq(false))
        .order_by_asc(wallet::Column::SortIndex)
        .order_by_asc(wallet::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Updates the user-editable fields of a wallet. The currency cannot change once
/// transactions exist, so it is not editable here.
pub async fn update_wallet(
    db: &DatabaseConnection,
    wallet_id: i64,
    name: String,
    note: Option<String>,
    count_in_total: bool,
) -> Result<wallet::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Wallet name cannot be empty"));
    }
    let existing = get_wallet_by_id(db, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })?;

    let mut active: wallet::ActiveModel = existing.into();
    active.name = Set(name.trim().to_string());
    active.note = Set(note);
    active.count_in_total = Set(count_in_total);
    Ok(active.update(db).await?)
}

/// Hides a wallet from lists while keeping its history.
pub async fn archive_wallet(db: &DatabaseConnection, wallet_id: i64) -> Result<wallet::Model> {
    let existing = get_wallet_by_id(db, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })?;
    let mut active: wallet::ActiveModel = existing.into();
    active.archived = Set(true);
    Ok(active.update(db).await?)
}

/// Deletes a wallet and its transactions.
///
/// Wallets referenced by a transfer must have the transfer removed first, since
/// deleting a single leg would leave the other wallet unbalanced.
pub async fn delete_wallet(db: &DatabaseConnection, wallet_id: i64) -> Result<()> {
    get_wallet_by_id(db, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })?;

    let transfers = Transfer::find()
        .filter(
            Condition::any()
                .add(transfer::Column::FromWalletId.eq(wallet_id))
                .add(transfer::Column::ToWalletId.eq(wallet_id)),
        )
        .count(db)
        .await?;
    if transfers > 0 {
        return Err(Error::data(DataErrorCode::WalletUsedInTransfer));
    }

    let txn = db.begin().await?;
    let transaction_ids: Vec<i64> = Transaction::find()
        .filter(transaction::Column::WalletId.eq(wallet_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    crate::core::attachment::delete_attachments_for_transactions(&txn, &transaction_ids).await?;
    Transaction::delete_many()
        .filter(transaction::Column::WalletId.eq(wallet_id))
        .exec(&txn)
        .await?;
    RecurrentTransaction::delete_many()
        .filter(recurrent_transaction::Column::WalletId.eq(wallet_id))
        .exec(&txn)
        .await?;
    Debt::delete_many()
        .filter(debt::Column::WalletId.eq(wallet_id))
        .exec(&txn)
        .await?;
    Saving::delete_many()
        .filter(saving::Column::WalletId.eq(wallet_id))
        .exec(&txn)
        .await?;
    Wallet::delete_by_id(wallet_id).exec(&txn).await?;
    txn.commit().await?;

    info!("Deleted wallet {wallet_id}");
    Ok(())
}

/// Current balance of a wallet in minor units: start money plus every confirmed
/// transaction.
pub async fn wallet_balance<C>(db: &C, wallet_id: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    let wallet = get_wallet_by_id(db, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })?;

    let transactions = Transaction::find()
        .filter(transaction::Column::WalletId.eq(wallet_id))
        .filter(transaction::Column::Confirmed.eq(true))
        .all(db)
        .await?;

    Ok(transactions.iter().fold(wallet.start_money, |balance, t| {
        balance.saturating_add(Direction::from_code(t.direction).signed(t.amount))
    }))
}

/// Sum of every non-archived wallet counted in the total, per currency.
pub async fn total_money(db: &DatabaseConnection) -> Result<Money> {
    let wallets = Wallet::find()
        .filter(wallet::Column::Archived.eq(false))
        .filter(wallet::Column::CountInTotal.eq(true))
        .all(db)
        .await?;

    let mut total = Money::new();
    for wallet in wallets {
        let balance = wallet_balance(db, wallet.id).await?;
        total.try_add(&wallet.currency, balance)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::category::CategoryType;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_wallet_validation() -> Result<()> {
        let db = setup_test_db().await?;

        let result = create_wallet(&db, " ".to_string(), "EUR", 0, true).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_wallet(&db, "Cash".to_string(), "XYZ", 0, true).await;
        assert!(matches!(result, Err(Error::CurrencyNotFound { .. })));

        let wallet = create_wallet(&db, " Cash ".to_string(), "eur", 1_000, true).await?;
        assert_eq!(wallet.name, "Cash");
        assert_eq!(wallet.currency, "EUR");
        assert!(!wallet.archived);
        Ok(())
    }

    #[tokio::test]
    async fn test_wallet_balance_counts_confirmed_only() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_wallet(&db, "Bank".to_string(), "EUR", 10_000, true).await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let salary = create_test_category(&db, "Salary", CategoryType::Income).await?;

        create_test_transaction(&db, wallet.id, food.id, 2_500).await?;
        create_test_transaction(&db, wallet.id, salary.id, 5_000).await?;
        let pending = create_test_transaction(&db, wallet.id, food.id, 999).await?;
        let mut pending: transaction::ActiveModel = pending.into();
        pending.confirmed = Set(false);
        pending.update(&db).await?;

        assert_eq!(wallet_balance(&db, wallet.id).await?, 12_500);
        Ok(())
    }

    #[tokio::test]
    async fn test_total_money_groups_by_currency() -> Result<()> {
        let db = setup_test_db().await?;
        create_wallet(&db, "Euro cash".to_string(), "EUR", 1_000, true).await?;
        create_wallet(&db, "Euro bank".to_string(), "EUR", 2_000, true).await?;
        create_wallet(&db, "Dollars".to_string(), "USD", 500, true).await?;
        create_wallet(&db, "Hidden".to_string(), "USD", 7_000, false).await?;
        let archived = create_wallet(&db, "Old".to_string(), "EUR", 9_000, true).await?;
        archive_wallet(&db, archived.id).await?;

        let total = total_money(&db).await?;
        assert_eq!(total.to_string(), "EUR:3000;USD:500");
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_wallets_hides_archived() -> Result<()> {
        let db = setup_test_db().await?;
        let first = create_test_wallet(&db, "First").await?;
        let second = create_test_wallet(&db, "Second").await?;
        archive_wallet(&db, first.id).await?;

        let wallets = get_all_wallets(&db).await?;
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].id, second.id);
        Ok(())
    }

    #[tokio::test]
    async fn test_update_wallet() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let updated =
            update_wallet(&db, wallet.id, "Pocket".to_string(), Some("coins".into()), false)
                .await?;
        assert_eq!(updated.name, "Pocket");
        assert_eq!(updated.note.as_deref(), Some("coins"));
        assert!(!updated.count_in_total);

        assert!(matches!(
            update_wallet(&db, 999, "x".to_string(), None, true).await,
            Err(Error::WalletNotFound { id: 999 })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_wallet_removes_transactions() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        create_test_transaction(&db, wallet.id, food.id, 100).await?;

        delete_wallet(&db, wallet.id).await?;
        assert!(get_wallet_by_id(&db, wallet.id).await?.is_none());
        assert_eq!(Transaction::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_wallet_removes_dependent_records() -> Result<()> {
        use crate::core::debt::{DebtKind, NewDebt, create_debt};
        use crate::core::recurrence::{Frequency, RecurrenceSetting};
        use crate::core::recurring::{
            NewRecurrentTransaction, create_recurrent_transaction, process_due_recurrences,
        };
        use crate::core::saving::create_saving;

        let db = setup_test_db().await?;
        let gone = create_test_wallet(&db, "Old bank").await?;
        let kept = create_test_wallet(&db, "New bank").await?;
        let rent = create_test_category(&db, "Rent", CategoryType::Expense).await?;
        let start = test_date().date();
        for wallet_id in [gone.id, kept.id] {
            create_recurrent_transaction(
                &db,
                NewRecurrentTransaction {
                    wallet_id,
                    category_id: rent.id,
                    direction: None,
                    amount: 50_000,
                    description: "Rent".to_string(),
                    setting: RecurrenceSetting::new(start, Frequency::Monthly),
                },
            )
            .await?;
        }
        create_debt(
            &db,
            NewDebt::new(DebtKind::Credit, gone.id, 2_000, "Loan to Sam", test_date()),
        )
        .await?;
        create_saving(&db, "Bike".to_string(), gone.id, 0, 10_000, None).await?;

        delete_wallet(&db, gone.id).await?;
        assert_eq!(RecurrentTransaction::find().count(&db).await?, 1);
        assert_eq!(Debt::find().count(&db).await?, 0);
        assert_eq!(Saving::find().count(&db).await?, 0);

        // The remaining schedule still runs
        let run = process_due_recurrences(&db, start).await?;
        assert_eq!(run.created, 1);
        assert_eq!(wallet_balance(&db, kept.id).await?, -50_000);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_wallet_used_in_transfer() -> Result<()> {
        let db = setup_test_db().await?;
        let from = create_test_wallet(&db, "From").await?;
        let to = create_test_wallet(&db, "To").await?;
        crate::core::transfer::create_transfer(
            &db,
            crate::core::transfer::NewTransfer::same_currency(from.id, to.id, 1_000),
        )
        .await?;

        assert!(matches!(
            delete_wallet(&db, from.id).await,
            Err(Error::Data {
                code: DataErrorCode::WalletUsedInTransfer
            })
        ));
        Ok(())
    }
}
