//! Transfer business logic - moving money between two wallets.
//!
//! A transfer is stored as a `transfers` row plus its transaction legs: an expense
//! on the source wallet, an income on the destination wallet and, when a fee is
//! charged, a `transfer_tax` expense on the source wallet. All rows are written in
//! a single database transaction.

use crate::{
    core::{
        category::{Direction, SystemTag, get_system_category},
        transaction::{Origin, insert_linked_transaction},
        wallet::get_wallet_by_id,
    },
    entities::{Transaction, Transfer, transaction, transfer},
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Input for [`create_transfer`].
#[derive(Debug, Clone)]
pub struct NewTransfer {
    /// Wallet the money leaves
    pub from_wallet_id: i64,
    /// Wallet the money arrives in
    pub to_wallet_id: i64,
    /// Amount withdrawn from the source wallet
    pub from_amount: i64,
    /// Amount deposited in the destination wallet; required when the wallets use
    /// different currencies, defaults to `from_amount` otherwise
    pub to_amount: Option<i64>,
    /// Fee charged on the source wallet, zero for none
    pub tax: i64,
    /// Human-readable description
    pub description: String,
    /// When the transfer happened
    pub date: NaiveDateTime,
}

impl NewTransfer {
    /// A fee-free transfer of `amount` between two wallets, dated now.
    #[must_use]
    pub fn same_currency(from_wallet_id: i64, to_wallet_id: i64, amount: i64) -> Self {
        Self {
            from_wallet_id,
            to_wallet_id,
            from_amount: amount,
            to_amount: None,
            tax: 0,
            description: String::new(),
            date: chrono::Local::now().naive_local(),
        }
    }
}

/// Creates a transfer and its transaction legs atomically.
#[instrument(skip(db))]
pub async fn create_transfer(db: &DatabaseConnection, new: NewTransfer) -> Result<transfer::Model> {
    if new.from_wallet_id == new.to_wallet_id {
        return Err(Error::InvalidTransfer {
            reason: "source and destination wallet are the same".to_string(),
        });
    }
    if new.from_amount <= 0 {
        return Err(Error::InvalidAmount {
            amount: new.from_amount,
        });
    }
    if new.tax < 0 {
        return Err(Error::InvalidAmount { amount: new.tax });
    }

    let txn = db.begin().await?;

    let from = get_wallet_by_id(&txn, new.from_wallet_id)
        .await?
        .ok_or(Error::WalletNotFound {
            id: new.from_wallet_id,
        })?;
    let to = get_wallet_by_id(&txn, new.to_wallet_id)
        .await?
        .ok_or(Error::WalletNotFound {
            id: new.to_wallet_id,
        })?;

    let to_amount = match new.to_amount {
        Some(amount) if amount > 0 => amount,
        Some(amount) => return Err(Error::InvalidAmount { amount }),
        None if from.currency == to.currency => new.from_amount,
        None => {
            return Err(Error::InvalidTransfer {
                reason: format!(
                    "transfers from {} to {} need an explicit destination amount",
                    from.currency, to.currency
                ),
            });
        }
    };

    let transfer_category = get_system_category(&txn, SystemTag::Transfer).await?;

    let record = transfer::ActiveModel {
        description: Set(new.description.clone()),
        date: Set(new.date),
        from_wallet_id: Set(from.id),
        to_wallet_id: Set(to.id),
        from_amount: Set(new.from_amount),
        to_amount: Set(to_amount),
        tax: Set(new.tax),
        note: Set(None),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    insert_linked_transaction(
        &txn,
        from.id,
        transfer_category.id,
        Direction::Expense,
        new.from_amount,
        new.description.clone(),
        new.date,
        Origin::Transfer(record.id),
    )
    .await?;
    insert_linked_transaction(
        &txn,
        to.id,
        transfer_category.id,
        Direction::Income,
        to_amount,
        new.description.clone(),
        new.date,
        Origin::Transfer(record.id),
    )
    .await?;

    if new.tax > 0 {
        let tax_category = get_system_category(&txn, SystemTag::TransferTax).await?;
        insert_linked_transaction(
            &txn,
            from.id,
            tax_category.id,
            Direction::Expense,
            new.tax,
            new.description,
            new.date,
            Origin::Transfer(record.id),
        )
        .await?;
    }

    txn.commit().await?;
    info!(
        "Transfer {}: {} from wallet {} to wallet {}",
        record.id, record.from_amount, record.from_wallet_id, record.to_wallet_id
    );
    Ok(record)
}

/// Finds a transfer by ID.
pub async fn get_transfer_by_id(
    db: &DatabaseConnection,
    transfer_id: i64,
) -> Result<Option<transfer::Model>> {
    Transfer::find_by_id(transfer_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// The transaction legs of a transfer, in creation order.
pub async fn get_transfer_legs(
    db: &DatabaseConnection,
    transfer_id: i64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::TransferId.eq(transfer_id))
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a transfer together with all of its legs.
pub async fn delete_transfer(db: &DatabaseConnection, transfer_id: i64) -> Result<()> {
    let txn = db.begin().await?;
    Transfer::find_by_id(transfer_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Transfer",
            id: transfer_id,
        })?;

    let leg_ids: Vec<i64> = Transaction::find()
        .filter(transaction::Column::TransferId.eq(transfer_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| t.id)
        .collect();
    crate::core::attachment::delete_attachments_for_transactions(&txn, &leg_ids).await?;
    Transaction::delete_many()
        .filter(transaction::Column::TransferId.eq(transfer_id))
        .exec(&txn)
        .await?;
    Transfer::delete_by_id(transfer_id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::signed_amount;
    use crate::core::wallet::{create_wallet, wallet_balance};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_transfer_moves_money_with_tax() -> Result<()> {
        let db = setup_test_db().await?;
        let from = create_wallet(&db, "Bank".to_string(), "EUR", 10_000, true).await?;
        let to = create_wallet(&db, "Cash".to_string(), "EUR", 0, true).await?;

        let mut new = NewTransfer::same_currency(from.id, to.id, 3_000);
        new.tax = 150;
        new.description = "ATM".to_string();
        let transfer = create_transfer(&db, new).await?;

        assert_eq!(wallet_balance(&db, from.id).await?, 6_850);
        assert_eq!(wallet_balance(&db, to.id).await?, 3_000);

        let legs = get_transfer_legs(&db, transfer.id).await?;
        assert_eq!(legs.len(), 3);
        let signed: Vec<i64> = legs.iter().map(signed_amount).collect();
        assert_eq!(signed, vec![-3_000, 3_000, -150]);
        Ok(())
    }

    #[tokio::test]
    async fn test_transfer_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let eur = create_wallet(&db, "Euro".to_string(), "EUR", 0, true).await?;
        let usd = create_wallet(&db, "Dollar".to_string(), "USD", 0, true).await?;

        let same = create_transfer(&db, NewTransfer::same_currency(eur.id, eur.id, 10)).await;
        assert!(matches!(same, Err(Error::InvalidTransfer { .. })));

        let zero = create_transfer(&db, NewTransfer::same_currency(eur.id, usd.id, 0)).await;
        assert!(matches!(zero, Err(Error::InvalidAmount { amount: 0 })));

        let cross = create_transfer(&db, NewTransfer::same_currency(eur.id, usd.id, 100)).await;
        assert!(matches!(cross, Err(Error::InvalidTransfer { .. })));

        let missing = create_transfer(&db, NewTransfer::same_currency(eur.id, 999, 100)).await;
        assert!(matches!(missing, Err(Error::WalletNotFound { id: 999 })));

        // Nothing was written by the failed attempts
        assert_eq!(Transfer::find().count(&db).await?, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_cross_currency_transfer() -> Result<()> {
        let db = setup_test_db().await?;
        let eur = create_wallet(&db, "Euro".to_string(), "EUR", 5_000, true).await?;
        let usd = create_wallet(&db, "Dollar".to_string(), "USD", 0, true).await?;

        let mut new = NewTransfer::same_currency(eur.id, usd.id, 1_000);
        new.to_amount = Some(1_080);
        create_transfer(&db, new).await?;

        assert_eq!(wallet_balance(&db, eur.id).await?, 4_000);
        assert_eq!(wallet_balance(&db, usd.id).await?, 1_080);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_transfer_removes_legs() -> Result<()> {
        let db = setup_test_db().await?;
        let from = create_test_wallet(&db, "From").await?;
        let to = create_test_wallet(&db, "To").await?;
        let transfer = create_transfer(&db, NewTransfer::same_currency(from.id, to.id, 700)).await?;

        delete_transfer(&db, transfer.id).await?;
        assert!(get_transfer_by_id(&db, transfer.id).await?.is_none());
        assert!(get_transfer_legs(&db, transfer.id).await?.is_empty());
        assert_eq!(wallet_balance(&db, to.id).await?, 0);

        assert!(matches!(
            delete_transfer(&db, transfer.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }
}
