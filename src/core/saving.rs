//! Saving business logic - money set aside from a wallet towards a goal.
//!
//! Deposits leave the wallet as `saving_deposit` expenses and withdrawals come
//! back as `saving_withdraw` incomes. The saved amount is the starting money
//! plus deposits minus withdrawals.

use crate::{
    core::{
        category::{Direction, SystemTag, get_system_category},
        transaction::{Origin, insert_linked_transaction},
        wallet::get_wallet_by_id,
    },
    entities::{Saving, Transaction, saving, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::info;

/// How far a saving is from its goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavingProgress {
    /// The saving being measured
    pub saving: saving::Model,
    /// Amount currently saved in minor units
    pub saved: i64,
}

impl SavingProgress {
    /// Amount still missing to reach the goal, zero once reached.
    #[must_use]
    pub const fn missing(&self) -> i64 {
        let missing = self.saving.end_money - self.saved;
        if missing > 0 { missing } else { 0 }
    }

    /// Saved amount as a percentage of the goal, capped at 100.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.saving.end_money <= 0 {
            return 100.0;
        }
        ((self.saved as f64 * 100.0) / self.saving.end_money as f64).min(100.0)
    }
}

/// Creates a saving goal funded from `wallet_id`.
pub async fn create_saving(
    db: &DatabaseConnection,
    description: String,
    wallet_id: i64,
    start_money: i64,
    end_money: i64,
    end_date: Option<NaiveDate>,
) -> Result<saving::Model> {
    if description.trim().is_empty() {
        return Err(Error::invalid_input("Saving description cannot be empty"));
    }
    if start_money < 0 {
        return Err(Error::InvalidAmount {
            amount: start_money,
        });
    }
    if end_money <= 0 {
        return Err(Error::InvalidAmount { amount: end_money });
    }
    get_wallet_by_id(db, wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: wallet_id })?;

    let model = saving::ActiveModel {
        description: Set(description),
        wallet_id: Set(wallet_id),
        start_money: Set(start_money),
        end_money: Set(end_money),
        end_date: Set(end_date),
        complete: Set(start_money >= end_money),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a saving by ID.
pub async fn get_saving_by_id(db: &DatabaseConnection, saving_id: i64) -> Result<Option<saving::Model>> {
    Saving::find_by_id(saving_id).one(db).await.map_err(Into::into)
}

/// Lists savings that have not reached their goal yet.
pub async fn get_open_savings(db: &DatabaseConnection) -> Result<Vec<saving::Model>> {
    Saving::find()
        .filter(saving::Column::Complete.eq(false))
        .all(db)
        .await
        .map_err(Into::into)
}

async fn saved_amount<C>(db: &C, saving: &saving::Model) -> Result<i64>
where
    C: ConnectionTrait,
{
    let movements = Transaction::find()
        .filter(transaction::Column::SavingId.eq(saving.id))
        .all(db)
        .await?;
    // Deposits are wallet expenses, so the sign is flipped from the wallet's view
    Ok(movements.iter().fold(saving.start_money, |acc, t| {
        acc.saturating_sub(Direction::from_code(t.direction).signed(t.amount))
    }))
}

async fn find_saving<C>(db: &C, saving_id: i64) -> Result<saving::Model>
where
    C: ConnectionTrait,
{
    Saving::find_by_id(saving_id)
        .one(db)
        .await?
        .ok_or(Error::NotFound {
            entity: "Saving",
            id: saving_id,
        })
}

async fn record_movement<C>(
    db: &C,
    saving: saving::Model,
    saved: i64,
    tag: SystemTag,
    amount: i64,
    date: NaiveDateTime,
) -> Result<SavingProgress>
where
    C: ConnectionTrait,
{
    let category = get_system_category(db, tag).await?;
    let direction = tag.direction().ok_or_else(|| Error::Config {
        message: format!("System tag '{}' has no direction", tag.as_str()),
    })?;
    insert_linked_transaction(
        db,
        saving.wallet_id,
        category.id,
        direction,
        amount,
        saving.description.clone(),
        date,
        Origin::Saving(saving.id),
    )
    .await?;

    let complete = saved >= saving.end_money;
    let saving = if complete == saving.complete {
        saving
    } else {
        let mut active: saving::ActiveModel = saving.into();
        active.complete = Set(complete);
        active.update(db).await?
    };
    Ok(SavingProgress { saving, saved })
}

/// Moves `amount` from the saving's wallet into the saving.
pub async fn deposit(
    db: &DatabaseConnection,
    saving_id: i64,
    amount: i64,
    date: NaiveDateTime,
) -> Result<SavingProgress> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let txn = db.begin().await?;
    let saving = find_saving(&txn, saving_id).await?;
    let saved = saved_amount(&txn, &saving).await?.saturating_add(amount);
    let progress = record_movement(&txn, saving, saved, SystemTag::SavingDeposit, amount, date).await?;
    txn.commit().await?;

    if progress.saving.complete {
        info!("Saving {} reached its goal", progress.saving.id);
    }
    Ok(progress)
}

/// Moves `amount` out of the saving back into its wallet.
pub async fn withdraw(
    db: &DatabaseConnection,
    saving_id: i64,
    amount: i64,
    date: NaiveDateTime,
) -> Result<SavingProgress> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }
    let txn = db.begin().await?;
    let saving = find_saving(&txn, saving_id).await?;
    let current = saved_amount(&txn, &saving).await?;
    if amount > current {
        return Err(Error::InsufficientFunds {
            current,
            required: amount,
        });
    }
    let progress = record_movement(
        &txn,
        saving,
        current - amount,
        SystemTag::SavingWithdraw,
        amount,
        date,
    )
    .await?;
    txn.commit().await?;
    Ok(progress)
}

/// Current state of a saving.
pub async fn saving_progress(db: &DatabaseConnection, saving_id: i64) -> Result<SavingProgress> {
    let saving = find_saving(db, saving_id).await?;
    let saved = saved_amount(db, &saving).await?;
    Ok(SavingProgress { saving, saved })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::wallet::{create_wallet, wallet_balance};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_deposit_until_complete() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_wallet(&db, "Bank".to_string(), "EUR", 10_000, true).await?;
        let saving = create_saving(&db, "Bike".to_string(), wallet.id, 1_000, 5_000, None).await?;
        assert!(!saving.complete);

        let progress = deposit(&db, saving.id, 3_000, test_date()).await?;
        assert_eq!(progress.saved, 4_000);
        assert_eq!(progress.missing(), 1_000);
        assert_eq!(progress.percent(), 80.0);
        assert!(!progress.saving.complete);
        assert_eq!(wallet_balance(&db, wallet.id).await?, 7_000);

        let progress = deposit(&db, saving.id, 1_500, test_date()).await?;
        assert!(progress.saving.complete);
        assert_eq!(progress.missing(), 0);
        assert_eq!(progress.percent(), 100.0);
        assert!(get_open_savings(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_withdraw_limits_and_reopens() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_wallet(&db, "Bank".to_string(), "EUR", 0, true).await?;
        let saving = create_saving(&db, "Trip".to_string(), wallet.id, 0, 1_000, None).await?;
        deposit(&db, saving.id, 1_000, test_date()).await?;

        let too_much = withdraw(&db, saving.id, 1_001, test_date()).await;
        assert!(matches!(
            too_much,
            Err(Error::InsufficientFunds {
                current: 1_000,
                required: 1_001
            })
        ));

        let progress = withdraw(&db, saving.id, 400, test_date()).await?;
        assert_eq!(progress.saved, 600);
        assert!(!progress.saving.complete);
        assert_eq!(wallet_balance(&db, wallet.id).await?, -600);

        assert_eq!(saving_progress(&db, saving.id).await?.saved, 600);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_saving_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;

        let result = create_saving(&db, String::new(), wallet.id, 0, 100, None).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_saving(&db, "Goal".to_string(), wallet.id, 0, 0, None).await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        let result = create_saving(&db, "Goal".to_string(), 404, 0, 100, None).await;
        assert!(matches!(result, Err(Error::WalletNotFound { id: 404 })));

        let result = deposit(&db, 404, 10, test_date()).await;
        assert!(matches!(result, Err(Error::NotFound { entity: "Saving", .. })));
        Ok(())
    }
}
