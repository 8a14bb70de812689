//! Recurrent transaction logic - transaction templates repeated on a schedule.
//!
//! Each template stores its rule as an RRULE body together with the date of the
//! next transaction to generate. [`process_due_recurrences`] materialises every
//! occurrence up to a given day and advances the templates.

use crate::{
    core::{
        category::{CategoryType, Direction, get_category_by_id},
        recurrence::RecurrenceSetting,
        transaction::{Origin, insert_linked_transaction},
        wallet::get_wallet_by_id,
    },
    entities::{RecurrentTransaction, Transaction, recurrent_transaction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveTime};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{debug, info, instrument};

/// Input for [`create_recurrent_transaction`].
#[derive(Debug, Clone)]
pub struct NewRecurrentTransaction {
    /// Wallet each generated transaction goes to
    pub wallet_id: i64,
    /// Category of each generated transaction
    pub category_id: i64,
    /// Overrides the direction implied by the category
    pub direction: Option<Direction>,
    /// Amount in minor units
    pub amount: i64,
    /// Description copied into each generated transaction
    pub description: String,
    /// When and how often the transaction repeats
    pub setting: RecurrenceSetting,
}

/// Summary of one [`process_due_recurrences`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceRunResult {
    /// Templates that had at least one due occurrence
    pub processed: usize,
    /// Transactions created
    pub created: usize,
    /// Templates whose schedule ran out during this run
    pub finished: usize,
}

/// Creates a recurrent transaction and schedules its first occurrence.
pub async fn create_recurrent_transaction(
    db: &DatabaseConnection,
    new: NewRecurrentTransaction,
) -> Result<recurrent_transaction::Model> {
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
    if category.kind()? == CategoryType::System {
        return Err(Error::invalid_input(
            "Recurrent transactions cannot use system categories",
        ));
    }
    let direction = new
        .direction
        .or_else(|| category.direction())
        .ok_or_else(|| Error::invalid_input("A direction is required for this category"))?;

    let model = recurrent_transaction::ActiveModel {
        wallet_id: Set(new.wallet_id),
        category_id: Set(new.category_id),
        direction: Set(direction.code()),
        amount: Set(new.amount),
        description: Set(new.description),
        start_date: Set(new.setting.start_date()),
        last_occurrence: Set(None),
        next_occurrence: Set(new.setting.first_occurrence()),
        rule: Set(new.setting.rule_string()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a recurrent transaction by ID.
pub async fn get_recurrent_transaction_by_id(
    db: &DatabaseConnection,
    id: i64,
) -> Result<Option<recurrent_transaction::Model>> {
    RecurrentTransaction::find_by_id(id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every recurrent transaction, soonest next occurrence first.
pub async fn get_all_recurrent_transactions(
    db: &DatabaseConnection,
) -> Result<Vec<recurrent_transaction::Model>> {
    RecurrentTransaction::find()
        .order_by_asc(recurrent_transaction::Column::NextOccurrence)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The schedule of a stored recurrent transaction.
#[must_use]
pub fn setting_of(model: &recurrent_transaction::Model) -> RecurrenceSetting {
    RecurrenceSetting::from_rule_string(model.start_date, &model.rule)
}

/// Deletes a recurrent transaction. Transactions it already generated are kept
/// and lose their link to it.
pub async fn delete_recurrent_transaction(db: &DatabaseConnection, id: i64) -> Result<()> {
    let txn = db.begin().await?;
    let existing = RecurrentTransaction::find_by_id(id).one(&txn).await?;
    if existing.is_none() {
        return Err(Error::NotFound {
            entity: "RecurrentTransaction",
            id,
        });
    }
    Transaction::update_many()
        .col_expr(transaction::Column::RecurrenceId, Expr::value(Option::<i64>::None))
        .filter(transaction::Column::RecurrenceId.eq(id))
        .exec(&txn)
        .await?;
    RecurrentTransaction::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;
    Ok(())
}

/// Creates a transaction for every occurrence due on or before `today` and
/// advances each template. Everything is written in one database transaction.
#[instrument(skip(db))]
pub async fn process_due_recurrences(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<RecurrenceRunResult> {
    let txn = db.begin().await?;
    let due = RecurrentTransaction::find()
        .filter(recurrent_transaction::Column::NextOccurrence.lte(today))
        .order_by_asc(recurrent_transaction::Column::Id)
        .all(&txn)
        .await?;

    let mut result = RecurrenceRunResult::default();
    for template in due {
        let Some(next) = template.next_occurrence else {
            continue;
        };
        let direction = Direction::from_code(template.direction);
        let mut last = template.last_occurrence;
        // One pass over the schedule, however far behind the template is
        let mut schedule = setting_of(&template)
            .occurrences()
            .skip_while(|date| *date < next);
        let mut upcoming = schedule.next();

        while let Some(date) = upcoming.filter(|date| *date <= today) {
            insert_linked_transaction(
                &txn,
                template.wallet_id,
                template.category_id,
                direction,
                template.amount,
                template.description.clone(),
                date.and_time(NaiveTime::MIN),
                Origin::Recurrence(template.id),
            )
            .await?;
            result.created += 1;
            last = Some(date);
            upcoming = schedule.next();
        }

        debug!(
            "Recurrence {} advanced to {:?} (last {:?})",
            template.id, upcoming, last
        );
        if upcoming.is_none() {
            result.finished += 1;
        }
        result.processed += 1;

        let mut active: recurrent_transaction::ActiveModel = template.into();
        active.last_occurrence = Set(last);
        active.next_occurrence = Set(upcoming);
        active.update(&txn).await?;
    }
    txn.commit().await?;

    if result.created > 0 {
        info!(
            "Created {} recurrent transactions from {} templates",
            result.created, result.processed
        );
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::category::{SystemTag, get_system_category};
    use crate::core::recurrence::Frequency;
    use crate::core::transaction::get_transactions_for_wallet;
    use crate::core::wallet::wallet_balance;
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn rent(
        db: &DatabaseConnection,
        wallet_id: i64,
        setting: RecurrenceSetting,
    ) -> Result<recurrent_transaction::Model> {
        let category = create_test_category(db, "Rent", CategoryType::Expense).await?;
        create_recurrent_transaction(
            db,
            NewRecurrentTransaction {
                wallet_id,
                category_id: category.id,
                direction: None,
                amount: 50_000,
                description: "Rent".to_string(),
                setting,
            },
        )
        .await
    }

    #[tokio::test]
    async fn test_create_schedules_first_occurrence() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let setting = RecurrenceSetting::new(date(2026, 1, 31), Frequency::Monthly);
        let template = rent(&db, wallet.id, setting).await?;

        assert_eq!(template.next_occurrence, Some(date(2026, 1, 31)));
        assert_eq!(template.last_occurrence, None);
        assert_eq!(setting_of(&template), setting);
        Ok(())
    }

    #[tokio::test]
    async fn test_process_due_materialises_each_occurrence() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let setting = RecurrenceSetting::new(date(2026, 1, 1), Frequency::Monthly);
        let template = rent(&db, wallet.id, setting).await?;

        let result = process_due_recurrences(&db, date(2026, 3, 15)).await?;
        assert_eq!(
            result,
            RecurrenceRunResult {
                processed: 1,
                created: 3,
                finished: 0
            }
        );
        assert_eq!(wallet_balance(&db, wallet.id).await?, -150_000);

        let stored = get_recurrent_transaction_by_id(&db, template.id).await?.unwrap();
        assert_eq!(stored.last_occurrence, Some(date(2026, 3, 1)));
        assert_eq!(stored.next_occurrence, Some(date(2026, 4, 1)));

        // Running again on the same day creates nothing new
        let again = process_due_recurrences(&db, date(2026, 3, 15)).await?;
        assert_eq!(again.created, 0);
        assert_eq!(get_transactions_for_wallet(&db, wallet.id).await?.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_exhausted_rule_clears_next_occurrence() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let setting = RecurrenceSetting::builder(date(2026, 1, 1), Frequency::Weekly)
            .occurrences(2)
            .build()?;
        let template = rent(&db, wallet.id, setting).await?;

        let result = process_due_recurrences(&db, date(2026, 6, 1)).await?;
        assert_eq!(result.created, 2);
        assert_eq!(result.finished, 1);

        let stored = get_recurrent_transaction_by_id(&db, template.id).await?.unwrap();
        assert_eq!(stored.last_occurrence, Some(date(2026, 1, 8)));
        assert_eq!(stored.next_occurrence, None);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_keeps_generated_transactions() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let template = rent(
            &db,
            wallet.id,
            RecurrenceSetting::new(date(2026, 1, 1), Frequency::Daily),
        )
        .await?;
        process_due_recurrences(&db, date(2026, 1, 2)).await?;

        delete_recurrent_transaction(&db, template.id).await?;
        let left = get_transactions_for_wallet(&db, wallet.id).await?;
        assert_eq!(left.len(), 2);
        assert!(left.iter().all(|t| t.recurrence_id.is_none()));
        assert!(get_all_recurrent_transactions(&db).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_catches_up_years_of_daily_occurrences() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let template = rent(
            &db,
            wallet.id,
            RecurrenceSetting::new(date(2020, 1, 1), Frequency::Daily),
        )
        .await?;

        let result = process_due_recurrences(&db, date(2025, 12, 31)).await?;
        let days = (date(2025, 12, 31) - date(2020, 1, 1)).num_days() + 1;
        assert_eq!(result.created, usize::try_from(days).unwrap());

        let stored = get_recurrent_transaction_by_id(&db, template.id).await?.unwrap();
        assert_eq!(stored.last_occurrence, Some(date(2025, 12, 31)));
        assert_eq!(stored.next_occurrence, Some(date(2026, 1, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn test_system_category_rejected() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Bank").await?;
        let tax = get_system_category(&db, SystemTag::Tax).await?;
        let result = create_recurrent_transaction(
            &db,
            NewRecurrentTransaction {
                wallet_id: wallet.id,
                category_id: tax.id,
                direction: None,
                amount: 1,
                description: String::new(),
                setting: RecurrenceSetting::new(date(2026, 1, 1), Frequency::Daily),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }
}
