//! Event business logic - named periods transactions can be grouped under.

use crate::{
    core::transaction::get_transactions_in_range,
    entities::{Event, Transaction, event, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};

/// Adds an event spanning `start_date..=end_date`.
pub async fn create_event(
    db: &DatabaseConnection,
    name: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    note: Option<String>,
) -> Result<event::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Event name cannot be empty"));
    }
    if end_date < start_date {
        return Err(Error::invalid_input("Event ends before it starts"));
    }

    let model = event::ActiveModel {
        name: Set(name.trim().to_string()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        note: Set(note),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds an event by ID.
pub async fn get_event_by_id(db: &DatabaseConnection, event_id: i64) -> Result<Option<event::Model>> {
    Event::find_by_id(event_id).one(db).await.map_err(Into::into)
}

/// Lists events, most recent first.
pub async fn get_all_events(db: &DatabaseConnection) -> Result<Vec<event::Model>> {
    Event::find()
        .order_by_desc(event::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Transactions tagged with the event. Untagged transactions dated inside the
/// event are not included.
pub async fn get_event_transactions(
    db: &DatabaseConnection,
    event_id: i64,
) -> Result<Vec<transaction::Model>> {
    let event = get_event_by_id(db, event_id).await?.ok_or(Error::NotFound {
        entity: "Event",
        id: event_id,
    })?;
    let in_range = get_transactions_in_range(db, event.start_date, event.end_date, None).await?;
    Ok(in_range
        .into_iter()
        .filter(|t| t.event_id == Some(event_id))
        .collect())
}

/// Deletes an event, detaching it from any transaction.
pub async fn delete_event(db: &DatabaseConnection, event_id: i64) -> Result<()> {
    Transaction::update_many()
        .col_expr(transaction::Column::EventId, Expr::value(Option::<i64>::None))
        .filter(transaction::Column::EventId.eq(event_id))
        .exec(db)
        .await?;

    let result = Event::delete_by_id(event_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Event",
            id: event_id,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::category::CategoryType;
    use crate::core::transaction::{NewTransaction, create_transaction};
    use crate::test_utils::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).unwrap()
    }

    #[tokio::test]
    async fn test_event_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_event(&db, "Trip".to_string(), day(10), day(1), None).await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_event_transactions_and_delete() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let trip = create_event(&db, "Trip".to_string(), day(1), day(10), None).await?;

        let mut tagged = NewTransaction::new(wallet.id, food.id, 100, "pizza", date_time(2026, 8, 3));
        tagged.event_id = Some(trip.id);
        let tagged = create_transaction(&db, tagged).await?;
        create_transaction(
            &db,
            NewTransaction::new(wallet.id, food.id, 100, "home", date_time(2026, 8, 4)),
        )
        .await?;

        let found = get_event_transactions(&db, trip.id).await?;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tagged.id);

        delete_event(&db, trip.id).await?;
        let detached = crate::core::transaction::get_transaction_by_id(&db, tagged.id)
            .await?
            .unwrap();
        assert_eq!(detached.event_id, None);
        assert!(get_all_events(&db).await?.is_empty());
        Ok(())
    }
}
