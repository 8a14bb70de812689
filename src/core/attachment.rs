//! Attachment business logic - files linked to transactions.
//!
//! Only the metadata lives in the database; the file content is stored by the
//! caller wherever it keeps attachment blobs.

use crate::{
    entities::{Attachment, Transaction, attachment},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Records a file attached to a transaction.
pub async fn create_attachment(
    db: &DatabaseConnection,
    transaction_id: i64,
    file_name: String,
    mime_type: String,
    size: i64,
) -> Result<attachment::Model> {
    if file_name.trim().is_empty() {
        return Err(Error::invalid_input("Attachment file name cannot be empty"));
    }
    if size < 0 {
        return Err(Error::invalid_input("Attachment size cannot be negative"));
    }
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or(Error::TransactionNotFound { id: transaction_id })?;

    let model = attachment::ActiveModel {
        transaction_id: Set(transaction_id),
        file_name: Set(file_name),
        mime_type: Set(mime_type),
        size: Set(size),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds an attachment by ID.
pub async fn get_attachment_by_id(
    db: &DatabaseConnection,
    attachment_id: i64,
) -> Result<Option<attachment::Model>> {
    Attachment::find_by_id(attachment_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists the attachments of a transaction.
pub async fn get_attachments_for_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Vec<attachment::Model>> {
    Attachment::find()
        .filter(attachment::Column::TransactionId.eq(transaction_id))
        .order_by_asc(attachment::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a single attachment record.
pub async fn delete_attachment(db: &DatabaseConnection, attachment_id: i64) -> Result<()> {
    let result = Attachment::delete_by_id(attachment_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Attachment",
            id: attachment_id,
        });
    }
    Ok(())
}

/// Deletes every attachment of the given transactions.
pub(crate) async fn delete_attachments_for_transactions<C>(
    db: &C,
    transaction_ids: &[i64],
) -> Result<u64>
where
    C: ConnectionTrait,
{
    if transaction_ids.is_empty() {
        return Ok(0);
    }
    let result = Attachment::delete_many()
        .filter(attachment::Column::TransactionId.is_in(transaction_ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::category::CategoryType;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_attachment_lifecycle() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let transaction = create_test_transaction(&db, wallet.id, food.id, 100).await?;

        let receipt = create_attachment(
            &db,
            transaction.id,
            "receipt.jpg".to_string(),
            "image/jpeg".to_string(),
            2048,
        )
        .await?;
        assert_eq!(get_attachments_for_transaction(&db, transaction.id).await?.len(), 1);
        let stored = get_attachment_by_id(&db, receipt.id).await?;
        assert_eq!(stored.map(|a| a.size), Some(2048));

        // Deleting the transaction removes its attachments
        crate::core::transaction::delete_transaction(&db, transaction.id).await?;
        assert!(get_attachment_by_id(&db, receipt.id).await?.is_none());
        assert!(matches!(
            delete_attachment(&db, receipt.id).await,
            Err(Error::NotFound { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_attachment_requires_transaction() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_attachment(
            &db,
            42,
            "receipt.pdf".to_string(),
            "application/pdf".to_string(),
            10,
        )
        .await;
        assert!(matches!(result, Err(Error::TransactionNotFound { id: 42 })));
        Ok(())
    }
}
