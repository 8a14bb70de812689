//! Database configuration module for `MoneyWallet`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the schema always matches the Rust
//! structs. Tables are created parents first because `SQLite` enforces the
//! foreign keys declared by the entities.

use crate::entities::{
    Attachment, Budget, Category, Currency, Debt, Event, Person, Place, RecurrentTransaction,
    Saving, Transaction, Transfer, Wallet,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

/// Database used when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/moneywallet.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling
/// back to a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates every table that does not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Currency).await?;
    create_table(db, &schema, Person).await?;
    create_table(db, &schema, Place).await?;
    create_table(db, &schema, Event).await?;
    create_table(db, &schema, Wallet).await?;
    create_table(db, &schema, Category).await?;
    create_table(db, &schema, Transfer).await?;
    create_table(db, &schema, Budget).await?;
    create_table(db, &schema, Debt).await?;
    create_table(db, &schema, Saving).await?;
    create_table(db, &schema, RecurrentTransaction).await?;
    create_table(db, &schema, Transaction).await?;
    create_table(db, &schema, Attachment).await?;

    Ok(())
}
