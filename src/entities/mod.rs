//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod attachment;
pub mod budget;
pub mod category;
pub mod currency;
pub mod debt;
pub mod event;
pub mod person;
pub mod place;
pub mod recurrent_transaction;
pub mod saving;
pub mod transaction;
pub mod transfer;
pub mod wallet;

// Re-export specific types to avoid conflicts
pub use attachment::{Entity as Attachment, Model as AttachmentModel};
pub use budget::{Column as BudgetColumn, Entity as Budget, Model as BudgetModel};
pub use category::{Column as CategoryColumn, Entity as Category, Model as CategoryModel};
pub use currency::{Column as CurrencyColumn, Entity as Currency, Model as CurrencyModel};
pub use debt::{Column as DebtColumn, Entity as Debt, Model as DebtModel};
pub use event::{Entity as Event, Model as EventModel};
pub use person::{Entity as Person, Model as PersonModel};
pub use place::{Entity as Place, Model as PlaceModel};
pub use recurrent_transaction::{
    Column as RecurrentTransactionColumn, Entity as RecurrentTransaction,
    Model as RecurrentTransactionModel,
};
pub use saving::{Entity as Saving, Model as SavingModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use transfer::{Column as TransferColumn, Entity as Transfer, Model as TransferModel};
pub use wallet::{Column as WalletColumn, Entity as Wallet, Model as WalletModel};
