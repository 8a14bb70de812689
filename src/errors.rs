//! Unified error types for `MoneyWallet`.
//!
//! Domain failures carry named fields so callers can match on them, while
//! infrastructure errors (database, I/O, serialization) convert through `#[from]`.

use std::fmt;
use thiserror::Error;

/// Domain error codes raised by data-integrity checks.
///
/// These are the conditions a user can trigger by editing data that other rows
/// still depend on. They are surfaced verbatim to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataErrorCode {
    /// A category cannot be deleted while it still has child categories
    CategoryHasChildren,
    /// A category cannot be deleted while transactions, recurrent transactions
    /// or budgets reference it
    CategoryInUse,
    /// System categories are created by the application and are read-only
    SystemCategoryNotModifiable,
    /// Only top-level categories of the same type can act as parents
    InvalidParentCategory,
    /// A wallet referenced by a transfer cannot be deleted
    WalletUsedInTransfer,
    /// A transaction that is a transfer leg must be edited through the transfer
    TransactionInTransfer,
    /// A currency cannot be deleted while a wallet uses it
    CurrencyInUse,
    /// A person cannot be deleted while a debt references them
    PersonUsedInDebt,
}

impl DataErrorCode {
    /// Returns the message shown to the user for this code.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CategoryHasChildren => "This category has sub-categories and cannot be deleted",
            Self::CategoryInUse => {
                "This category is used by transactions, recurrent transactions or budgets"
            },
            Self::SystemCategoryNotModifiable => "System categories cannot be modified",
            Self::InvalidParentCategory => {
                "A parent category must be a top-level category of the same type"
            }
            Self::WalletUsedInTransfer => "This wallet is used in a transfer",
            Self::TransactionInTransfer => "This transaction belongs to a transfer",
            Self::CurrencyInUse => "This currency is used by a wallet",
            Self::PersonUsedInDebt => "This person is linked to a debt",
        }
    }
}

impl fmt::Display for DataErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error raised by a storage backend.
///
/// Backends decide whether a failure is worth retrying; this layer only carries
/// the flag for the caller to branch on.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct BackendError {
    message: String,
    recoverable: bool,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl BackendError {
    /// Creates a backend error without an underlying cause.
    pub fn new(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            message: message.into(),
            recoverable,
            source: None,
        }
    }

    /// Creates a backend error wrapping the cause that produced it.
    pub fn with_source(
        message: impl Into<String>,
        recoverable: bool,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            recoverable,
            source: Some(Box::new(source)),
        }
    }

    /// A file handle of another backend was passed to this one.
    pub fn type_mismatch(expected: &str, found: &str) -> Self {
        Self::new(
            format!("Expected a file of type {expected} but received {found}"),
            false,
        )
    }

    /// Whether the operation may succeed if attempted again.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        self.recoverable
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for `MoneyWallet`
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file or environment problem
    #[error("Configuration error: {message}")]
    Config {
        /// Description of what went wrong
        message: String,
    },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A domain integrity rule was violated
    #[error("{code}")]
    Data {
        /// Which rule was violated
        code: DataErrorCode,
    },

    /// A storage backend failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Amount is zero, negative where it must be positive, or otherwise unusable
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount in minor units
        amount: i64,
    },

    /// Money arithmetic left the range of `i64`
    #[error("Money overflow in currency {currency}")]
    MoneyOverflow {
        /// Currency whose amount overflowed
        currency: String,
    },

    /// Money text form could not be parsed
    #[error("Invalid money string '{input}': {reason}")]
    MoneyParse {
        /// The rejected input
        input: String,
        /// Why it was rejected
        reason: String,
    },

    /// Recurrence rule could not be parsed or built
    #[error("Invalid recurrence rule '{rule}': {reason}")]
    RecurrenceParse {
        /// The rejected rule
        rule: String,
        /// Why it was rejected
        reason: String,
    },

    /// Not enough money to complete the operation
    #[error("Insufficient funds: {current} available, {required} required")]
    InsufficientFunds {
        /// Amount available in minor units
        current: i64,
        /// Amount requested in minor units
        required: i64,
    },

    /// Transfer parameters are inconsistent
    #[error("Invalid transfer: {reason}")]
    InvalidTransfer {
        /// Why the transfer was rejected
        reason: String,
    },

    /// Unknown currency code
    #[error("Currency '{code}' not found")]
    CurrencyNotFound {
        /// The currency code that was looked up
        code: String,
    },

    /// Wallet not found
    #[error("Wallet {id} not found")]
    WalletNotFound {
        /// The wallet ID that was looked up
        id: i64,
    },

    /// Category not found
    #[error("Category {id} not found")]
    CategoryNotFound {
        /// The category ID that was looked up
        id: i64,
    },

    /// Transaction not found
    #[error("Transaction {id} not found")]
    TransactionNotFound {
        /// The transaction ID that was looked up
        id: i64,
    },

    /// Any other entity not found by ID
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of entity ("Budget", "Debt", ...)
        entity: &'static str,
        /// The ID that was looked up
        id: i64,
    },

    /// A required field was empty or malformed
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Description of the problem
        message: String,
    },

    /// Backup file is in a format this build cannot restore
    #[error("Unsupported backup format: {format}")]
    UnsupportedBackup {
        /// Name of the detected format
        format: String,
    },
}

impl Error {
    /// Shorthand for a [`DataErrorCode`] failure.
    #[must_use]
    pub const fn data(code: DataErrorCode) -> Self {
        Self::Data { code }
    }

    /// Shorthand for an [`Error::InvalidInput`] failure.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_flags() {
        let err = BackendError::new("timed out", true);
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "timed out");

        let mismatch = BackendError::type_mismatch("LocalFile", "RemoteFile");
        assert!(!mismatch.is_recoverable());
        assert!(mismatch.message().contains("LocalFile"));
    }

    #[test]
    fn test_data_error_display_uses_code_message() {
        let err = Error::data(DataErrorCode::CategoryHasChildren);
        assert_eq!(
            err.to_string(),
            DataErrorCode::CategoryHasChildren.message()
        );
    }

    #[test]
    fn test_backend_error_keeps_source() {
        use std::error::Error as _;

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = BackendError::with_source("download failed", false, io);
        assert!(err.source().is_some());
    }
}
