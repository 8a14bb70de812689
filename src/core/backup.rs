//! Backup and restore of the whole database through a storage backend.
//!
//! A standard backup is a JSON snapshot of every table, uploaded as a
//! `.mwbx` file. Protected (`.mwbs`) and legacy (`.mwb`) files are recognised
//! when listing but cannot be restored by this build.
//!
//! Every operation of [`BackupService`] reports its progress on a broadcast
//! channel: one [`BackupEvent::Started`] followed by exactly one
//! [`BackupEvent::Finished`] or [`BackupEvent::Failed`].

use crate::{
    core::backend::{BackendFile, BackendService},
    entities::{
        Attachment, Budget, Category, Currency, Debt, Event, Person, Place, RecurrentTransaction, Saving,
        Transaction, Transfer, Wallet, attachment, budget, category, currency, debt, event,
        person, place, recurrent_transaction, saving, transaction, transfer, wallet,
    },
    errors::{Error, Result},
};
use chrono::NaiveDateTime;
use sea_orm::{IntoActiveModel, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Version written into every standard backup.
pub const BACKUP_VERSION: u32 = 1;

/// Capacity of the event channel; slow subscribers miss the oldest events.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Backup file formats, identified by file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupFormat {
    /// JSON snapshot, `.mwbx`
    Standard,
    /// Password-protected snapshot, `.mwbs`
    Protected,
    /// Format of older releases, `.mwb`
    Legacy,
}

impl BackupFormat {
    /// Detects the format of a file from its name.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        [Self::Standard, Self::Protected, Self::Legacy]
            .into_iter()
            .find(|format| lower.ends_with(format.extension()))
    }

    /// File name suffix including the dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Standard => ".mwbx",
            Self::Protected => ".mwbs",
            Self::Legacy => ".mwb",
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Protected => "protected",
            Self::Legacy => "legacy",
        }
    }
}

/// File name of a standard backup created at `created_at`.
#[must_use]
pub fn backup_file_name(created_at: NaiveDateTime) -> String {
    format!(
        "backup_{}{}",
        created_at.format("%Y-%m-%d_%H-%M-%S"),
        BackupFormat::Standard.extension()
    )
}

/// Operation reported by a [`BackupEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupOperation {
    /// Listing the backups of a folder
    List,
    /// Creating a backup
    Backup,
    /// Restoring a backup
    Restore,
}

impl BackupOperation {
    /// Stable integer code of the operation.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::List => 0,
            Self::Backup => 1,
            Self::Restore => 2,
        }
    }
}

/// Progress notification of a [`BackupService`] operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupEvent {
    /// The operation started
    Started {
        /// Which operation
        operation: BackupOperation,
    },
    /// The operation succeeded
    Finished {
        /// Which operation
        operation: BackupOperation,
        /// Names of the files involved
        files: Vec<String>,
    },
    /// The operation failed
    Failed {
        /// Which operation
        operation: BackupOperation,
        /// Error message
        error: String,
        /// Whether retrying may succeed
        recoverable: bool,
    },
}

/// Every table of the database, as written to a standard backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupSnapshot {
    /// Format version
    pub version: u32,
    /// When the snapshot was taken
    pub created_at: NaiveDateTime,
    /// `currencies` rows
    pub currencies: Vec<currency::Model>,
    /// `people` rows
    pub people: Vec<person::Model>,
    /// `places` rows
    pub places: Vec<place::Model>,
    /// `events` rows
    pub events: Vec<event::Model>,
    /// `wallets` rows
    pub wallets: Vec<wallet::Model>,
    /// `categories` rows
    pub categories: Vec<category::Model>,
    /// `transfers` rows
    pub transfers: Vec<transfer::Model>,
    /// `budgets` rows
    pub budgets: Vec<budget::Model>,
    /// `debts` rows
    pub debts: Vec<debt::Model>,
    /// `savings` rows
    pub savings: Vec<saving::Model>,
    /// `recurrent_transactions` rows
    pub recurrent_transactions: Vec<recurrent_transaction::Model>,
    /// `transactions` rows
    pub transactions: Vec<transaction::Model>,
    /// `attachments` rows
    pub attachments: Vec<attachment::Model>,
}

impl BackupSnapshot {
    /// Reads every table.
    pub async fn capture<C>(db: &C, created_at: NaiveDateTime) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        Ok(Self {
            version: BACKUP_VERSION,
            created_at,
            currencies: Currency::find().all(db).await?,
            people: Person::find().all(db).await?,
            places: Place::find().all(db).await?,
            events: Event::find().all(db).await?,
            wallets: Wallet::find().all(db).await?,
            categories: Category::find().all(db).await?,
            transfers: Transfer::find().all(db).await?,
            budgets: Budget::find().all(db).await?,
            debts: Debt::find().all(db).await?,
            savings: Saving::find().all(db).await?,
            recurrent_transactions: RecurrentTransaction::find().all(db).await?,
            transactions: Transaction::find().all(db).await?,
            attachments: Attachment::find().all(db).await?,
        })
    }

    /// Total number of rows across all tables.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.currencies.len()
            + self.people.len()
            + self.places.len()
            + self.events.len()
            + self.wallets.len()
            + self.categories.len()
            + self.transfers.len()
            + self.budgets.len()
            + self.debts.len()
            + self.savings.len()
            + self.recurrent_transactions.len()
            + self.transactions.len()
            + self.attachments.len()
    }

    /// Replaces the content of every table with this snapshot in one database
    /// transaction. Nothing changes if any row fails to insert.
    pub async fn restore_into(self, db: &DatabaseConnection) -> Result<()> {
        let txn = db.begin().await?;

        // Children before parents
        Attachment::delete_many().exec(&txn).await?;
        Transaction::delete_many().exec(&txn).await?;
        RecurrentTransaction::delete_many().exec(&txn).await?;
        Saving::delete_many().exec(&txn).await?;
        Debt::delete_many().exec(&txn).await?;
        Budget::delete_many().exec(&txn).await?;
        Transfer::delete_many().exec(&txn).await?;
        Category::delete_many().exec(&txn).await?;
        Wallet::delete_many().exec(&txn).await?;
        Event::delete_many().exec(&txn).await?;
        Place::delete_many().exec(&txn).await?;
        Person::delete_many().exec(&txn).await?;
        Currency::delete_many().exec(&txn).await?;

        insert_rows::<Currency, _>(&txn, self.currencies).await?;
        insert_rows::<Person, _>(&txn, self.people).await?;
        insert_rows::<Place, _>(&txn, self.places).await?;
        insert_rows::<Event, _>(&txn, self.events).await?;
        insert_rows::<Wallet, _>(&txn, self.wallets).await?;
        insert_rows::<Category, _>(&txn, self.categories).await?;
        insert_rows::<Transfer, _>(&txn, self.transfers).await?;
        insert_rows::<Budget, _>(&txn, self.budgets).await?;
        insert_rows::<Debt, _>(&txn, self.debts).await?;
        insert_rows::<Saving, _>(&txn, self.savings).await?;
        insert_rows::<RecurrentTransaction, _>(&txn, self.recurrent_transactions).await?;
        insert_rows::<Transaction, _>(&txn, self.transactions).await?;
        insert_rows::<Attachment, _>(&txn, self.attachments).await?;

        txn.commit().await?;
        Ok(())
    }
}

async fn insert_rows<E, C>(db: &C, rows: Vec<E::Model>) -> Result<()>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelTrait<Entity = E>,
    C: ConnectionTrait,
{
    for row in rows {
        // reset_all marks every column as set so primary keys are kept
        E::insert(row.into_active_model().reset_all())
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// Creates, lists and restores backups, broadcasting progress events.
#[derive(Debug, Clone)]
pub struct BackupService {
    db: DatabaseConnection,
    events: broadcast::Sender<BackupEvent>,
    keep_last: Option<usize>,
    work_dir: PathBuf,
}

impl BackupService {
    /// A service backing up `db`, using the system temporary directory for
    /// intermediate files and keeping every backup.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            db,
            events,
            keep_last: None,
            work_dir: std::env::temp_dir().join("moneywallet"),
        }
    }

    /// Keeps only the `count` newest standard backups after each backup. The
    /// backup just written is always kept, even when `count` is zero.
    #[must_use]
    pub fn keep_last(mut self, count: usize) -> Self {
        self.keep_last = Some(count);
        self
    }

    /// Directory for files being uploaded or downloaded. Each operation works in
    /// its own subdirectory and removes it afterwards.
    #[must_use]
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    /// Receives the events of every operation started after this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BackupEvent> {
        self.events.subscribe()
    }

    /// Creates a fresh subdirectory of the work directory.
    async fn staging_dir(&self) -> Result<PathBuf> {
        let dir = self.work_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    fn emit(&self, event: BackupEvent) {
        if self.events.send(event).is_err() {
            debug!("No backup event subscribers");
        }
    }

    fn report<T>(&self, operation: BackupOperation, result: &Result<T>, files: impl FnOnce(&T) -> Vec<String>) {
        match result {
            Ok(value) => self.emit(BackupEvent::Finished {
                operation,
                files: files(value),
            }),
            Err(e) => {
                error!("Backup operation {operation:?} failed: {e}");
                let recoverable = matches!(e, Error::Backend(b) if b.is_recoverable());
                self.emit(BackupEvent::Failed {
                    operation,
                    error: e.to_string(),
                    recoverable,
                });
            }
        }
    }

    /// Lists the backup files of `folder`, oldest first.
    pub async fn list_backups<B>(&self, backend: &B, folder: Option<&B::File>) -> Result<Vec<B::File>>
    where
        B: BackendService,
    {
        self.emit(BackupEvent::Started {
            operation: BackupOperation::List,
        });
        let result = list_backup_files(backend, folder).await;
        self.report(BackupOperation::List, &result, |files| {
            files.iter().map(BackendFile::name).collect()
        });
        result
    }

    /// Uploads a fresh standard backup into `folder`.
    pub async fn create_backup<B>(&self, backend: &B, folder: Option<&B::File>) -> Result<B::File>
    where
        B: BackendService,
    {
        self.create_backup_at(backend, folder, chrono::Local::now().naive_local())
            .await
    }

    /// Same as [`BackupService::create_backup`] with an explicit creation time,
    /// which also names the file.
    #[instrument(skip(self, backend, folder))]
    pub async fn create_backup_at<B>(
        &self,
        backend: &B,
        folder: Option<&B::File>,
        created_at: NaiveDateTime,
    ) -> Result<B::File>
    where
        B: BackendService,
    {
        self.emit(BackupEvent::Started {
            operation: BackupOperation::Backup,
        });
        let result = self.write_backup(backend, folder, created_at).await;
        self.report(BackupOperation::Backup, &result, |file| vec![file.name()]);
        result
    }

    async fn write_backup<B>(
        &self,
        backend: &B,
        folder: Option<&B::File>,
        created_at: NaiveDateTime,
    ) -> Result<B::File>
    where
        B: BackendService,
    {
        let snapshot = BackupSnapshot::capture(&self.db, created_at).await?;
        let rows = snapshot.row_count();
        let payload = serde_json::to_vec_pretty(&snapshot)?;

        let staging = self.staging_dir().await?;
        let local = staging.join(backup_file_name(created_at));
        let uploaded = match tokio::fs::write(&local, payload).await {
            Ok(()) => backend.upload(folder, &local).await.map_err(Error::from),
            Err(e) => Err(e.into()),
        };
        remove_staging(&staging).await;
        let uploaded = uploaded?;
        info!(
            "Backup {} uploaded to {} backend ({rows} rows)",
            uploaded.name(),
            backend.name()
        );

        if let Some(keep) = self.keep_last {
            prune_backups(backend, folder, keep, &uploaded.name()).await?;
        }
        Ok(uploaded)
    }

    /// Replaces the database content with the backup in `file`.
    #[instrument(skip(self, backend, file))]
    pub async fn restore_backup<B>(&self, backend: &B, file: &B::File) -> Result<()>
    where
        B: BackendService,
    {
        self.emit(BackupEvent::Started {
            operation: BackupOperation::Restore,
        });
        let result = self.read_backup(backend, file).await;
        let name = file.name();
        self.report(BackupOperation::Restore, &result, |_| vec![name]);
        result
    }

    async fn read_backup<B>(&self, backend: &B, file: &B::File) -> Result<()>
    where
        B: BackendService,
    {
        let name = file.name();
        match BackupFormat::from_file_name(&name) {
            Some(BackupFormat::Standard) => {}
            Some(other) => {
                return Err(Error::UnsupportedBackup {
                    format: other.label().to_string(),
                });
            }
            None => {
                return Err(Error::UnsupportedBackup {
                    format: format!("unknown ({name})"),
                });
            }
        }

        let staging = self.staging_dir().await?;
        let payload = match backend.download(&staging, file).await {
            Ok(local) => tokio::fs::read(&local).await.map_err(Error::from),
            Err(e) => Err(e.into()),
        };
        remove_staging(&staging).await;
        let snapshot: BackupSnapshot = serde_json::from_slice(&payload?)?;
        if snapshot.version > BACKUP_VERSION {
            return Err(Error::UnsupportedBackup {
                format: format!("standard v{}", snapshot.version),
            });
        }

        let rows = snapshot.row_count();
        snapshot.restore_into(&self.db).await?;
        info!("Restored backup {name} ({rows} rows)");
        Ok(())
    }
}

async fn remove_staging(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        warn!("Could not remove {}: {e}", dir.display());
    }
}

async fn list_backup_files<B>(backend: &B, folder: Option<&B::File>) -> Result<Vec<B::File>>
where
    B: BackendService,
{
    let mut files: Vec<B::File> = backend
        .list(folder)
        .await?
        .into_iter()
        .filter(|f| !f.is_directory() && BackupFormat::from_file_name(&f.name()).is_some())
        .collect();
    files.sort_by_key(BackendFile::name);
    Ok(files)
}

/// Removes the oldest standard backups of `folder` beyond the newest `keep`.
/// `current` counts towards `keep` but is never removed.
async fn prune_backups<B>(
    backend: &B,
    folder: Option<&B::File>,
    keep: usize,
    current: &str,
) -> Result<usize>
where
    B: BackendService,
{
    let standard: Vec<B::File> = list_backup_files(backend, folder)
        .await?
        .into_iter()
        .filter(|f| {
            let name = f.name();
            name != current && BackupFormat::from_file_name(&name) == Some(BackupFormat::Standard)
        })
        .collect();
    let excess = standard.len().saturating_sub(keep.saturating_sub(1));
    for old in &standard[..excess] {
        backend.remove(old).await?;
        debug!("Pruned old backup {}", old.name());
    }
    Ok(excess)
}
