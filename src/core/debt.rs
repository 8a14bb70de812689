//! Debt business logic - money borrowed from or lent to someone.
//!
//! Opening a debt records the money movement on its wallet through a `debt` or
//! `credit` system transaction. Each repayment records a `paid_debt` or
//! `paid_credit` transaction linked to the debt, so progress is the sum of those.

use crate::{
    core::{
        category::{SystemTag, get_system_category},
        transaction::{Origin, insert_linked_transaction},
        wallet::get_wallet_by_id,
    },
    entities::{Debt, Person, Transaction, debt, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, NaiveDateTime};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Which side of the debt the user is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtKind {
    /// The user borrowed money and owes it back
    Debt,
    /// The user lent money and is owed it
    Credit,
}

impl DebtKind {
    /// Integer code stored in the database.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Debt => 0,
            Self::Credit => 1,
        }
    }

    /// Decodes a stored integer code.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Debt),
            1 => Ok(Self::Credit),
            other => Err(Error::invalid_input(format!("unknown debt kind {other}"))),
        }
    }

    const fn opening_tag(self) -> SystemTag {
        match self {
            Self::Debt => SystemTag::Debt,
            Self::Credit => SystemTag::Credit,
        }
    }

    const fn repayment_tag(self) -> SystemTag {
        match self {
            Self::Debt => SystemTag::PaidDebt,
            Self::Credit => SystemTag::PaidCredit,
        }
    }
}

/// Input for [`create_debt`].
#[derive(Debug, Clone)]
pub struct NewDebt {
    /// Which side of the debt the user is on
    pub kind: DebtKind,
    /// Wallet the money moves through
    pub wallet_id: i64,
    /// Total amount in minor units
    pub money: i64,
    /// Human-readable description
    pub description: String,
    /// When the debt was opened
    pub date: NaiveDateTime,
    /// Counterpart of the debt
    pub person_id: Option<i64>,
    /// When the debt should be settled
    pub expiration_date: Option<NaiveDate>,
}

impl NewDebt {
    /// A debt with no counterpart and no expiration.
    pub fn new(
        kind: DebtKind,
        wallet_id: i64,
        money: i64,
        description: impl Into<String>,
        date: NaiveDateTime,
    ) -> Self {
        Self {
            kind,
            wallet_id,
            money,
            description: description.into(),
            date,
            person_id: None,
            expiration_date: None,
        }
    }
}

/// Repayment state of a debt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtProgress {
    /// The debt being measured
    pub debt: debt::Model,
    /// Amount repaid so far in minor units
    pub paid: i64,
}

impl DebtProgress {
    /// Amount still to be repaid.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        self.debt.money - self.paid
    }

    /// Whether the debt has been fully repaid.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.paid >= self.debt.money
    }
}

/// Opens a debt and records the initial money movement on its wallet.
pub async fn create_debt(db: &DatabaseConnection, new: NewDebt) -> Result<debt::Model> {
    if new.money <= 0 {
        return Err(Error::InvalidAmount { amount: new.money });
    }

    let txn = db.begin().await?;
    get_wallet_by_id(&txn, new.wallet_id)
        .await?
        .ok_or(Error::WalletNotFound { id: new.wallet_id })?;
    if let Some(person_id) = new.person_id {
        Person::find_by_id(person_id)
            .one(&txn)
            .await?
            .ok_or(Error::NotFound {
                entity: "Person",
                id: person_id,
            })?;
    }

    let record = debt::ActiveModel {
        kind: Set(new.kind.code()),
        person_id: Set(new.person_id),
        wallet_id: Set(new.wallet_id),
        description: Set(new.description.clone()),
        date: Set(new.date),
        expiration_date: Set(new.expiration_date),
        money: Set(new.money),
        archived: Set(false),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let tag = new.kind.opening_tag();
    let category = get_system_category(&txn, tag).await?;
    let direction = tag.direction().ok_or_else(|| Error::Config {
        message: format!("System tag '{}' has no direction", tag.as_str()),
    })?;
    insert_linked_transaction(
        &txn,
        new.wallet_id,
        category.id,
        direction,
        new.money,
        new.description,
        new.date,
        Origin::Debt(record.id),
    )
    .await?;

    txn.commit().await?;
    info!("Opened {:?} {} of {}", new.kind, record.id, record.money);
    Ok(record)
}

/// Finds a debt by ID.
pub async fn get_debt_by_id(db: &DatabaseConnection, debt_id: i64) -> Result<Option<debt::Model>> {
    Debt::find_by_id(debt_id).one(db).await.map_err(Into::into)
}

/// Lists non-archived debts, most recent first.
pub async fn get_active_debts(db: &DatabaseConnection) -> Result<Vec<debt::Model>> {
    Debt::find()
        .filter(debt::Column::Archived.eq(false))
        .order_by_desc(debt::Column::Date)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn paid_amount<C>(db: &C, debt: &debt::Model) -> Result<i64>
where
    C: ConnectionTrait,
{
    let kind = DebtKind::from_code(debt.kind)?;
    let repayment = get_system_category(db, kind.repayment_tag()).await?;
    let payments = Transaction::find()
        .filter(transaction::Column::DebtId.eq(debt.id))
        .filter(transaction::Column::CategoryId.eq(repayment.id))
        .all(db)
        .await?;
    Ok(payments.iter().fold(0i64, |acc, t| acc.saturating_add(t.amount)))
}

/// Records a repayment of `amount` on a debt.
///
/// Repaying more than what is left is rejected.
pub async fn pay_debt(
    db: &DatabaseConnection,
    debt_id: i64,
    amount: i64,
    date: NaiveDateTime,
) -> Result<DebtProgress> {
    if amount <= 0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;
    let debt = Debt::find_by_id(debt_id)
        .one(&txn)
        .await?
        .ok_or(Error::NotFound {
            entity: "Debt",
            id: debt_id,
        })?;
    let kind = DebtKind::from_code(debt.kind)?;

    let paid = paid_amount(&txn, &debt).await?;
    let remaining = debt.money - paid;
    if amount > remaining {
        return Err(Error::InsufficientFunds {
            current: remaining,
            required: amount,
        });
    }

    let tag = kind.repayment_tag();
    let category = get_system_category(&txn, tag).await?;
    let direction = tag.direction().ok_or_else(|| Error::Config {
        message: format!("System tag '{}' has no direction", tag.as_str()),
    })?;
    insert_linked_transaction(
        &txn,
        debt.wallet_id,
        category.id,
        direction,
        amount,
        debt.description.clone(),
        date,
        Origin::Debt(debt.id),
    )
    .await?;
    txn.commit().await?;

    Ok(DebtProgress {
        debt,
        paid: paid + amount,
    })
}

/// Current repayment state of a debt.
pub async fn debt_progress(db: &DatabaseConnection, debt_id: i64) -> Result<DebtProgress> {
    let debt = get_debt_by_id(db, debt_id).await?.ok_or(Error::NotFound {
        entity: "Debt",
        id: debt_id,
    })?;
    let paid = paid_amount(db, &debt).await?;
    Ok(DebtProgress { debt, paid })
}

/// Hides a debt from the active list.
pub async fn archive_debt(db: &DatabaseConnection, debt_id: i64) -> Result<debt::Model> {
    let debt = get_debt_by_id(db, debt_id).await?.ok_or(Error::NotFound {
        entity: "Debt",
        id: debt_id,
    })?;
    let mut active: debt::ActiveModel = debt.into();
    active.archived = Set(true);
    Ok(active.update(db).await?)
}
