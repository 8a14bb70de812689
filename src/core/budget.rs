//! Budget business logic - limits on spending or earning over a date range.
//!
//! A budget tracks either every expense, every income, or a single category
//! (including its sub-categories) in one currency. Progress is computed from the
//! confirmed transactions dated inside the budget.

use crate::{
    core::category::{CategoryType, Direction, get_category_by_id},
    core::transaction::get_transactions_in_range,
    entities::{Budget, Category, Wallet, budget},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{QueryOrder, Set, prelude::*};
use std::collections::{HashMap, HashSet};

/// What a budget tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
    /// Every expense
    Expenses,
    /// Every income
    Incomes,
    /// A single category and its children
    Category(i64),
}

impl BudgetKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Expenses => "expenses",
            Self::Incomes => "incomes",
            Self::Category(_) => "category",
        }
    }

    /// Decodes the stored kind of a budget row.
    pub fn from_model(model: &budget::Model) -> Result<Self> {
        match (model.kind.as_str(), model.category_id) {
            ("expenses", _) => Ok(Self::Expenses),
            ("incomes", _) => Ok(Self::Incomes),
            ("category", Some(id)) => Ok(Self::Category(id)),
            (other, _) => Err(Error::invalid_input(format!("unknown budget kind '{other}'"))),
        }
    }
}

/// Spending measured against a budget's limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetProgress {
    /// The budget being measured
    pub budget: budget::Model,
    /// Amount counted so far in minor units
    pub progress: i64,
}

impl BudgetProgress {
    /// Amount left before reaching the limit; negative once exceeded.
    #[must_use]
    pub const fn remaining(&self) -> i64 {
        self.budget.money_limit - self.progress
    }

    /// Progress as a percentage of the limit (may exceed 100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.budget.money_limit <= 0 {
            return 0.0;
        }
        (self.progress as f64 * 100.0) / self.budget.money_limit as f64
    }

    /// Whether the limit has been exceeded.
    #[must_use]
    pub const fn is_exceeded(&self) -> bool {
        self.progress > self.budget.money_limit
    }
}

/// Creates a budget.
pub async fn create_budget(
    db: &DatabaseConnection,
    kind: BudgetKind,
    start_date: NaiveDate,
    end_date: NaiveDate,
    money_limit: i64,
    currency: &str,
) -> Result<budget::Model> {
    if money_limit <= 0 {
        return Err(Error::InvalidAmount {
            amount: money_limit,
        });
    }
    if end_date < start_date {
        return Err(Error::invalid_input("Budget ends before it starts"));
    }
    let category_id = match kind {
        BudgetKind::Category(id) => {
            let category = get_category_by_id(db, id)
                .await?
                .ok_or(Error::CategoryNotFound { id })?;
            if category.kind()? == CategoryType::System {
                return Err(Error::invalid_input("Budgets cannot track system categories"));
            }
            Some(id)
        }
        BudgetKind::Expenses | BudgetKind::Incomes => None,
    };

    let model = budget::ActiveModel {
        kind: Set(kind.as_str().to_string()),
        category_id: Set(category_id),
        start_date: Set(start_date),
        end_date: Set(end_date),
        money_limit: Set(money_limit),
        currency: Set(currency.to_ascii_uppercase()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Finds a budget by ID.
pub async fn get_budget_by_id(db: &DatabaseConnection, budget_id: i64) -> Result<Option<budget::Model>> {
    Budget::find_by_id(budget_id).one(db).await.map_err(Into::into)
}

/// Lists budgets, most recent first.
pub async fn get_all_budgets(db: &DatabaseConnection) -> Result<Vec<budget::Model>> {
    Budget::find()
        .order_by_desc(budget::Column::StartDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes a budget.
pub async fn delete_budget(db: &DatabaseConnection, budget_id: i64) -> Result<()> {
    let result = Budget::delete_by_id(budget_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::NotFound {
            entity: "Budget",
            id: budget_id,
        });
    }
    Ok(())
}

/// Computes how much of a budget has been used.
///
/// Only confirmed transactions counted in totals, dated inside the budget and
/// held in wallets of the budget's currency are considered. Transfers never count.
pub async fn budget_progress(db: &DatabaseConnection, budget_id: i64) -> Result<BudgetProgress> {
    let budget = get_budget_by_id(db, budget_id).await?.ok_or(Error::NotFound {
        entity: "Budget",
        id: budget_id,
    })?;
    let kind = BudgetKind::from_model(&budget)?;

    let wallet_currency: HashMap<i64, String> = Wallet::find()
        .all(db)
        .await?
        .into_iter()
        .map(|w| (w.id, w.currency))
        .collect();

    let categories = Category::find().all(db).await?;
    let tracked: HashSet<i64> = match kind {
        BudgetKind::Category(id) => categories
            .iter()
            .filter(|c| c.id == id || c.parent_id == Some(id))
            .map(|c| c.id)
            .collect(),
        BudgetKind::Expenses | BudgetKind::Incomes => categories
            .iter()
            .filter(|c| c.category_type != CategoryType::System.code())
            .map(|c| c.id)
            .collect(),
    };
    let wanted_direction = match kind {
        BudgetKind::Incomes => Some(Direction::Income),
        BudgetKind::Expenses => Some(Direction::Expense),
        BudgetKind::Category(_) => None,
    };

    let transactions = get_transactions_in_range(db, budget.start_date, budget.end_date, None).await?;
    let progress = transactions
        .iter()
        .filter(|t| t.confirmed && t.count_in_total && t.transfer_id.is_none())
        .filter(|t| tracked.contains(&t.category_id))
        .filter(|t| wallet_currency.get(&t.wallet_id) == Some(&budget.currency))
        .filter(|t| wanted_direction.is_none_or(|d| d.code() == t.direction))
        .fold(0i64, |acc, t| acc.saturating_add(t.amount));

    Ok(BudgetProgress { budget, progress })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::category::create_category;
    use crate::core::transaction::{NewTransaction, create_transaction};
    use crate::core::wallet::create_wallet;
    use crate::test_utils::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
    }

    #[tokio::test]
    async fn test_budget_validation() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_budget(&db, BudgetKind::Expenses, day(1), day(31), 0, "EUR").await;
        assert!(matches!(result, Err(Error::InvalidAmount { amount: 0 })));

        let result = create_budget(&db, BudgetKind::Expenses, day(31), day(1), 100, "EUR").await;
        assert!(matches!(result, Err(Error::InvalidInput { .. })));

        let result = create_budget(&db, BudgetKind::Category(404), day(1), day(31), 100, "EUR").await;
        assert!(matches!(result, Err(Error::CategoryNotFound { id: 404 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_expense_budget_progress() -> Result<()> {
        let db = setup_test_db().await?;
        let eur = create_wallet(&db, "Euro".to_string(), "EUR", 0, true).await?;
        let usd = create_wallet(&db, "Dollar".to_string(), "USD", 0, true).await?;
        let other = create_wallet(&db, "Other".to_string(), "EUR", 0, true).await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let salary = create_test_category(&db, "Salary", CategoryType::Income).await?;

        let spend = |wallet: i64, category: i64, amount: i64, d: u32| {
            NewTransaction::new(wallet, category, amount, "t", date_time(2026, 5, d))
        };
        create_transaction(&db, spend(eur.id, food.id, 4_000, 3)).await?;
        create_transaction(&db, spend(eur.id, food.id, 2_000, 31)).await?;
        create_transaction(&db, spend(eur.id, salary.id, 9_000, 10)).await?;
        create_transaction(&db, spend(usd.id, food.id, 1_000, 10)).await?;
        create_transaction(
            &db,
            NewTransaction::new(eur.id, food.id, 500, "t", date_time(2026, 6, 1)),
        )
        .await?;
        crate::core::transfer::create_transfer(
            &db,
            crate::core::transfer::NewTransfer::same_currency(eur.id, other.id, 800),
        )
        .await?;

        let budget = create_budget(&db, BudgetKind::Expenses, day(1), day(31), 5_000, "eur").await?;
        let progress = budget_progress(&db, budget.id).await?;
        assert_eq!(progress.progress, 6_000);
        assert_eq!(progress.remaining(), -1_000);
        assert!(progress.is_exceeded());
        assert_eq!(progress.percent(), 120.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_category_budget_includes_children() -> Result<()> {
        let db = setup_test_db().await?;
        let wallet = create_test_wallet(&db, "Cash").await?;
        let food = create_test_category(&db, "Food", CategoryType::Expense).await?;
        let groceries = create_category(
            &db,
            "Groceries".to_string(),
            CategoryType::Expense,
            Some(food.id),
            None,
        )
        .await?;
        assert!(groceries.is_child());
        let fun = create_test_category(&db, "Fun", CategoryType::Expense).await?;

        for (category, amount) in [(food.id, 100), (groceries.id, 250), (fun.id, 999)] {
            create_transaction(
                &db,
                NewTransaction::new(wallet.id, category, amount, "t", date_time(2026, 5, 2)),
            )
            .await?;
        }

        let budget =
            create_budget(&db, BudgetKind::Category(food.id), day(1), day(31), 1_000, "EUR").await?;
        let progress = budget_progress(&db, budget.id).await?;
        assert_eq!(progress.progress, 350);
        assert_eq!(progress.percent(), 35.0);
        assert!(!progress.is_exceeded());

        delete_budget(&db, budget.id).await?;
        assert!(get_all_budgets(&db).await?.is_empty());
        Ok(())
    }
}
