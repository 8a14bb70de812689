//! Category business logic - category types, directions and the system tag table.
//!
//! User categories are either income or expense and may have one level of
//! sub-categories. System categories are seeded by the application, carry a
//! [`SystemTag`] and cannot be modified or deleted.

use crate::{
    config::settings::CategoryConfig,
    entities::{
        Budget, Category, RecurrentTransaction, Transaction, budget, category,
        recurrent_transaction, transaction,
    },
    errors::{DataErrorCode, Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::{debug, info};

/// Kind of category, stored as an integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoryType {
    /// Money coming in
    Income,
    /// Money going out
    Expense,
    /// Application-managed category identified by a tag
    System,
}

impl CategoryType {
    /// Integer code stored in the database.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Income => 0,
            Self::Expense => 1,
            Self::System => 2,
        }
    }

    /// Decodes a stored integer code.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Income),
            1 => Ok(Self::Expense),
            2 => Ok(Self::System),
            other => Err(Error::invalid_input(format!(
                "unknown category type {other}"
            ))),
        }
    }
}

/// Which way money moves, stored as `1` for income and `0` for expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Money leaves the wallet
    Expense,
    /// Money enters the wallet
    Income,
}

impl Direction {
    /// Integer code stored in the database.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Expense => 0,
            Self::Income => 1,
        }
    }

    /// Decodes a stored integer code; anything other than `1` is an expense.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        if code == 1 { Self::Income } else { Self::Expense }
    }

    /// Applies the direction's sign to an unsigned amount.
    #[must_use]
    pub const fn signed(self, amount: i64) -> i64 {
        match self {
            Self::Income => amount,
            Self::Expense => -amount,
        }
    }
}

/// Tags identifying the application's system categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemTag {
    /// Both legs of a wallet-to-wallet transfer
    Transfer,
    /// Fee charged on a transfer
    TransferTax,
    /// Money borrowed: I owe it back
    Debt,
    /// Money lent: I am owed it
    Credit,
    /// Repayment of a debt
    PaidDebt,
    /// Collection of a credit
    PaidCredit,
    /// Generic tax or fee
    Tax,
    /// Money put into a saving
    SavingDeposit,
    /// Money taken out of a saving
    SavingWithdraw,
}

impl SystemTag {
    /// Every system tag, in seeding order.
    pub const ALL: [Self; 9] = [
        Self::Transfer,
        Self::TransferTax,
        Self::Debt,
        Self::Credit,
        Self::PaidDebt,
        Self::PaidCredit,
        Self::Tax,
        Self::SavingDeposit,
        Self::SavingWithdraw,
    ];

    /// Tag string stored on the category row.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transfer => "transfer",
            Self::TransferTax => "transfer_tax",
            Self::Debt => "debt",
            Self::Credit => "credit",
            Self::PaidDebt => "paid_debt",
            Self::PaidCredit => "paid_credit",
            Self::Tax => "tax",
            Self::SavingDeposit => "saving_deposit",
            Self::SavingWithdraw => "saving_withdraw",
        }
    }

    /// Looks a tag up by its stored string.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }

    /// Fixed direction of money for this tag. Transfers have none: each leg
    /// carries its own.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Transfer => None,
            Self::Debt | Self::PaidCredit | Self::SavingWithdraw => Some(Direction::Income),
            Self::TransferTax
            | Self::Credit
            | Self::PaidDebt
            | Self::Tax
            | Self::SavingDeposit => Some(Direction::Expense),
        }
    }

    const fn display_name(self) -> &'static str {
        match self {
            Self::Transfer => "Transfer",
            Self::TransferTax => "Transfer fee",
            Self::Debt => "Debt",
            Self::Credit => "Credit",
            Self::PaidDebt => "Paid debt",
            Self::PaidCredit => "Paid credit",
            Self::Tax => "Tax",
            Self::SavingDeposit => "Saving deposit",
            Self::SavingWithdraw => "Saving withdrawal",
        }
    }
}

impl category::Model {
    /// Decoded category type.
    pub fn kind(&self) -> Result<CategoryType> {
        CategoryType::from_code(self.category_type)
    }

    /// Whether this category is a sub-category.
    #[must_use]
    pub const fn is_child(&self) -> bool {
        self.parent_id.is_some()
    }

    /// System tag, if this is a system category with a known tag.
    #[must_use]
    pub fn system_tag(&self) -> Option<SystemTag> {
        if self.category_type == CategoryType::System.code() {
            self.tag.as_deref().and_then(SystemTag::from_tag)
        } else {
            None
        }
    }

    /// Direction of money for transactions in this category: income for income
    /// categories, expense for expense categories, and the tag's direction for
    /// system categories (`None` for transfers and unknown tags).
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        match CategoryType::from_code(self.category_type).ok()? {
            CategoryType::Income => Some(Direction::Income),
            CategoryType::Expense => Some(Direction::Expense),
            CategoryType::System => self.system_tag().and_then(SystemTag::direction),
        }
    }
}

/// Creates a user category, optionally nested under a parent.
///
/// The parent must be a top-level category of the same type. System categories
/// cannot be created through this function.
pub async fn create_category(
    db: &DatabaseConnection,
    name: String,
    category_type: CategoryType,
    parent_id: Option<i64>,
    icon: Option<String>,
) -> Result<category::Model> {
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Category name cannot be empty"));
    }
    if category_type == CategoryType::System {
        return Err(Error::data(DataErrorCode::SystemCategoryNotModifiable));
    }

    if let Some(parent_id) = parent_id {
        let parent = get_category_by_id(db, parent_id)
            .await?
            .ok_or(Error::CategoryNotFound { id: parent_id })?;
        if parent.parent_id.is_some() || parent.category_type != category_type.code() {
            return Err(Error::data(DataErrorCode::InvalidParentCategory));
        }
    }

    let category = category::ActiveModel {
        name: Set(name.trim().to_string()),
        icon: Set(icon),
        category_type: Set(category_type.code()),
        parent_id: Set(parent_id),
        tag: Set(None),
        show_report: Set(true),
        sort_index: Set(0),
        ..Default::default()
    };

    Ok(category.insert(db).await?)
}

/// Finds a category by ID.
pub async fn get_category_by_id<C>(db: &C, category_id: i64) -> Result<Option<category::Model>>
where
    C: ConnectionTrait,
{
    Category::find_by_id(category_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds the system category carrying `tag`.
pub async fn get_system_category<C>(db: &C, tag: SystemTag) -> Result<category::Model>
where
    C: ConnectionTrait,
{
    Category::find()
        .filter(category::Column::CategoryType.eq(CategoryType::System.code()))
        .filter(category::Column::Tag.eq(tag.as_str()))
        .one(db)
        .await?
        .ok_or_else(|| Error::Config {
            message: format!("System category '{}' has not been seeded", tag.as_str()),
        })
}

/// Lists categories of one type, ordered by sort index then name.
pub async fn get_categories_by_type(
    db: &DatabaseConnection,
    category_type: CategoryType,
) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::CategoryType.eq(category_type.code()))
        .order_by_asc(category::Column::SortIndex)
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists the direct children of a category.
pub async fn get_children(db: &DatabaseConnection, parent_id: i64) -> Result<Vec<category::Model>> {
    Category::find()
        .filter(category::Column::ParentId.eq(parent_id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Renames a user category or changes its icon.
pub async fn update_category(
    db: &DatabaseConnection,
    category_id: i64,
    name: String,
    icon: Option<String>,
) -> Result<category::Model> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;
    if existing.category_type == CategoryType::System.code() {
        return Err(Error::data(DataErrorCode::SystemCategoryNotModifiable));
    }
    if name.trim().is_empty() {
        return Err(Error::invalid_input("Category name cannot be empty"));
    }

    let mut active: category::ActiveModel = existing.into();
    active.name = Set(name.trim().to_string());
    active.icon = Set(icon);
    Ok(active.update(db).await?)
}

/// Deletes a user category that has no children and no transactions.
pub async fn delete_category(db: &DatabaseConnection, category_id: i64) -> Result<()> {
    let existing = get_category_by_id(db, category_id)
        .await?
        .ok_or(Error::CategoryNotFound { id: category_id })?;
    if existing.category_type == CategoryType::System.code() {
        return Err(Error::data(DataErrorCode::SystemCategoryNotModifiable));
    }

    let children = Category::find()
        .filter(category::Column::ParentId.eq(category_id))
        .count(db)
        .await?;
    if children > 0 {
        return Err(Error::data(DataErrorCode::CategoryHasChildren));
    }

    let used = Transaction::find()
        .filter(transaction::Column::CategoryId.eq(category_id))
        .count(db)
        .await?
        + RecurrentTransaction::find()
            .filter(recurrent_transaction::Column::CategoryId.eq(category_id))
            .count(db)
            .await?
        + Budget::find()
            .filter(budget::Column::CategoryId.eq(category_id))
            .count(db)
            .await?;
    if used > 0 {
        return Err(Error::data(DataErrorCode::CategoryInUse));
    }

    Category::delete_by_id(category_id).exec(db).await?;
    debug!("Deleted category {category_id}");
    Ok(())
}

/// Creates any missing system category. Safe to run at every startup.
///
/// Returns the number of categories created.
pub async fn ensure_system_categories(db: &DatabaseConnection) -> Result<usize> {
    let mut created = 0;
    for tag in SystemTag::ALL {
        let exists = Category::find()
            .filter(category::Column::CategoryType.eq(CategoryType::System.code()))
            .filter(category::Column::Tag.eq(tag.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }

        category::ActiveModel {
            name: Set(tag.display_name().to_string()),
            icon: Set(None),
            category_type: Set(CategoryType::System.code()),
            parent_id: Set(None),
            tag: Set(Some(tag.as_str().to_string())),
            show_report: Set(false),
            sort_index: Set(0),
            ..Default::default()
        }
        .insert(db)
        .await?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {created} system categories");
    }
    Ok(created)
}

async fn find_user_category(
    db: &DatabaseConnection,
    name: &str,
    category_type: CategoryType,
    parent_id: Option<i64>,
) -> Result<Option<category::Model>> {
    let mut query = Category::find()
        .filter(category::Column::Name.eq(name))
        .filter(category::Column::CategoryType.eq(category_type.code()));
    query = match parent_id {
        Some(id) => query.filter(category::Column::ParentId.eq(id)),
        None => query.filter(category::Column::ParentId.is_null()),
    };
    query.one(db).await.map_err(Into::into)
}

/// Creates the configured user categories that do not exist yet, matching
/// existing ones by name, type and parent.
///
/// Returns the number of categories created.
pub async fn seed_categories(db: &DatabaseConnection, seeds: &[CategoryConfig]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        let category_type = match seed.kind.to_ascii_lowercase().as_str() {
            "income" => CategoryType::Income,
            "expense" => CategoryType::Expense,
            other => {
                return Err(Error::Config {
                    message: format!("Category '{}' has unknown kind '{other}'", seed.name),
                });
            }
        };

        let parent = match find_user_category(db, &seed.name, category_type, None).await? {
            Some(existing) => existing,
            None => {
                created += 1;
                create_category(db, seed.name.clone(), category_type, None, None).await?
            }
        };
        for child in &seed.children {
            if find_user_category(db, child, category_type, Some(parent.id))
                .await?
                .is_none()
            {
                create_category(db, child.clone(), category_type, Some(parent.id), None).await?;
                created += 1;
            }
        }
    }

    if created > 0 {
        info!("Seeded {created} categories from configuration");
    }
    Ok(created)
}
