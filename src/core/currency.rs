//! Currency business logic - the table of currencies wallets can use.

use crate::{
    config::settings::CurrencyConfig,
    core::money::CurrencyUnit,
    entities::{Currency, Wallet, currency, wallet},
    errors::{DataErrorCode, Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

impl From<currency::Model> for CurrencyUnit {
    fn from(model: currency::Model) -> Self {
        Self {
            code: model.code,
            name: model.name,
            symbol: model.symbol,
            decimals: u32::try_from(model.decimals).unwrap_or(0),
        }
    }
}

/// Adds a currency. The code is normalised to upper case.
pub async fn create_currency(
    db: &DatabaseConnection,
    unit: &CurrencyUnit,
) -> Result<currency::Model> {
    let code = unit.code.trim().to_ascii_uppercase();
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::invalid_input(format!(
            "'{}' is not a three-letter currency code",
            unit.code
        )));
    }
    let decimals = i32::try_from(unit.decimals)
        .ok()
        .filter(|d| *d <= 8)
        .ok_or_else(|| Error::invalid_input("A currency has at most 8 decimals"))?;

    let model = currency::ActiveModel {
        code: Set(code),
        name: Set(unit.name.clone()),
        symbol: Set(unit.symbol.clone()),
        decimals: Set(decimals),
    };
    Ok(model.insert(db).await?)
}

/// Looks a currency up by code.
pub async fn get_currency<C>(db: &C, code: &str) -> Result<Option<currency::Model>>
where
    C: ConnectionTrait,
{
    Currency::find_by_id(code.to_ascii_uppercase())
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists every currency ordered by code.
pub async fn get_all_currencies(db: &DatabaseConnection) -> Result<Vec<currency::Model>> {
    Currency::find()
        .order_by_asc(currency::Column::Code)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Removes a currency no wallet uses.
pub async fn delete_currency(db: &DatabaseConnection, code: &str) -> Result<()> {
    let code = code.to_ascii_uppercase();
    let used = Wallet::find()
        .filter(wallet::Column::Currency.eq(code.as_str()))
        .count(db)
        .await?;
    if used > 0 {
        return Err(Error::data(DataErrorCode::CurrencyInUse));
    }

    let result = Currency::delete_by_id(code.clone()).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::CurrencyNotFound { code });
    }
    Ok(())
}

/// Inserts every configured currency that is not already present.
///
/// Returns the number of currencies created.
pub async fn seed_currencies(db: &DatabaseConnection, currencies: &[CurrencyConfig]) -> Result<usize> {
    let mut created = 0;
    for config in currencies {
        if get_currency(db, &config.code).await?.is_some() {
            continue;
        }
        let unit = CurrencyUnit::new(
            config.code.as_str(),
            config.name.as_str(),
            config.symbol.as_deref(),
            config.decimals,
        );
        create_currency(db, &unit).await?;
        created += 1;
    }

    if created > 0 {
        info!("Seeded {created} currencies");
    }
    Ok(created)
}
