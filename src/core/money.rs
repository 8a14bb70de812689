//! Money arithmetic over raw minor units.
//!
//! A [`Money`] value is a mapping from currency code to a signed amount in minor
//! units (cents for EUR, yen for JPY). Amounts in different currencies are never
//! mixed: there is no conversion, rounding or precision recovery here.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Describes a currency: its ISO code, display name, symbol and number of
/// decimal digits used by its minor unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyUnit {
    /// ISO 4217 code, e.g. `"EUR"`
    pub code: String,
    /// Display name, e.g. `"Euro"`
    pub name: String,
    /// Display symbol, e.g. `"€"`
    pub symbol: Option<String>,
    /// Number of decimal digits of the minor unit
    pub decimals: u32,
}

impl CurrencyUnit {
    /// Creates a currency unit description.
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        symbol: Option<&str>,
        decimals: u32,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            symbol: symbol.map(str::to_string),
            decimals,
        }
    }

    /// Renders a minor-unit amount with this currency's decimals and symbol.
    ///
    /// `1050` in a two-decimal currency becomes `"10.50 €"`; without a symbol the
    /// ISO code is used instead.
    #[must_use]
    pub fn format(&self, minor: i64) -> String {
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.unsigned_abs();
        let label = self.symbol.as_deref().unwrap_or(&self.code);
        if self.decimals == 0 {
            return format!("{sign}{abs} {label}");
        }
        let scale = 10u64.pow(self.decimals);
        let width = self.decimals as usize;
        format!(
            "{sign}{}.{:0width$} {label}",
            abs / scale,
            abs % scale,
        )
    }
}

/// A per-currency collection of signed minor-unit amounts.
///
/// Currency codes are non-empty, carry no surrounding whitespace and contain
/// neither `;` nor `:`, so the textual form always parses back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, i64>", into = "BTreeMap<String, i64>")]
pub struct Money {
    amounts: BTreeMap<String, i64>,
}

/// Checks that a currency code survives the textual form.
fn validate_code(currency: &str) -> Result<()> {
    let reason = if currency.is_empty() {
        "currency code is empty"
    } else if currency.trim() != currency {
        "currency code has surrounding whitespace"
    } else if currency.contains([';', ':']) {
        "currency code contains a separator"
    } else {
        return Ok(());
    };
    Err(Error::invalid_input(format!(
        "Invalid currency code '{currency}': {reason}"
    )))
}

impl Money {
    /// Creates an empty money value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a money value holding a single currency.
    pub fn of(currency: impl Into<String>, amount: i64) -> Result<Self> {
        let currency = currency.into();
        validate_code(&currency)?;
        let mut money = Self::new();
        money.amounts.insert(currency, amount);
        Ok(money)
    }

    /// Adds an amount to a currency. Wraps around at the `i64` bounds, so a
    /// later [`Money::subtract`] of the same amount undoes it exactly.
    pub fn add(&mut self, currency: &str, amount: i64) -> Result<()> {
        let entry = self.entry(currency)?;
        *entry = entry.wrapping_add(amount);
        Ok(())
    }

    /// Subtracts an amount from a currency. Wraps around at the `i64` bounds.
    pub fn subtract(&mut self, currency: &str, amount: i64) -> Result<()> {
        let entry = self.entry(currency)?;
        *entry = entry.wrapping_sub(amount);
        Ok(())
    }

    /// Adds an amount to a currency, failing instead of wrapping.
    pub fn try_add(&mut self, currency: &str, amount: i64) -> Result<()> {
        let sum = self
            .get(currency)
            .checked_add(amount)
            .ok_or_else(|| Error::MoneyOverflow {
                currency: currency.to_string(),
            })?;
        *self.entry(currency)? = sum;
        Ok(())
    }

    fn entry(&mut self, currency: &str) -> Result<&mut i64> {
        validate_code(currency)?;
        Ok(self.amounts.entry(currency.to_string()).or_insert(0))
    }

    /// Adds every currency of `other` into `self`.
    pub fn add_money(&mut self, other: &Self) {
        for (currency, amount) in &other.amounts {
            let entry = self.amounts.entry(currency.clone()).or_insert(0);
            *entry = entry.wrapping_add(*amount);
        }
    }

    /// Subtracts every currency of `other` from `self`.
    ///
    /// Currencies that drop to zero are kept, so `add_money` followed by
    /// `remove_money` leaves the mapping equal to where it started as long as
    /// `self` already held every currency of `other`. Both wrap at the `i64`
    /// bounds, which keeps that true for any amounts.
    pub fn remove_money(&mut self, other: &Self) {
        for (currency, amount) in &other.amounts {
            let entry = self.amounts.entry(currency.clone()).or_insert(0);
            *entry = entry.wrapping_sub(*amount);
        }
    }

    /// Amount held in a currency, zero if absent.
    #[must_use]
    pub fn get(&self, currency: &str) -> i64 {
        self.amounts.get(currency).copied().unwrap_or(0)
    }

    /// Currency codes present in this value, in sorted order.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.amounts.keys().map(String::as_str)
    }

    /// Iterates `(currency, amount)` pairs in currency order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.amounts.iter().map(|(c, a)| (c.as_str(), *a))
    }

    /// True when no currency is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    /// True when every currency holds zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amounts.values().all(|a| *a == 0)
    }

    /// Parses the textual form produced by [`fmt::Display`]: `CODE:amount`
    /// pairs separated by `;`.
    pub fn parse(input: &str) -> Result<Self> {
        let mut money = Self::new();
        if input.is_empty() {
            return Ok(money);
        }

        for pair in input.split(';') {
            let parse_err = |reason: &str| Error::MoneyParse {
                input: input.to_string(),
                reason: reason.to_string(),
            };

            let (currency, amount) = pair
                .split_once(':')
                .ok_or_else(|| parse_err("missing ':' separator"))?;
            if validate_code(currency).is_err() {
                return Err(parse_err("invalid currency code"));
            }
            let amount: i64 = amount
                .trim()
                .parse()
                .map_err(|_| parse_err("amount is not an integer"))?;
            if money.amounts.insert(currency.to_string(), amount).is_some() {
                return Err(parse_err("duplicate currency"));
            }
        }

        Ok(money)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (currency, amount) in &self.amounts {
            if !first {
                f.write_str(";")?;
            }
            write!(f, "{currency}:{amount}")?;
            first = false;
        }
        Ok(())
    }
}

impl TryFrom<BTreeMap<String, i64>> for Money {
    type Error = Error;

    fn try_from(amounts: BTreeMap<String, i64>) -> Result<Self> {
        for currency in amounts.keys() {
            validate_code(currency)?;
        }
        Ok(Self { amounts })
    }
}

impl From<Money> for BTreeMap<String, i64> {
    fn from(money: Money) -> Self {
        money.amounts
    }
}

impl FromStr for Money {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_add_then_remove_restores_amounts() {
        let mut wallet = Money::of("EUR", 1_000).unwrap();
        wallet.add("USD", -250).unwrap();
        let original = wallet.clone();

        let mut other = Money::of("EUR", 300).unwrap();
        other.add("USD", 75).unwrap();

        wallet.add_money(&other);
        assert_eq!(wallet.get("EUR"), 1_300);
        assert_eq!(wallet.get("USD"), -175);

        wallet.remove_money(&other);
        assert_eq!(wallet, original);
    }

    #[test]
    fn test_add_then_remove_restores_amounts_near_bounds() {
        let mut wallet = Money::of("EUR", i64::MAX - 5).unwrap();
        wallet.add("USD", i64::MIN + 3).unwrap();
        let original = wallet.clone();

        let mut other = Money::of("EUR", 10).unwrap();
        other.add("USD", -7).unwrap();

        wallet.add_money(&other);
        wallet.remove_money(&other);
        assert_eq!(wallet, original);
        assert_eq!(wallet.get("EUR"), i64::MAX - 5);

        let mut single = Money::of("EUR", i64::MAX).unwrap();
        single.add("EUR", 1).unwrap();
        single.subtract("EUR", 1).unwrap();
        assert_eq!(single.get("EUR"), i64::MAX);
    }

    #[test]
    fn test_remove_money_introduces_negative_currency() {
        let mut money = Money::of("EUR", 100).unwrap();
        money.remove_money(&Money::of("GBP", 40).unwrap());
        assert_eq!(money.get("GBP"), -40);
        assert_eq!(money.get("EUR"), 100);
    }

    #[test]
    fn test_display_and_parse() {
        let mut money = Money::of("USD", -200).unwrap();
        money.add("EUR", 1050).unwrap();
        let text = money.to_string();
        assert_eq!(text, "EUR:1050;USD:-200");
        assert_eq!(Money::parse(&text).unwrap(), money);
        assert_eq!(Money::parse("").unwrap(), Money::new());
        assert_eq!(Money::new().to_string(), "");
    }

    #[test]
    fn test_codes_that_cannot_round_trip_are_rejected() {
        for code in ["", " EUR", "EUR ", "EU;R", "EU:R"] {
            assert!(
                matches!(Money::of(code, 5), Err(Error::InvalidInput { .. })),
                "accepted {code:?}"
            );
            let mut money = Money::new();
            assert!(money.add(code, 5).is_err());
            assert!(money.subtract(code, 5).is_err());
            assert!(money.try_add(code, 5).is_err());
            assert!(money.is_empty());
        }

        // Anything that is accepted parses back to the same mapping
        for code in ["EUR", "x", "BTC-LN", "€"] {
            let money = Money::of(code, -42).unwrap();
            assert_eq!(Money::parse(&money.to_string()).unwrap(), money);
        }
    }

    #[test]
    fn test_deserialize_rejects_invalid_codes() {
        let money: Money = serde_json::from_str(r#"{"EUR":10}"#).unwrap();
        assert_eq!(money.get("EUR"), 10);
        assert_eq!(serde_json::to_string(&money).unwrap(), r#"{"EUR":10}"#);
        assert!(serde_json::from_str::<Money>(r#"{"EU:R":10}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in ["EUR=10", "EUR:ten", ":10", "EUR:1;EUR:2", " EUR:1", "EUR:1;"] {
            assert!(
                matches!(Money::parse(input), Err(Error::MoneyParse { .. })),
                "parsed {input:?}"
            );
        }
    }

    #[test]
    fn test_try_add_reports_overflow() {
        let mut money = Money::of("EUR", i64::MAX).unwrap();
        assert!(matches!(
            money.try_add("EUR", 1),
            Err(Error::MoneyOverflow { .. })
        ));
        assert_eq!(money.get("EUR"), i64::MAX);
        money.add("EUR", 1).unwrap();
        assert_eq!(money.get("EUR"), i64::MIN);
    }

    #[test]
    fn test_is_zero() {
        let mut money = Money::of("EUR", 10).unwrap();
        assert!(!money.is_zero());
        money.subtract("EUR", 10).unwrap();
        assert!(money.is_zero());
        assert!(!money.is_empty());
    }

    #[test]
    fn test_currency_format() {
        let euro = CurrencyUnit::new("EUR", "Euro", Some("€"), 2);
        assert_eq!(euro.format(1050), "10.50 €");
        assert_eq!(euro.format(-5), "-0.05 €");

        let yen = CurrencyUnit::new("JPY", "Yen", None, 0);
        assert_eq!(yen.format(1200), "1200 JPY");

        let dinar = CurrencyUnit::new("KWD", "Kuwaiti Dinar", None, 3);
        assert_eq!(dinar.format(12_345), "12.345 KWD");
    }
}
