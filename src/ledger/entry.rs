use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::period::{days_in_month, Period, MAX_YEAR, MIN_YEAR};
use crate::errors::{LedgerError, Result};

pub const MAX_CURRENCY_LEN: usize = 3;

/// One recorded movement of money against a named account.
///
/// Amounts are integer minor units (cents) as entered; the direction lives in
/// `is_inflow`. Equality is structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EntryFields", into = "EntryFields")]
pub struct Entry {
    year: i32,
    month: u32,
    day: u32,
    account_name: String,
    description: String,
    currency: String,
    amount: i64,
    is_inflow: bool,
}

/// Unvalidated field set, used as the serde shape of [`Entry`] and by collaborators
/// that collect fields one prompt at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub account_name: String,
    pub description: String,
    pub is_inflow: bool,
    pub currency: String,
    pub amount: i64,
}

impl Entry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        year: i32,
        month: u32,
        day: u32,
        account_name: impl Into<String>,
        description: impl Into<String>,
        currency: impl Into<String>,
        amount: i64,
        is_inflow: bool,
    ) -> Result<Self> {
        let currency = currency.into();
        validate_date(year, month, day)?;
        validate_currency(&currency)?;
        validate_amount(amount)?;
        Ok(Self {
            year,
            month,
            day,
            account_name: account_name.into(),
            description: description.into(),
            currency,
            amount,
            is_inflow,
        })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn is_inflow(&self) -> bool {
        self.is_inflow
    }

    pub fn period(&self) -> Period {
        Period {
            year: self.year,
            month: self.month,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// The amount as it counts toward totals: positive for inflows, negative for outflows.
    pub fn signed_amount(&self) -> i64 {
        if self.is_inflow {
            self.amount
        } else {
            -self.amount
        }
    }

    /// Moves the entry to a new date. Leaves the entry untouched when the date is invalid.
    pub fn set_date(&mut self, year: i32, month: u32, day: u32) -> Result<()> {
        validate_date(year, month, day)?;
        self.year = year;
        self.month = month;
        self.day = day;
        Ok(())
    }

    pub fn set_account_name(&mut self, account_name: impl Into<String>) {
        self.account_name = account_name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) -> Result<()> {
        let currency = currency.into();
        validate_currency(&currency)?;
        self.currency = currency;
        Ok(())
    }

    pub fn set_amount(&mut self, amount: i64) -> Result<()> {
        validate_amount(amount)?;
        self.amount = amount;
        Ok(())
    }

    pub fn set_inflow(&mut self, is_inflow: bool) {
        self.is_inflow = is_inflow;
    }
}

impl TryFrom<EntryFields> for Entry {
    type Error = LedgerError;

    fn try_from(fields: EntryFields) -> Result<Self> {
        Entry::new(
            fields.year,
            fields.month,
            fields.day,
            fields.account_name,
            fields.description,
            fields.currency,
            fields.amount,
            fields.is_inflow,
        )
    }
}

impl From<Entry> for EntryFields {
    fn from(entry: Entry) -> Self {
        Self {
            year: entry.year,
            month: entry.month,
            day: entry.day,
            account_name: entry.account_name,
            description: entry.description,
            is_inflow: entry.is_inflow,
            currency: entry.currency,
            amount: entry.amount,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let minor = self.amount.unsigned_abs();
        write!(
            f,
            "{:04}-{:02}-{:02} {} \"{}\" {}{}{}.{:02} ({})",
            self.year,
            self.month,
            self.day,
            self.account_name,
            self.description,
            sign,
            self.currency,
            minor / 100,
            minor % 100,
            if self.is_inflow { "in" } else { "out" }
        )
    }
}

/// Sums signed amounts, failing instead of wrapping on overflow.
pub fn signed_total<'a, I>(entries: I) -> Result<i64>
where
    I: IntoIterator<Item = &'a Entry>,
{
    entries.into_iter().try_fold(0i64, |acc, entry| {
        acc.checked_add(entry.signed_amount())
            .ok_or(LedgerError::AmountOverflow)
    })
}

fn validate_date(year: i32, month: u32, day: u32) -> Result<()> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(LedgerError::invalid("year", year));
    }
    if !(1..=12).contains(&month) {
        return Err(LedgerError::invalid("month", month));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(LedgerError::invalid(
            "day",
            format!("{day} (in {year:04}-{month:02})"),
        ));
    }
    Ok(())
}

fn validate_currency(currency: &str) -> Result<()> {
    if currency.chars().count() > MAX_CURRENCY_LEN {
        return Err(LedgerError::invalid("currency", currency));
    }
    Ok(())
}

// i64::MIN has no positive counterpart, so it cannot be flipped into a signed amount.
fn validate_amount(amount: i64) -> Result<()> {
    if amount == i64::MIN {
        return Err(LedgerError::invalid("amount", amount));
    }
    Ok(())
}
