//! Session-scoped grouping of entries by calendar month.

use std::collections::BTreeMap;

use super::{
    entry::{signed_total, Entry},
    period::Period,
};
use crate::errors::{LedgerError, Result};

/// Account name that selects every entry in [`EntryIndex::account_total`].
pub const ALL_ACCOUNTS: &str = "ALL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSelector {
    All,
    Named(String),
}

impl AccountSelector {
    pub fn matches(&self, account_name: &str) -> bool {
        match self {
            AccountSelector::All => true,
            AccountSelector::Named(name) => name == account_name,
        }
    }
}

impl From<&str> for AccountSelector {
    fn from(name: &str) -> Self {
        if name == ALL_ACCOUNTS {
            AccountSelector::All
        } else {
            AccountSelector::Named(name.to_string())
        }
    }
}

/// Entries filed under the period of their own date.
///
/// Empty periods are never kept. `total` caches the last value computed by
/// [`EntryIndex::total_amount`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryIndex {
    by_period: BTreeMap<Period, Vec<Entry>>,
    total: i64,
}

impl EntryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_parts(by_period: BTreeMap<Period, Vec<Entry>>, total: i64) -> Self {
        let mut index = Self { by_period, total };
        index.compact();
        index
    }

    /// Files `entry` under its period unless an equal entry is already there.
    /// Returns whether the entry was added.
    pub fn insert(&mut self, entry: Entry) -> bool {
        let bucket = self.by_period.entry(entry.period()).or_default();
        if bucket.contains(&entry) {
            return false;
        }
        bucket.push(entry);
        true
    }

    pub fn insert_all<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = Entry>,
    {
        let mut added = 0;
        for entry in entries {
            if self.insert(entry) {
                added += 1;
            }
        }
        added
    }

    /// Deletes one entry equal to `entry` from its period.
    pub fn remove(&mut self, entry: &Entry) -> Result<Entry> {
        let period = entry.period();
        let bucket = self
            .by_period
            .get_mut(&period)
            .ok_or_else(|| LedgerError::EntryNotFound(entry.to_string()))?;
        let position = bucket
            .iter()
            .position(|candidate| candidate == entry)
            .ok_or_else(|| LedgerError::EntryNotFound(entry.to_string()))?;
        let removed = bucket.remove(position);
        if bucket.is_empty() {
            self.by_period.remove(&period);
        }
        Ok(removed)
    }

    /// Last total computed by [`EntryIndex::total_amount`].
    pub fn total(&self) -> i64 {
        self.total
    }

    /// Recomputes the signed sum of every entry and caches it.
    pub fn total_amount(&mut self) -> Result<i64> {
        self.total = signed_total(self.iter())?;
        Ok(self.total)
    }

    pub fn account_total(&self, selector: impl Into<AccountSelector>) -> Result<i64> {
        let selector = selector.into();
        signed_total(
            self.iter()
                .filter(|entry| selector.matches(entry.account_name())),
        )
    }

    pub fn period_total(&self, year: i32, month: u32) -> Result<i64> {
        let entries = self
            .by_period
            .get(&Period { year, month })
            .ok_or(LedgerError::PeriodNotFound { year, month })?;
        signed_total(entries)
    }

    /// Keeps only entries whose direction matches `keep_inflow`; the rest are
    /// removed and returned grouped by period.
    pub fn filter_by_direction(&mut self, keep_inflow: bool) -> EntryIndex {
        let mut removed = EntryIndex::new();
        for (period, bucket) in self.by_period.iter_mut() {
            let (kept, moved): (Vec<Entry>, Vec<Entry>) = bucket
                .drain(..)
                .partition(|entry| entry.is_inflow() == keep_inflow);
            *bucket = kept;
            if !moved.is_empty() {
                removed.by_period.entry(*period).or_default().extend(moved);
            }
        }
        self.compact();
        if !removed.is_empty() {
            tracing::debug!(
                moved = removed.len(),
                keep_inflow,
                "filtered entries by direction"
            );
        }
        removed
    }

    /// Re-files entries whose date was edited into another month.
    ///
    /// Relocated entries are moved under their new period here; the returned
    /// index holds copies of them for reporting. A relocated entry equal to
    /// one already filed under its new period is folded into it and left out
    /// of the returned index.
    pub fn resort_by_date(&mut self) -> EntryIndex {
        let mut misfiled = Vec::new();
        for (period, bucket) in self.by_period.iter_mut() {
            let (kept, moved): (Vec<Entry>, Vec<Entry>) = bucket
                .drain(..)
                .partition(|entry| entry.period() == *period);
            *bucket = kept;
            misfiled.extend(moved);
        }
        self.compact();

        let misfiled_count = misfiled.len();
        let mut relocated = EntryIndex::new();
        for entry in misfiled {
            if self.insert(entry.clone()) {
                relocated.insert(entry);
            }
        }
        if misfiled_count > 0 {
            tracing::debug!(
                relocated = relocated.len(),
                collapsed = misfiled_count - relocated.len(),
                "re-filed entries by date"
            );
        }
        relocated
    }

    /// Appends every period of `other`. Equal entries are not collapsed.
    pub fn merge_from(&mut self, other: EntryIndex) {
        for (period, entries) in other.by_period {
            if entries.is_empty() {
                continue;
            }
            self.by_period.entry(period).or_default().extend(entries);
        }
    }

    pub fn entries_in(&self, period: impl Into<Period>) -> Option<&[Entry]> {
        self.by_period.get(&period.into()).map(Vec::as_slice)
    }

    /// In-place access for edit collaborators. Call [`EntryIndex::resort_by_date`]
    /// after changing a date.
    pub fn period_entries_mut(&mut self, period: impl Into<Period>) -> Option<&mut [Entry]> {
        self.by_period
            .get_mut(&period.into())
            .map(Vec::as_mut_slice)
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> + '_ {
        self.by_period.keys().copied()
    }

    pub fn first_period(&self) -> Option<Period> {
        self.by_period.keys().next().copied()
    }

    pub fn last_period(&self) -> Option<Period> {
        self.by_period.keys().next_back().copied()
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.periods().map(|period| period.year).collect();
        years.dedup();
        years
    }

    pub fn months_in(&self, year: i32) -> Vec<u32> {
        self.periods()
            .filter(|period| period.year == year)
            .map(|period| period.month)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.by_period.values().flatten()
    }

    pub fn iter_periods(&self) -> impl Iterator<Item = (Period, &[Entry])> {
        self.by_period
            .iter()
            .map(|(period, entries)| (*period, entries.as_slice()))
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.by_period
            .get(&entry.period())
            .is_some_and(|bucket| bucket.contains(entry))
    }

    pub fn len(&self) -> usize {
        self.by_period.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_period.is_empty()
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.by_period.into_values().flatten().collect()
    }

    fn compact(&mut self) {
        self.by_period.retain(|_, bucket| !bucket.is_empty());
    }
}

impl FromIterator<Entry> for EntryIndex {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        let mut index = EntryIndex::new();
        index.insert_all(iter);
        index
    }
}
