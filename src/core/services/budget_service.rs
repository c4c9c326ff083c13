//! Account-level aggregation across a whole session.

use std::{collections::HashMap, ops::RangeInclusive};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::{
    errors::{LedgerError, Result},
    ledger::{signed_total, Account, Entry, EntryIndex, GoalOverrides, Period},
};

/// Account names partitioned by the kind of goal they track.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    pub savings: Vec<String>,
    pub spending: Vec<String>,
    pub unclassified: Vec<String>,
}

/// Unsigned inflow and outflow totals across accounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetFlows {
    pub inflows: i64,
    pub outflows: i64,
}

impl NetFlows {
    pub fn net(&self) -> Result<i64> {
        self.inflows
            .checked_sub(self.outflows)
            .ok_or(LedgerError::AmountOverflow)
    }
}

/// Budget figure summed by [`BudgetService::budget_total`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetField {
    Goal,
    Reached,
}

/// One account's signed amount within a timeframe and its share of the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakdownLine {
    pub name: String,
    pub amount: i64,
    pub share: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub total: i64,
    pub lines: Vec<BreakdownLine>,
}

/// Calendar days of a timeframe split around a given day. The day itself
/// counts as elapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pace {
    pub total_days: u32,
    pub elapsed_days: u32,
    pub remaining_days: u32,
}

impl Pace {
    /// Elapsed fraction of the timeframe, rounded to two places; `None` for an
    /// empty timeframe.
    pub fn elapsed_share(&self) -> Option<Decimal> {
        Decimal::from(self.elapsed_days)
            .checked_div(Decimal::from(self.total_days))
            .map(|value| value.round_dp(2))
    }
}

/// Stateless helpers that build and reconcile accounts.
pub struct BudgetService;

impl BudgetService {
    /// Groups every entry of `indexes` by account name and builds one account per
    /// name, in first-seen order, with default goals.
    pub fn accounts_from_index<'a, I>(indexes: I) -> Result<Vec<Account>>
    where
        I: IntoIterator<Item = &'a EntryIndex>,
    {
        let mut order: Vec<(String, Vec<Entry>)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for entry in indexes.into_iter().flat_map(|index| index.iter()) {
            let slot = *positions
                .entry(entry.account_name().to_string())
                .or_insert_with(|| {
                    order.push((entry.account_name().to_string(), Vec::new()));
                    order.len() - 1
                });
            order[slot].1.push(entry.clone());
        }
        order
            .into_iter()
            .map(|(name, entries)| Account::new(name, None, entries, GoalOverrides::new()))
            .collect()
    }

    /// Merges accounts sharing a name. The first account of each name receives
    /// the others; output keeps first-seen order.
    pub fn merge_by_name(accounts: Vec<Account>) -> Result<Vec<Account>> {
        let mut groups: Vec<Vec<Account>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for account in accounts {
            match positions.get(account.name()) {
                Some(slot) => groups[*slot].push(account),
                None => {
                    positions.insert(account.name().to_string(), groups.len());
                    groups.push(vec![account]);
                }
            }
        }

        groups
            .into_iter()
            .map(|mut group| {
                if group.len() == 1 {
                    return Ok(group.remove(0));
                }
                let receiver = group.remove(0);
                receiver.merge(&group)
            })
            .collect()
    }

    /// Folds freshly derived accounts into a previously saved set.
    ///
    /// A fresh account adopts the saved account's kind, is merged into it, and
    /// inherits the goals already saved for shared periods. Saved accounts with
    /// no fresh counterpart are kept as they were; new names are appended.
    pub fn reconcile(fresh: Vec<Account>, saved: Vec<Account>) -> Result<Vec<Account>> {
        let mut saved = Self::merge_by_name(saved)?;
        let positions: HashMap<String, usize> = saved
            .iter()
            .enumerate()
            .map(|(idx, account)| (account.name().to_string(), idx))
            .collect();

        let mut added = Vec::new();
        for mut account in Self::merge_by_name(fresh)? {
            match positions.get(account.name()) {
                Some(&idx) => {
                    let previous = &saved[idx];
                    account.set_saving(previous.is_saving());
                    let mut merged = previous.merge(std::slice::from_ref(&account))?;
                    merged.inherit_goals(previous)?;
                    saved[idx] = merged;
                }
                None => added.push(account),
            }
        }
        tracing::info!(
            saved = saved.len(),
            added = added.len(),
            "reconciled accounts"
        );
        saved.extend(added);
        Ok(saved)
    }

    /// Partitions account names by kind, computed fresh from `accounts`.
    pub fn classify(accounts: &[Account]) -> Classification {
        let mut classification = Classification::default();
        for account in accounts {
            let bucket = match account.is_saving() {
                Some(true) => &mut classification.savings,
                Some(false) => &mut classification.spending,
                None => &mut classification.unclassified,
            };
            if !bucket.iter().any(|name| name == account.name()) {
                bucket.push(account.name().to_string());
            }
        }
        classification
    }

    pub fn net_flows(accounts: &[Account]) -> Result<NetFlows> {
        let mut flows = NetFlows::default();
        for entry in accounts.iter().flat_map(|account| account.entries()) {
            let bucket = if entry.is_inflow() {
                &mut flows.inflows
            } else {
                &mut flows.outflows
            };
            *bucket = bucket
                .checked_add(entry.amount())
                .ok_or(LedgerError::AmountOverflow)?;
        }
        Ok(flows)
    }

    /// Sums one budget figure over the periods of `account` inside `range`.
    /// Periods without that figure contribute nothing.
    pub fn budget_total(
        account: &Account,
        field: BudgetField,
        range: &RangeInclusive<Period>,
    ) -> Result<i64> {
        account
            .periods()
            .filter(|(period, _)| range.contains(period))
            .filter_map(|(_, budget)| match field {
                BudgetField::Goal => budget.goal(),
                BudgetField::Reached => budget.reached(),
            })
            .try_fold(0i64, |acc, value| {
                acc.checked_add(value).ok_or(LedgerError::AmountOverflow)
            })
    }

    /// Per-account signed amounts inside `range` for accounts of one kind,
    /// sorted by name, with each account's share of their total.
    ///
    /// A zero total has no shares and fails with `UndefinedPercentage` for
    /// the first period of `range`.
    pub fn breakdown(
        accounts: &[Account],
        is_saving: Option<bool>,
        range: &RangeInclusive<Period>,
    ) -> Result<Breakdown> {
        let mut amounts = Vec::new();
        for account in accounts.iter().filter(|account| account.is_saving() == is_saving) {
            let amount = signed_total(
                account
                    .periods()
                    .filter(|(period, _)| range.contains(period))
                    .flat_map(|(_, budget)| budget.entries()),
            )?;
            amounts.push((account.name().to_string(), amount));
        }
        amounts.sort_by(|a, b| a.0.cmp(&b.0));

        let total = amounts.iter().try_fold(0i64, |acc, (_, amount)| {
            acc.checked_add(*amount).ok_or(LedgerError::AmountOverflow)
        })?;
        if total == 0 {
            let start = range.start();
            return Err(LedgerError::UndefinedPercentage {
                year: start.year,
                month: start.month,
            });
        }
        let share_total = Decimal::from(total);
        let lines = amounts
            .into_iter()
            .map(|(name, amount)| {
                let share = Decimal::from(amount)
                    .checked_div(share_total)
                    .ok_or(LedgerError::AmountOverflow)?;
                Ok(BreakdownLine {
                    name,
                    amount,
                    share: share.round_dp(2),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Breakdown { total, lines })
    }

    /// Splits the days of `range` into those up to and including `today` and
    /// those after it.
    pub fn pace(range: &RangeInclusive<Period>, today: NaiveDate) -> Pace {
        let current = Period::containing(today);
        let mut pace = Pace::default();
        let mut cursor = Some(*range.start());
        while let Some(period) = cursor.filter(|period| period <= range.end()) {
            let days = period.days();
            let elapsed = match period.cmp(&current) {
                std::cmp::Ordering::Less => days,
                std::cmp::Ordering::Equal => today.day(),
                std::cmp::Ordering::Greater => 0,
            };
            pace.total_days = pace.total_days.saturating_add(days);
            pace.elapsed_days = pace.elapsed_days.saturating_add(elapsed);
            cursor = period.next();
        }
        pace.remaining_days = pace.total_days.saturating_sub(pace.elapsed_days);
        pace
    }

    pub fn days_remaining(range: &RangeInclusive<Period>, today: NaiveDate) -> u32 {
        Self::pace(range, today).remaining_days
    }

    /// Amount per remaining day that closes the gap between the summed goal
    /// and reached figures of `account` over `range`. `None` once no days
    /// remain.
    pub fn daily_target(
        account: &Account,
        range: &RangeInclusive<Period>,
        today: NaiveDate,
    ) -> Result<Option<Decimal>> {
        let goal = Self::budget_total(account, BudgetField::Goal, range)?;
        let reached = Self::budget_total(account, BudgetField::Reached, range)?;
        let gap = goal
            .checked_sub(reached)
            .ok_or(LedgerError::AmountOverflow)?;
        let remaining = Self::days_remaining(range, today);
        Ok(Decimal::from(gap)
            .checked_div(Decimal::from(remaining))
            .map(|value| value.round_dp(2)))
    }
}
