use std::collections::BTreeMap;

use rust_decimal::Decimal;

use super::{
    budget::BudgetPeriod,
    entry::{signed_total, Entry},
    period::Period,
};
use crate::errors::{LedgerError, Result};

/// Goals a user already set, keyed by period. `None` keeps the period unset.
pub type GoalOverrides = BTreeMap<Period, Option<i64>>;

/// A named bookkeeping unit holding a budget per month.
///
/// Every entry carries the account's name and sits in the period of its own
/// date; periods without entries are dropped as soon as they empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    name: String,
    is_saving: Option<bool>,
    periods: BTreeMap<Period, BudgetPeriod>,
}

impl Account {
    /// Builds an account from raw entries.
    ///
    /// Periods named in `goals` keep that goal; any other period gets the
    /// default goal of exactly what was moved (`goal = reached`).
    pub fn new(
        name: impl Into<String>,
        is_saving: Option<bool>,
        entries: Vec<Entry>,
        goals: GoalOverrides,
    ) -> Result<Self> {
        let name = name.into();
        let mut grouped: BTreeMap<Period, Vec<Entry>> = BTreeMap::new();
        for entry in entries {
            ensure_owner(&name, &entry)?;
            grouped.entry(entry.period()).or_default().push(entry);
        }

        let mut periods = BTreeMap::new();
        for (period, entries) in grouped {
            let goal = match goals.get(&period) {
                Some(goal) => *goal,
                None => Some(signed_total(&entries)?),
            };
            let mut budget = BudgetPeriod::new(entries, goal);
            budget.recalculate()?;
            periods.insert(period, budget);
        }

        tracing::debug!(account = %name, periods = periods.len(), "built account");
        Ok(Self {
            name,
            is_saving,
            periods,
        })
    }

    /// Reassembles an account from stored periods without recalculating them.
    pub(crate) fn from_parts(
        name: String,
        is_saving: Option<bool>,
        periods: BTreeMap<Period, BudgetPeriod>,
    ) -> Result<Self> {
        for (period, budget) in &periods {
            for entry in budget.entries() {
                ensure_owner(&name, entry)?;
                if entry.period() != *period {
                    return Err(LedgerError::invalid(
                        "period",
                        format!("entry dated {} filed under {}", entry.period(), period),
                    ));
                }
            }
        }
        let mut account = Self {
            name,
            is_saving,
            periods,
        };
        account.remove_empty_periods();
        Ok(account)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_saving(&self) -> Option<bool> {
        self.is_saving
    }

    pub fn set_saving(&mut self, is_saving: Option<bool>) {
        self.is_saving = is_saving;
    }

    pub fn period(&self, period: impl Into<Period>) -> Option<&BudgetPeriod> {
        self.periods.get(&period.into())
    }

    pub fn periods(&self) -> impl Iterator<Item = (Period, &BudgetPeriod)> {
        self.periods.iter().map(|(period, budget)| (*period, budget))
    }

    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.periods.keys().map(|period| period.year).collect();
        years.dedup();
        years
    }

    /// Every entry, oldest period first, in insertion order within a period.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.periods.values().flat_map(|budget| budget.entries())
    }

    pub fn entry_count(&self) -> usize {
        self.periods.values().map(BudgetPeriod::entry_count).sum()
    }

    pub fn contains(&self, entry: &Entry) -> bool {
        self.periods
            .get(&entry.period())
            .is_some_and(|budget| budget.entries().contains(entry))
    }

    /// Appends `entry` and recalculates its period from scratch.
    pub fn add_entry(&mut self, entry: Entry) -> Result<()> {
        ensure_owner(&self.name, &entry)?;
        let period = entry.period();
        let mut budget = match self.periods.get(&period) {
            Some(existing) => existing.clone(),
            None => BudgetPeriod::new(Vec::new(), None),
        };
        let is_new = budget.is_empty();
        budget.entries_mut().push(entry);
        if is_new {
            let goal = signed_total(budget.entries())?;
            budget.set_goal(Some(goal));
        }
        budget.recalculate()?;
        self.periods.insert(period, budget);
        tracing::debug!(account = %self.name, %period, "added entry");
        Ok(())
    }

    /// Removes one entry equal to `entry` and recalculates its period from scratch.
    pub fn remove_entry(&mut self, entry: &Entry) -> Result<Entry> {
        let period = entry.period();
        let not_found = || LedgerError::EntryNotFound(entry.to_string());
        let existing = self.periods.get(&period).ok_or_else(not_found)?;
        let position = existing
            .entries()
            .iter()
            .position(|candidate| candidate == entry)
            .ok_or_else(not_found)?;

        let mut budget = existing.clone();
        let removed = budget.entries_mut().remove(position);
        if budget.is_empty() {
            self.periods.remove(&period);
        } else {
            budget.recalculate()?;
            self.periods.insert(period, budget);
        }
        tracing::debug!(account = %self.name, %period, "removed entry");
        Ok(removed)
    }

    /// Sets the goal for a period that has entries. The period stays `Goaled`
    /// until the next recalculation.
    pub fn set_goal(&mut self, year: i32, month: u32, goal: i64) -> Result<()> {
        self.period_mut(year, month)?.set_goal(Some(goal));
        Ok(())
    }

    pub fn clear_goal(&mut self, year: i32, month: u32) -> Result<()> {
        self.period_mut(year, month)?.set_goal(None);
        Ok(())
    }

    /// Recalculates every period and returns those whose percentages are
    /// undefined because their goal is zero.
    pub fn recalc_all(&mut self) -> Result<Vec<Period>> {
        let mut refreshed = self.periods.clone();
        for budget in refreshed.values_mut() {
            budget.recalculate()?;
        }
        self.periods = refreshed;
        let undefined: Vec<Period> = self
            .periods
            .iter()
            .filter(|(_, budget)| budget.goal() == Some(0))
            .map(|(period, _)| *period)
            .collect();
        if !undefined.is_empty() {
            tracing::debug!(account = %self.name, count = undefined.len(), "zero goals found");
        }
        Ok(undefined)
    }

    pub fn sum_remain(&self, year: i32, month: u32) -> Result<i64> {
        let period = Period { year, month };
        self.period_ref(period)?.sum_remain(period)
    }

    pub fn percent_reached(&self, year: i32, month: u32) -> Result<Decimal> {
        let period = Period { year, month };
        self.period_ref(period)?.percent_reached_checked(period)
    }

    pub fn percent_remain(&self, year: i32, month: u32) -> Result<Decimal> {
        let period = Period { year, month };
        self.period_ref(period)?.percent_remain_checked(period)
    }

    /// Drops periods without entries, returning them.
    pub fn remove_empty_periods(&mut self) -> Vec<Period> {
        let empty: Vec<Period> = self
            .periods
            .iter()
            .filter(|(_, budget)| budget.is_empty())
            .map(|(period, _)| *period)
            .collect();
        for period in &empty {
            self.periods.remove(period);
        }
        empty
    }

    /// Combines this account with others of the same identity.
    ///
    /// The result holds this account's entries followed by every entry of
    /// `others` not already present, with freshly derived periods. Goals are
    /// not carried over.
    pub fn merge(&self, others: &[Account]) -> Result<Account> {
        for other in others {
            if other.name != self.name || other.is_saving != self.is_saving {
                return Err(LedgerError::MergeMismatch {
                    expected: self.identity(),
                    found: other.identity(),
                });
            }
        }

        let mut union: Vec<Entry> = self.entries().cloned().collect();
        for entry in others.iter().flat_map(|other| other.entries()) {
            if !union.contains(entry) {
                union.push(entry.clone());
            }
        }
        tracing::info!(
            account = %self.name,
            sources = others.len() + 1,
            entries = union.len(),
            "merged accounts"
        );
        Account::new(
            self.name.clone(),
            self.is_saving,
            union,
            GoalOverrides::new(),
        )
    }

    /// Copies the goals `source` set for periods both accounts share, then
    /// recalculates those periods.
    pub fn inherit_goals(&mut self, source: &Account) -> Result<()> {
        if source.name != self.name {
            return Err(LedgerError::MergeMismatch {
                expected: self.identity(),
                found: source.identity(),
            });
        }
        let mut refreshed = self.periods.clone();
        for (period, budget) in refreshed.iter_mut() {
            if let Some(inherited) = source.periods.get(period) {
                budget.set_goal(inherited.goal());
                budget.recalculate()?;
            }
        }
        self.periods = refreshed;
        Ok(())
    }

    fn identity(&self) -> String {
        let kind = match self.is_saving {
            Some(true) => "saving",
            Some(false) => "spending",
            None => "unclassified",
        };
        format!("`{}` ({kind})", self.name)
    }

    fn period_ref(&self, period: Period) -> Result<&BudgetPeriod> {
        self.periods
            .get(&period)
            .ok_or(LedgerError::PeriodNotFound {
                year: period.year,
                month: period.month,
            })
    }

    fn period_mut(&mut self, year: i32, month: u32) -> Result<&mut BudgetPeriod> {
        self.periods
            .get_mut(&Period { year, month })
            .ok_or(LedgerError::PeriodNotFound { year, month })
    }
}

fn ensure_owner(name: &str, entry: &Entry) -> Result<()> {
    if entry.account_name() != name {
        return Err(LedgerError::invalid(
            "account_name",
            format!("{} (expected {})", entry.account_name(), name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::PeriodState;

    fn fast_food(month: u32, day: u32, amount: i64) -> Entry {
        Entry::new(2015, month, day, "Fast Food", "McDonald's", "$", amount, false).unwrap()
    }

    #[test]
    fn synthesizes_default_goal_from_entries() {
        let account = Account::new(
            "Fast Food",
            None,
            vec![fast_food(11, 24, 300), fast_food(11, 24, 200)],
            GoalOverrides::new(),
        )
        .unwrap();
        let november = account.period((2015, 11)).unwrap();
        assert_eq!(november.goal(), Some(-500));
        assert_eq!(november.reached(), Some(-500));
        assert_eq!(november.entry_count(), 2);
        assert_eq!(november.state(), PeriodState::Recalculated);
    }

    #[test]
    fn overrides_keep_user_goals() {
        let mut goals = GoalOverrides::new();
        goals.insert(Period::from((2015, 10)), Some(-100));
        goals.insert(Period::from((2015, 11)), None);
        goals.insert(Period::from((2014, 1)), Some(-50));
        let account = Account::new(
            "Fast Food",
            Some(false),
            vec![fast_food(10, 24, 500), fast_food(11, 24, 300)],
            goals,
        )
        .unwrap();

        assert_eq!(account.period((2015, 10)).unwrap().goal(), Some(-100));
        assert_eq!(account.period((2015, 11)).unwrap().state(), PeriodState::Unset);
        assert!(account.period((2014, 1)).is_none());
    }

    #[test]
    fn rejects_entries_of_other_accounts() {
        let drinks = Entry::new(2015, 10, 22, "Drinks", "Coffee", "$", 200, false).unwrap();
        let mut account =
            Account::new("Fast Food", None, Vec::new(), GoalOverrides::new()).unwrap();
        assert!(matches!(
            account.add_entry(drinks),
            Err(LedgerError::InvalidField {
                field: "account_name",
                ..
            })
        ));
        assert_eq!(account.entry_count(), 0);
    }

    #[test]
    fn add_recomputes_reached_and_keeps_goal() {
        let mut account = Account::new(
            "Fast Food",
            None,
            vec![fast_food(11, 24, 300)],
            GoalOverrides::new(),
        )
        .unwrap();
        account.set_goal(2015, 11, -1_000).unwrap();
        assert_eq!(account.period((2015, 11)).unwrap().state(), PeriodState::Goaled);

        account.add_entry(fast_food(11, 25, 200)).unwrap();
        let november = account.period((2015, 11)).unwrap();
        assert_eq!(november.goal(), Some(-1_000));
        assert_eq!(november.reached(), Some(-500));
        assert_eq!(november.state(), PeriodState::Recalculated);
        assert_eq!(account.sum_remain(2015, 11).unwrap(), -500);
        assert_eq!(account.percent_reached(2015, 11).unwrap(), Decimal::new(5, 1));
    }

    #[test]
    fn remove_missing_entry_fails() {
        let mut account = Account::new(
            "Fast Food",
            None,
            vec![fast_food(11, 24, 300)],
            GoalOverrides::new(),
        )
        .unwrap();
        assert!(matches!(
            account.remove_entry(&fast_food(11, 24, 999)),
            Err(LedgerError::EntryNotFound(_))
        ));
        assert_eq!(account.entry_count(), 1);
    }

    #[test]
    fn merge_rejects_mismatched_kind() {
        let spending = Account::new(
            "Fast Food",
            Some(false),
            vec![fast_food(11, 24, 300)],
            GoalOverrides::new(),
        )
        .unwrap();
        let saving = Account::new("Fast Food", Some(true), Vec::new(), GoalOverrides::new()).unwrap();
        assert!(matches!(
            spending.merge(&[saving]),
            Err(LedgerError::MergeMismatch { .. })
        ));
    }

    #[test]
    fn goal_accessors_fail_for_unknown_period() {
        let mut account =
            Account::new("Fast Food", None, Vec::new(), GoalOverrides::new()).unwrap();
        assert!(matches!(
            account.set_goal(2015, 11, -100),
            Err(LedgerError::PeriodNotFound {
                year: 2015,
                month: 11
            })
        ));
        assert!(account.percent_remain(2015, 11).is_err());
    }
}
