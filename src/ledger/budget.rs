use rust_decimal::Decimal;

use super::{
    entry::{signed_total, Entry},
    period::Period,
};
use crate::errors::{LedgerError, Result};

/// Lifecycle of a [`BudgetPeriod`], derived from which figures are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    /// No goal has been set.
    Unset,
    /// A goal was set and the derived figures have not been refreshed since.
    Goaled,
    /// Reached, remaining and percentages reflect the current goal and entries.
    Recalculated,
}

/// Goal and progress figures for one account in one month.
///
/// Money fields are signed minor units: inflows count positive, outflows negative.
/// `remaining` is `max(0, goal - reached)`. Percentages are fractions rounded to
/// two places; they hold zero while undefined (no goal, or a zero goal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetPeriod {
    entries: Vec<Entry>,
    goal: Option<i64>,
    reached: Option<i64>,
    remaining: Option<i64>,
    percent_remaining: Decimal,
    percent_reached: Decimal,
}

impl BudgetPeriod {
    pub(crate) fn new(entries: Vec<Entry>, goal: Option<i64>) -> Self {
        Self {
            entries,
            goal,
            reached: None,
            remaining: None,
            percent_remaining: Decimal::ZERO,
            percent_reached: Decimal::ZERO,
        }
    }

    pub(crate) fn from_parts(
        entries: Vec<Entry>,
        goal: Option<i64>,
        reached: Option<i64>,
        remaining: Option<i64>,
        percent_remaining: Decimal,
        percent_reached: Decimal,
    ) -> Self {
        Self {
            entries,
            goal,
            reached,
            remaining,
            percent_remaining,
            percent_reached,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of entries filed in the period.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn goal(&self) -> Option<i64> {
        self.goal
    }

    pub fn reached(&self) -> Option<i64> {
        self.reached
    }

    pub fn remaining(&self) -> Option<i64> {
        self.remaining
    }

    pub fn percent_remaining(&self) -> Decimal {
        self.percent_remaining
    }

    pub fn percent_reached(&self) -> Decimal {
        self.percent_reached
    }

    pub fn state(&self) -> PeriodState {
        match (self.goal, self.remaining) {
            (None, _) => PeriodState::Unset,
            (Some(_), None) => PeriodState::Goaled,
            (Some(_), Some(_)) => PeriodState::Recalculated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    /// Replaces the goal; derived figures wait for the next recalculation.
    pub(crate) fn set_goal(&mut self, goal: Option<i64>) {
        self.goal = goal;
        self.remaining = None;
        self.percent_remaining = Decimal::ZERO;
        self.percent_reached = Decimal::ZERO;
    }

    /// Recomputes every derived figure from the entry list.
    ///
    /// Nothing is written when the sum overflows.
    pub(crate) fn recalculate(&mut self) -> Result<()> {
        let reached = signed_total(&self.entries)?;
        let (remaining, percent_reached, percent_remaining) = match self.goal {
            Some(goal) => {
                let gap = goal
                    .checked_sub(reached)
                    .ok_or(LedgerError::AmountOverflow)?;
                let percent_reached = ratio(reached, goal).unwrap_or(Decimal::ZERO);
                let percent_remaining = if goal == 0 {
                    Decimal::ZERO
                } else {
                    complement(percent_reached)
                };
                (Some(gap.max(0)), percent_reached, percent_remaining)
            }
            None => (None, Decimal::ZERO, Decimal::ZERO),
        };
        self.reached = Some(reached);
        self.remaining = remaining;
        self.percent_reached = percent_reached;
        self.percent_remaining = percent_remaining;
        Ok(())
    }

    /// `goal - reached` when both move in the same direction, `goal + reached` otherwise.
    pub(crate) fn sum_remain(&self, period: Period) -> Result<i64> {
        let goal = self.require_goal(period)?;
        let reached = self.reached.unwrap_or(0);
        let same_sign = (goal < 0 && reached < 0) || (goal > 0 && reached > 0);
        let value = if same_sign {
            goal.checked_sub(reached)
        } else {
            goal.checked_add(reached)
        };
        value.ok_or(LedgerError::AmountOverflow)
    }

    pub(crate) fn percent_reached_checked(&self, period: Period) -> Result<Decimal> {
        let goal = self.require_goal(period)?;
        ratio(self.reached.unwrap_or(0), goal).ok_or(LedgerError::UndefinedPercentage {
            year: period.year,
            month: period.month,
        })
    }

    pub(crate) fn percent_remain_checked(&self, period: Period) -> Result<Decimal> {
        self.percent_reached_checked(period).map(complement)
    }

    fn require_goal(&self, period: Period) -> Result<i64> {
        self.goal.ok_or(LedgerError::GoalNotSet {
            year: period.year,
            month: period.month,
        })
    }
}

/// `reached / goal` rounded to two places; `None` for a zero goal.
fn ratio(reached: i64, goal: i64) -> Option<Decimal> {
    Decimal::from(reached)
        .checked_div(Decimal::from(goal))
        .map(|value| value.round_dp(2))
}

fn complement(percent: Decimal) -> Decimal {
    (Decimal::ONE - percent).max(Decimal::ZERO)
}
