//! Ledger domain models: entries, their monthly index, and account budgets.

pub mod account;
pub mod budget;
pub mod entry;
pub mod entry_index;
pub mod period;

pub use account::{Account, GoalOverrides};
pub use budget::{BudgetPeriod, PeriodState};
pub use entry::{signed_total, Entry, EntryFields};
pub use entry_index::{AccountSelector, EntryIndex, ALL_ACCOUNTS};
pub use period::{days_in_month, is_leap_year, Period};
