#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use finance_core::{
    config::ConfigManager,
    ledger::{Account, Entry, GoalOverrides},
    storage::TextStorage,
};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

pub fn temp_base() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

/// Creates an isolated session store and config manager for one test.
pub fn setup_test_env() -> (TextStorage, ConfigManager) {
    let base = temp_base();
    let storage = TextStorage::new(Some(base.clone()), Some(3)).expect("create text storage");
    let config = ConfigManager::with_base_dir(base).expect("create config manager");
    (storage, config)
}

pub fn outflow(account: &str, year: i32, month: u32, day: u32, description: &str, amount: i64) -> Entry {
    Entry::new(year, month, day, account, description, "$", amount, false).expect("valid outflow")
}

pub fn inflow(account: &str, year: i32, month: u32, day: u32, description: &str, amount: i64) -> Entry {
    Entry::new(year, month, day, account, description, "$", amount, true).expect("valid inflow")
}

/// Two November 2015 fast food purchases totalling 5.00.
pub fn fast_food_entries() -> Vec<Entry> {
    vec![
        outflow("Fast Food", 2015, 11, 24, "McDonald's", 300),
        outflow("Fast Food", 2015, 11, 24, "McDonald's", 200),
    ]
}

pub fn fast_food_account() -> Account {
    Account::new("Fast Food", Some(false), fast_food_entries(), GoalOverrides::new())
        .expect("fast food account")
}

pub fn savings_account() -> Account {
    Account::new(
        "Savings",
        Some(true),
        vec![
            inflow("Savings", 2015, 12, 1, "Deposit", 10_000),
            inflow("Savings", 2016, 1, 1, "Deposit", 12_500),
        ],
        GoalOverrides::new(),
    )
    .expect("savings account")
}
