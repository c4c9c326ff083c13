#![doc(test(attr(deny(warnings))))]

//! Finance Core holds the ledger model behind a personal budgeting tool:
//! dated entries, per-month account budgets, and a line-oriented text format
//! for saving whole sessions.

pub mod config;
pub mod core;
pub mod errors;
pub mod ledger;
pub mod storage;
pub mod utils;

use std::sync::Once;

pub use errors::{LedgerError, Result};

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Finance Core tracing initialized.");
    });
}
