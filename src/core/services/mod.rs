pub mod budget_service;
pub mod cashflow_service;

pub use budget_service::{
    Breakdown, BreakdownLine, BudgetField, BudgetService, Classification, NetFlows, Pace,
};
pub use cashflow_service::{CashFlowService, RebalanceReport};
