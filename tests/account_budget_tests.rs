mod common;

use common::{fast_food_account, fast_food_entries, inflow, outflow, savings_account};
use finance_core::{
    errors::LedgerError,
    ledger::{Account, GoalOverrides, Period, PeriodState},
};
use rust_decimal::Decimal;

#[test]
fn default_goal_equals_reached_for_new_accounts() {
    let account = fast_food_account();
    let november = account.period((2015, 11)).expect("period exists");

    assert_eq!(november.goal(), Some(-500));
    assert_eq!(november.reached(), Some(-500));
    assert_eq!(november.remaining(), Some(0));
    assert_eq!(november.entry_count(), 2);
    assert_eq!(november.state(), PeriodState::Recalculated);
    assert_eq!(account.percent_reached(2015, 11).unwrap(), Decimal::ONE);
}

#[test]
fn recalc_keeps_remaining_and_reached_consistent() {
    let mut account = fast_food_account();
    account
        .add_entry(outflow("Fast Food", 2015, 12, 3, "Burger", 450))
        .unwrap();
    account.set_goal(2015, 11, -1_000).unwrap();
    account.set_goal(2015, 12, -300).unwrap();
    assert_eq!(
        account.period((2015, 12)).unwrap().state(),
        PeriodState::Goaled
    );

    assert!(account.recalc_all().unwrap().is_empty());
    for (_, budget) in account.periods() {
        let reached: i64 = budget.entries().iter().map(|entry| entry.signed_amount()).sum();
        assert_eq!(budget.reached(), Some(reached));
        let goal = budget.goal().expect("goal set");
        assert_eq!(budget.remaining(), Some((goal - reached).max(0)));
    }
    assert_eq!(account.period((2015, 11)).unwrap().remaining(), Some(0));
    assert_eq!(account.sum_remain(2015, 11).unwrap(), -500);
    assert_eq!(account.percent_reached(2015, 11).unwrap(), Decimal::new(5, 1));
    assert_eq!(account.percent_remain(2015, 11).unwrap(), Decimal::new(5, 1));
}

#[test]
fn add_then_remove_restores_entries() {
    let mut account = fast_food_account();
    let before: Vec<_> = account.entries().cloned().collect();
    let extra = outflow("Fast Food", 2015, 11, 30, "Tacos", 725);

    account.add_entry(extra.clone()).unwrap();
    assert_eq!(account.entry_count(), 3);
    assert_eq!(account.period((2015, 11)).unwrap().reached(), Some(-1_225));
    assert_eq!(account.period((2015, 11)).unwrap().goal(), Some(-500));

    let removed = account.remove_entry(&extra).unwrap();
    assert_eq!(removed, extra);
    let after: Vec<_> = account.entries().cloned().collect();
    assert_eq!(after, before);
    assert_eq!(account.period((2015, 11)).unwrap().reached(), Some(-500));
}

#[test]
fn removing_last_entry_drops_the_year() {
    let only = outflow("Fast Food", 2016, 10, 2, "Pizza", 1_200);
    let mut entries = fast_food_entries();
    entries.push(only.clone());
    let mut account =
        Account::new("Fast Food", Some(false), entries, GoalOverrides::new()).unwrap();
    assert_eq!(account.years(), vec![2015, 2016]);

    account.remove_entry(&only).unwrap();
    account.remove_empty_periods();
    assert_eq!(account.years(), vec![2015]);
    assert!(account.period((2016, 10)).is_none());
    assert!(matches!(
        account.sum_remain(2016, 10),
        Err(LedgerError::PeriodNotFound {
            year: 2016,
            month: 10
        })
    ));
}

#[test]
fn zero_goal_percentages_are_undefined() {
    let mut account = fast_food_account();
    account.set_goal(2015, 11, 0).unwrap();
    let undefined = account.recalc_all().unwrap();

    assert_eq!(undefined, vec![Period::from((2015, 11))]);
    assert!(matches!(
        account.percent_reached(2015, 11),
        Err(LedgerError::UndefinedPercentage {
            year: 2015,
            month: 11
        })
    ));
    assert!(matches!(
        account.percent_remain(2015, 11),
        Err(LedgerError::UndefinedPercentage { .. })
    ));
    assert_eq!(account.period((2015, 11)).unwrap().remaining(), Some(500));
}

#[test]
fn merge_is_commutative_and_idempotent() {
    let left = fast_food_account();
    let mut right = Account::new(
        "Fast Food",
        Some(false),
        vec![outflow("Fast Food", 2016, 2, 14, "Date night", 4_000)],
        GoalOverrides::new(),
    )
    .unwrap();
    right
        .add_entry(fast_food_entries().remove(0))
        .unwrap();

    let ab = left.merge(std::slice::from_ref(&right)).unwrap();
    let ba = right.merge(std::slice::from_ref(&left)).unwrap();
    let mut ab_entries: Vec<_> = ab.entries().map(ToString::to_string).collect();
    let mut ba_entries: Vec<_> = ba.entries().map(ToString::to_string).collect();
    ab_entries.sort();
    ba_entries.sort();
    assert_eq!(ab_entries, ba_entries);
    assert_eq!(ab.entry_count(), 3);

    let twice = left.merge(std::slice::from_ref(&left)).unwrap();
    assert_eq!(twice, left);
}

#[test]
fn merge_refuses_other_accounts() {
    let result = fast_food_account().merge(&[savings_account()]);
    assert!(matches!(result, Err(LedgerError::MergeMismatch { .. })));
}

#[test]
fn goals_are_inherited_only_on_request() {
    let mut saved = fast_food_account();
    saved.set_goal(2015, 11, -800).unwrap();
    saved.recalc_all().unwrap();

    let mut fresh = fast_food_account();
    assert_eq!(fresh.period((2015, 11)).unwrap().goal(), Some(-500));
    fresh.inherit_goals(&saved).unwrap();

    let november = fresh.period((2015, 11)).unwrap();
    assert_eq!(november.goal(), Some(-800));
    assert_eq!(november.remaining(), Some(0));
    assert_eq!(november.percent_reached(), Decimal::new(62, 2));
}

#[test]
fn invalid_entries_are_rejected_before_mutation() {
    let mut account = fast_food_account();
    let stranger = outflow("Groceries", 2015, 11, 2, "Milk", 199);
    assert!(matches!(
        account.add_entry(stranger),
        Err(LedgerError::InvalidField {
            field: "account_name",
            ..
        })
    ));
    assert_eq!(account, fast_food_account());

    let big = inflow("Fast Food", 2015, 11, 1, "Refund", i64::MAX);
    let mut overflowing = account.clone();
    overflowing.add_entry(big.clone()).unwrap();
    assert!(matches!(
        overflowing.add_entry(big),
        Err(LedgerError::AmountOverflow)
    ));
    assert_eq!(overflowing.entry_count(), 3);
}
