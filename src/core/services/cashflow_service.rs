use crate::ledger::{Entry, EntryIndex};

/// Counts of what a [`CashFlowService::rebalance`] pass moved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RebalanceReport {
    pub moved_to_inflows: usize,
    pub moved_to_outflows: usize,
    pub refiled: usize,
    /// Moved or re-filed entries dropped because an equal entry was
    /// already in place.
    pub collapsed: usize,
}

/// Keeps a pair of inflow/outflow indexes consistent after edits.
pub struct CashFlowService;

impl CashFlowService {
    /// Builds the inflow and outflow indexes for a batch of entries.
    pub fn split_by_direction<I>(entries: I) -> (EntryIndex, EntryIndex)
    where
        I: IntoIterator<Item = Entry>,
    {
        let (inflows, outflows): (Vec<Entry>, Vec<Entry>) =
            entries.into_iter().partition(Entry::is_inflow);
        (
            inflows.into_iter().collect(),
            outflows.into_iter().collect(),
        )
    }

    /// Moves entries whose direction was edited to the matching index, then
    /// re-files entries whose date no longer matches their period in both.
    /// Neither step leaves two equal entries under one period.
    pub fn rebalance(inflows: &mut EntryIndex, outflows: &mut EntryIndex) -> RebalanceReport {
        let to_outflows = inflows.filter_by_direction(true);
        let to_inflows = outflows.filter_by_direction(false);
        let moved_to_inflows = to_inflows.len();
        let moved_to_outflows = to_outflows.len();
        let added = inflows.insert_all(to_inflows.into_entries())
            + outflows.insert_all(to_outflows.into_entries());
        let mut collapsed = moved_to_inflows + moved_to_outflows - added;

        let mut refiled = 0;
        for index in [inflows, outflows] {
            let before = index.len();
            refiled += index.resort_by_date().len();
            collapsed += before - index.len();
        }

        let report = RebalanceReport {
            moved_to_inflows,
            moved_to_outflows,
            refiled,
            collapsed,
        };
        if report != RebalanceReport::default() {
            tracing::info!(
                to_inflows = report.moved_to_inflows,
                to_outflows = report.moved_to_outflows,
                refiled = report.refiled,
                collapsed = report.collapsed,
                "rebalanced cash flows"
            );
        }
        report
    }
}
