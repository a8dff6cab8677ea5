use chrono::NaiveDate;

use crate::model::{FilterStats, TransactionRecord};

/// Mark debits dated strictly before `cutoff` as filtered.
///
/// Credits are never filtered. The flag is only ever set, so applying the
/// same cutoff again is a no-op. Returns totals over all filtered records,
/// including ones flagged by an earlier call.
pub fn apply_cutoff(transactions: &mut [TransactionRecord], cutoff: Option<NaiveDate>) -> FilterStats {
    if let Some(cutoff) = cutoff {
        for txn in transactions.iter_mut() {
            if txn.is_debit() && txn.date < cutoff {
                txn.filtered = true;
            }
        }
    }

    let stats = filter_stats(transactions);
    if let Some(cutoff) = cutoff {
        log::debug!("cutoff {cutoff}: {} debit(s) filtered", stats.count);
    }
    stats
}

/// Count and absolute total of the filtered records.
pub fn filter_stats(transactions: &[TransactionRecord]) -> FilterStats {
    transactions
        .iter()
        .filter(|t| t.filtered)
        .fold(FilterStats::default(), |acc, t| FilterStats {
            count: acc.count + 1,
            amount_cents: acc.amount_cents.saturating_add(t.magnitude_cents()),
        })
}
