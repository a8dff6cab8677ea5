use crate::config::{MatchDirection, ToleranceConfig};
use crate::model::{PairMatchOutput, RepaymentRecord, RepaymentStatus, TransactionRecord};

/// Pair each repayment with at most one unconsumed transaction.
///
/// Repayments are visited by due date, then id, then sheet row. A candidate
/// qualifies when its absolute amount is within `tolerance.amount_cents` of
/// the repayment and, if `max_date_window_days` is set, its date is within
/// that many days. Among qualifying candidates the nearest date wins, then
/// the earliest sheet position. Filtered transactions never enter the pool
/// and are absent from the output.
pub fn match_repayments(
    repayments: &mut [RepaymentRecord],
    transactions: &[TransactionRecord],
    tolerance: &ToleranceConfig,
    direction: MatchDirection,
) -> PairMatchOutput {
    let mut order: Vec<usize> = (0..repayments.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&repayments[a], &repayments[b]);
        ra.due_date
            .cmp(&rb.due_date)
            .then_with(|| ra.id.cmp(&rb.id))
            .then_with(|| ra.row.cmp(&rb.row))
    });

    // Pool membership, indexed like `transactions`. Consumed slots flip to false.
    let mut available: Vec<bool> = transactions
        .iter()
        .map(|t| !t.filtered && direction.admits(t.amount_cents))
        .collect();

    let mut matched = Vec::new();
    let mut unmatched_repayments = Vec::new();

    for ri in order {
        let repayment = &repayments[ri];
        let mut best: Option<(usize, i64)> = None;

        for (ti, txn) in transactions.iter().enumerate() {
            if !available[ti] {
                continue;
            }
            let amount_delta = repayment.amount_cents.saturating_sub(txn.magnitude_cents()).saturating_abs();
            if amount_delta > tolerance.amount_cents {
                continue;
            }
            let day_delta = (txn.date - repayment.due_date).num_days().abs();
            if tolerance.max_date_window_days.is_some_and(|max| day_delta > max) {
                continue;
            }
            // Strict `<` keeps the earliest sheet position on ties.
            if best.map_or(true, |(_, best_days)| day_delta < best_days) {
                best = Some((ti, day_delta));
            }
        }

        match best {
            Some((ti, _)) => {
                available[ti] = false;
                repayments[ri].status = RepaymentStatus::Settled;
                matched.push((ri, ti));
            }
            None => unmatched_repayments.push(ri),
        }
    }

    let unmatched_transactions: Vec<usize> = transactions
        .iter()
        .enumerate()
        .filter(|(ti, t)| !t.filtered && (available[*ti] || !direction.admits(t.amount_cents)))
        .map(|(ti, _)| ti)
        .collect();

    log::debug!(
        "matcher: {} matched, {} repayment(s) and {} transaction(s) unmatched",
        matched.len(),
        unmatched_repayments.len(),
        unmatched_transactions.len()
    );

    PairMatchOutput {
        matched,
        unmatched_repayments,
        unmatched_transactions,
    }
}
