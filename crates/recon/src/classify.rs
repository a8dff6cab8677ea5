use crate::config::ToleranceConfig;
use crate::model::{
    Classification, Delta, DiscrepancyFlag, MatchResult, PairMatchOutput, RepaymentRecord,
    TransactionRecord,
};

/// Description fragments that mark a bank line as an ACH/Dwolla transfer.
const TRANSFER_HINTS: [&str; 6] = ["dwolla", "transfer", "ach", "orig co name", "orig id", "trn"];

fn has_transfer_hint(description: &str) -> bool {
    let description = description.to_lowercase();
    TRANSFER_HINTS.iter().any(|hint| description.contains(hint))
}

/// 0.50 base, +0.30 for a transfer hint, +0.20 when posted within a day of
/// the due date, capped at 0.99.
fn match_confidence(transfer_hint: bool, days: i64) -> f64 {
    let mut hundredths: u8 = 50;
    if transfer_hint {
        hundredths += 30;
    }
    if days.abs() <= 1 {
        hundredths += 20;
    }
    hundredths.min(99) as f64 / 100.0
}

/// Label matcher output and compute deltas. Never re-pairs.
///
/// A pair is `matched-exact` when the amount difference is within
/// `amount_cents` and the date difference within `date_window_days`;
/// otherwise `matched-partial`. Output order: matched pairs (matcher order),
/// unmatched repayments, unmatched transactions.
///
/// Matched pairs are annotated with a transfer hint and a confidence score;
/// neither affects the classification.
pub fn classify(
    pair_output: &PairMatchOutput,
    repayments: &[RepaymentRecord],
    transactions: &[TransactionRecord],
    tolerance: &ToleranceConfig,
) -> Vec<MatchResult> {
    let mut results = Vec::with_capacity(
        pair_output.matched.len()
            + pair_output.unmatched_repayments.len()
            + pair_output.unmatched_transactions.len(),
    );

    for &(ri, ti) in &pair_output.matched {
        let repayment = &repayments[ri];
        let txn = &transactions[ti];
        let delta = Delta {
            amount_cents: repayment.amount_cents.saturating_sub(txn.magnitude_cents()),
            days: (txn.date - repayment.due_date).num_days(),
        };

        let transfer_hint = has_transfer_hint(&txn.description);

        let mut flags = Vec::new();
        if delta.amount_cents != 0 {
            flags.push(DiscrepancyFlag::AmountRounding);
        }
        if delta.days.abs() > tolerance.date_window_days {
            flags.push(DiscrepancyFlag::DateDrift);
        }

        let classification = if delta.amount_cents.saturating_abs() <= tolerance.amount_cents
            && delta.days.abs() <= tolerance.date_window_days
        {
            Classification::MatchedExact
        } else {
            Classification::MatchedPartial
        };

        results.push(MatchResult {
            classification,
            repayment: Some(repayment.clone()),
            transaction: Some(txn.clone()),
            delta: Some(delta),
            flags,
            transfer_hint,
            confidence: Some(match_confidence(transfer_hint, delta.days)),
        });
    }

    for &ri in &pair_output.unmatched_repayments {
        results.push(MatchResult {
            classification: Classification::UnmatchedRepayment,
            repayment: Some(repayments[ri].clone()),
            transaction: None,
            delta: None,
            flags: Vec::new(),
            transfer_hint: false,
            confidence: None,
        });
    }

    for &ti in &pair_output.unmatched_transactions {
        results.push(MatchResult {
            classification: Classification::UnmatchedTransaction,
            repayment: None,
            transaction: Some(transactions[ti].clone()),
            delta: None,
            flags: Vec::new(),
            transfer_hint: false,
            confidence: None,
        });
    }

    results
}
