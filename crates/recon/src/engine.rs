use crate::classify::classify;
use crate::config::ReconConfig;
use crate::error::ReconError;
use crate::filter::apply_cutoff;
use crate::matcher::match_repayments;
use crate::model::{ReconInput, ReconReport, RepaymentRecord, TransactionRecord};
use crate::normalize::{normalize_repayments, normalize_transactions};
use crate::report::{assemble, RunTotals};

/// Run one reconciliation. Configuration and schema problems fail before
/// any matching; bad rows end up in `report.rejected`.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconReport, ReconError> {
    config.validate()?;
    let cutoff = config.cutoff_date()?;

    let repayments = normalize_repayments(&input.repayments, &config.repayment_columns)?;
    let transactions = normalize_transactions(&input.transactions, &config.transaction_columns)?;

    let mut rejected = repayments.rejected;
    rejected.extend(transactions.rejected);

    let mut repayment_records: Vec<RepaymentRecord> = repayments.records;
    let mut transaction_records: Vec<TransactionRecord> = transactions.records;

    apply_cutoff(&mut transaction_records, cutoff);

    let pairs = match_repayments(
        &mut repayment_records,
        &transaction_records,
        &config.tolerance,
        config.match_direction,
    );
    let results = classify(&pairs, &repayment_records, &transaction_records, &config.tolerance);

    let totals = RunTotals {
        repayments_read: repayment_records.len(),
        transactions_read: transaction_records.len(),
        filtered: transaction_records.iter().filter(|t| t.filtered).cloned().collect(),
        rejected,
        cutoff,
    };
    let report = assemble(results, totals, config);

    log::info!(
        "reconciled {} repayment(s) against {} transaction(s): {} matched, {} unmatched R2D, {} unmatched Chase, {} filtered, {} rejected",
        report.summary.repayments_read,
        report.summary.transactions_read,
        report.matched.len(),
        report.unmatched_repayments.len(),
        report.unmatched_transactions.len(),
        report.summary.filtered.count,
        report.summary.rejected_count(),
    );

    Ok(report)
}
