//! Result grouping, summary totals and tabular rendering.

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ReconConfig;
use crate::filter::filter_stats;
use crate::model::{
    Classification, ClassificationTotal, MatchResult, ReconMeta, ReconReport,
    ReconSummary, RejectReason, RejectionTotal, RowRejection, TransactionRecord,
};

/// Inputs to [`assemble`] besides the classified results.
pub struct RunTotals {
    pub repayments_read: usize,
    pub transactions_read: usize,
    pub filtered: Vec<TransactionRecord>,
    pub rejected: Vec<RowRejection>,
    pub cutoff: Option<NaiveDate>,
}

/// Group classified results into the report sets and compute the summary.
pub fn assemble(results: Vec<MatchResult>, totals: RunTotals, config: &ReconConfig) -> ReconReport {
    let summary = compute_summary(&results, &totals, config);

    let mut matched = Vec::new();
    let mut unmatched_repayments = Vec::new();
    let mut unmatched_transactions = Vec::new();
    for r in results {
        match r.classification {
            Classification::MatchedExact | Classification::MatchedPartial => matched.push(r),
            Classification::UnmatchedRepayment => unmatched_repayments.push(r),
            Classification::UnmatchedTransaction => unmatched_transactions.push(r),
        }
    }

    ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            repayments_sheet: config.sheets.repayments.clone(),
            transactions_sheet: config.sheets.transactions.clone(),
        },
        summary,
        matched,
        unmatched_repayments,
        unmatched_transactions,
        filtered: totals.filtered,
        rejected: totals.rejected,
    }
}

/// Amount a result contributes to its classification total.
fn summary_amount(result: &MatchResult) -> i64 {
    match (&result.repayment, &result.transaction) {
        (Some(r), _) => r.amount_cents,
        (None, Some(t)) => t.magnitude_cents(),
        (None, None) => 0,
    }
}

fn compute_summary(results: &[MatchResult], totals: &RunTotals, config: &ReconConfig) -> ReconSummary {
    let classifications = Classification::ALL
        .iter()
        .map(|&classification| {
            let (count, amount_cents) = results
                .iter()
                .filter(|r| r.classification == classification)
                .fold((0, 0i64), |(n, sum), r| (n + 1, sum.saturating_add(summary_amount(r))));
            ClassificationTotal { classification, count, amount_cents }
        })
        .collect();

    let rejected = RejectReason::ALL
        .iter()
        .map(|&reason| RejectionTotal {
            reason,
            count: totals.rejected.iter().filter(|r| r.reason == reason).count(),
        })
        .collect();

    ReconSummary {
        repayments_read: totals.repayments_read,
        transactions_read: totals.transactions_read,
        classifications,
        flagged: results.iter().filter(|r| r.is_flagged()).count(),
        filtered: filter_stats(&totals.filtered),
        rejected,
        tolerance_cents: config.tolerance.amount_cents,
        cutoff: totals.cutoff,
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TableValue {
    Empty,
    Text(String),
    /// Minor currency units.
    Money(i64),
    Int(i64),
    Number(f64),
    Date(NaiveDate),
}

/// One named result table with a fixed column schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<TableValue>>,
}

pub const MATCHED_TABLE: &str = "Matched";
pub const UNMATCHED_R2D_TABLE: &str = "Unmatched R2D";
pub const UNMATCHED_CHASE_TABLE: &str = "Unmatched Chase";
pub const FILTERED_TABLE: &str = "Filtered Chase";
pub const REJECTED_TABLE: &str = "Rejected Rows";
pub const SUMMARY_TABLE: &str = "Summary";

const REPAYMENT_COLUMNS: [&str; 5] = ["R2D Row", "R2D ID", "R2D Amount", "Due Date", "R2D Description"];
const TRANSACTION_COLUMNS: [&str; 5] =
    ["Chase Row", "Chase Reference", "Chase Amount", "Posting Date", "Chase Description"];

fn text(s: &str) -> TableValue {
    if s.is_empty() {
        TableValue::Empty
    } else {
        TableValue::Text(s.to_string())
    }
}

fn repayment_cells(result: &MatchResult) -> Vec<TableValue> {
    match &result.repayment {
        Some(r) => vec![
            TableValue::Int(r.row as i64),
            text(&r.id),
            TableValue::Money(r.amount_cents),
            TableValue::Date(r.due_date),
            text(&r.description),
        ],
        None => vec![TableValue::Empty; REPAYMENT_COLUMNS.len()],
    }
}

fn transaction_cells(txn: Option<&TransactionRecord>) -> Vec<TableValue> {
    match txn {
        Some(t) => vec![
            TableValue::Int(t.row as i64),
            text(&t.reference),
            TableValue::Money(t.amount_cents),
            TableValue::Date(t.date),
            text(&t.description),
        ],
        None => vec![TableValue::Empty; TRANSACTION_COLUMNS.len()],
    }
}

impl ReconReport {
    /// All result tables in presentation order.
    pub fn tables(&self) -> Vec<Table> {
        vec![
            self.matched_table(),
            self.unmatched_repayments_table(),
            self.unmatched_transactions_table(),
            self.filtered_table(),
            self.rejected_table(),
            self.summary_table(),
        ]
    }

    fn matched_table(&self) -> Table {
        let mut columns = vec!["Classification"];
        columns.extend(REPAYMENT_COLUMNS);
        columns.extend(TRANSACTION_COLUMNS);
        columns.extend(["Amount Difference", "Day Difference", "Flags", "Transfer Hint", "Confidence"]);

        let rows = self
            .matched
            .iter()
            .map(|r| {
                let mut row = vec![TableValue::Text(r.classification.to_string())];
                row.extend(repayment_cells(r));
                row.extend(transaction_cells(r.transaction.as_ref()));
                match r.delta {
                    Some(d) => row.extend([TableValue::Money(d.amount_cents), TableValue::Int(d.days)]),
                    None => row.extend([TableValue::Empty, TableValue::Empty]),
                }
                let flags: Vec<String> = r.flags.iter().map(|f| f.to_string()).collect();
                row.push(text(&flags.join(", ")));
                row.push(if r.transfer_hint { text("yes") } else { TableValue::Empty });
                row.push(r.confidence.map_or(TableValue::Empty, TableValue::Number));
                row
            })
            .collect();

        Table { name: MATCHED_TABLE, columns, rows }
    }

    fn unmatched_repayments_table(&self) -> Table {
        let mut columns = vec!["Classification"];
        columns.extend(REPAYMENT_COLUMNS);
        let rows = self
            .unmatched_repayments
            .iter()
            .map(|r| {
                let mut row = vec![TableValue::Text(r.classification.to_string())];
                row.extend(repayment_cells(r));
                row
            })
            .collect();
        Table { name: UNMATCHED_R2D_TABLE, columns, rows }
    }

    fn unmatched_transactions_table(&self) -> Table {
        let mut columns = vec!["Classification"];
        columns.extend(TRANSACTION_COLUMNS);
        let rows = self
            .unmatched_transactions
            .iter()
            .map(|r| {
                let mut row = vec![TableValue::Text(r.classification.to_string())];
                row.extend(transaction_cells(r.transaction.as_ref()));
                row
            })
            .collect();
        Table { name: UNMATCHED_CHASE_TABLE, columns, rows }
    }

    fn filtered_table(&self) -> Table {
        Table {
            name: FILTERED_TABLE,
            columns: TRANSACTION_COLUMNS.to_vec(),
            rows: self.filtered.iter().map(|t| transaction_cells(Some(t))).collect(),
        }
    }

    fn rejected_table(&self) -> Table {
        Table {
            name: REJECTED_TABLE,
            columns: vec!["Sheet", "Row", "Reason", "Column", "Value"],
            rows: self
                .rejected
                .iter()
                .map(|r| {
                    vec![
                        TableValue::Text(r.sheet.clone()),
                        TableValue::Int(r.row as i64),
                        TableValue::Text(r.reason.to_string()),
                        TableValue::Text(r.column.clone()),
                        text(&r.value),
                    ]
                })
                .collect(),
        }
    }

    fn summary_table(&self) -> Table {
        let s = &self.summary;
        let mut rows: Vec<Vec<TableValue>> = s
            .classifications
            .iter()
            .map(|t| {
                vec![
                    TableValue::Text(t.classification.to_string()),
                    TableValue::Int(t.count as i64),
                    TableValue::Money(t.amount_cents),
                ]
            })
            .collect();
        rows.push(vec![
            TableValue::Text("filtered".into()),
            TableValue::Int(s.filtered.count as i64),
            TableValue::Money(s.filtered.amount_cents),
        ]);
        rows.push(vec![
            TableValue::Text("flagged".into()),
            TableValue::Int(s.flagged as i64),
            TableValue::Empty,
        ]);
        for r in &s.rejected {
            rows.push(vec![
                TableValue::Text(format!("rejected: {}", r.reason)),
                TableValue::Int(r.count as i64),
                TableValue::Empty,
            ]);
        }

        Table {
            name: SUMMARY_TABLE,
            columns: vec!["Category", "Count", "Amount"],
            rows,
        }
    }
}
