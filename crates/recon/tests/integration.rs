use std::collections::HashSet;

use proptest::prelude::*;

use r2d_recon::config::{MatchDirection, ReconConfig, ToleranceConfig};
use r2d_recon::filter::apply_cutoff;
use r2d_recon::model::{Cell, Classification, RawSheet, ReconInput, RejectReason, TransactionRecord};
use r2d_recon::{run, ReconReport};

const R2D_HEADERS: &[&str] = &["ACH ID", "Amount Transferred", "Likely Arrived Date", "Recipient Name"];
const CHASE_HEADERS: &[&str] = &["Details", "Posting Date", "Description", "Amount", "Type"];

fn input(r2d: &[&[&str]], chase: &[&[&str]]) -> ReconInput {
    ReconInput {
        repayments: RawSheet::from_strings("Repayments to Date", R2D_HEADERS, r2d),
        transactions: RawSheet::from_strings("Chase", CHASE_HEADERS, chase),
    }
}

fn config(cutoff: Option<&str>, tolerance_cents: i64) -> ReconConfig {
    ReconConfig {
        cutoff: cutoff.map(String::from),
        tolerance: ToleranceConfig { amount_cents: tolerance_cents, ..ToleranceConfig::default() },
        ..ReconConfig::default()
    }
}

// -------------------------------------------------------------------------
// Scenarios
// -------------------------------------------------------------------------

#[test]
fn debit_one_day_late_is_exact() {
    let input = input(
        &[&["ACH-1", "500.00", "2024-01-10", "Alice"]],
        &[&["DEBIT", "01/11/2024", "ORIG CO NAME:DWOLLA", "-500.00", "ACH_DEBIT"]],
    );
    let report = run(&config(Some("2024-01-01"), 1), &input).unwrap();

    assert_eq!(report.matched.len(), 1);
    let m = &report.matched[0];
    assert_eq!(m.classification, Classification::MatchedExact);
    let delta = m.delta.unwrap();
    assert_eq!(delta.amount_cents, 0);
    assert_eq!(delta.days, 1);
    assert!(report.unmatched_repayments.is_empty());
    assert!(report.unmatched_transactions.is_empty());
    assert_eq!(report.summary.filtered.count, 0);
}

#[test]
fn debit_before_cutoff_is_filtered() {
    let input = input(
        &[&["ACH-1", "500.00", "2024-01-10", "Alice"]],
        &[&["DEBIT", "12/20/2023", "ORIG CO NAME:DWOLLA", "-500.00", "ACH_DEBIT"]],
    );
    let report = run(&config(Some("2024-01-01"), 1), &input).unwrap();

    assert!(report.matched.is_empty());
    assert_eq!(report.unmatched_repayments.len(), 1);
    assert_eq!(report.unmatched_repayments[0].classification, Classification::UnmatchedRepayment);
    assert!(report.unmatched_transactions.is_empty());
    assert_eq!(report.summary.filtered.count, 1);
    assert_eq!(report.summary.filtered.amount_cents, 50000);
    assert_eq!(report.filtered.len(), 1);
    assert!(report.filtered[0].filtered);
}

#[test]
fn credit_before_cutoff_is_kept() {
    let input = input(
        &[&["ACH-1", "500.00", "2023-12-21", "Alice"]],
        &[&["CREDIT", "12/20/2023", "DEPOSIT", "500.00", "ACH_CREDIT"]],
    );
    let report = run(&config(Some("2024-01-01"), 1), &input).unwrap();
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.summary.filtered.count, 0);
}

#[test]
fn amount_mismatch_leaves_both_unmatched() {
    let input = input(
        &[&["ACH-1", "500.00", "2024-01-10", "Alice"]],
        &[&["DEBIT", "01/10/2024", "TRANSFER", "-480.00", "ACH_DEBIT"]],
    );
    let report = run(&config(None, 1), &input).unwrap();

    assert!(report.matched.is_empty());
    assert_eq!(report.unmatched_repayments.len(), 1);
    assert_eq!(report.unmatched_transactions.len(), 1);
    assert_eq!(
        report.unmatched_transactions[0].classification,
        Classification::UnmatchedTransaction
    );
    assert_eq!(report.summary.total(Classification::UnmatchedRepayment).amount_cents, 50000);
    assert_eq!(report.summary.total(Classification::UnmatchedTransaction).amount_cents, 48000);
}

#[test]
fn non_numeric_amount_rejected_run_completes() {
    let input = input(
        &[
            &["ACH-1", "N/A", "2024-01-10", "Alice"],
            &["ACH-2", "250.00", "2024-01-12", "Bob"],
        ],
        &[&["DEBIT", "01/12/2024", "TRANSFER", "-250.00", "ACH_DEBIT"]],
    );
    let report = run(&config(None, 1), &input).unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].reason, RejectReason::InvalidAmount);
    assert_eq!(report.rejected[0].row, 2);
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.matched[0].repayment.as_ref().unwrap().id, "ACH-2");
    assert_eq!(report.summary.repayments_read, 1);
    let invalid_amounts = report
        .summary
        .rejected
        .iter()
        .find(|r| r.reason == RejectReason::InvalidAmount)
        .unwrap();
    assert_eq!(invalid_amounts.count, 1);
}

#[test]
fn tolerance_boundary_at_and_above() {
    let sheets = || {
        input(
            &[&["ACH-1", "500.00", "2024-01-10", ""]],
            &[&["DEBIT", "01/10/2024", "", "-500.01", ""]],
        )
    };

    let at = run(&config(None, 1), &sheets()).unwrap();
    assert_eq!(at.matched.len(), 1);
    assert_eq!(at.matched[0].classification, Classification::MatchedExact);

    let above = run(&config(None, 0), &sheets()).unwrap();
    assert!(above.matched.is_empty());
    assert_eq!(above.unmatched_repayments.len(), 1);
    assert_eq!(above.unmatched_transactions.len(), 1);
}

fn numeric_repayment(id: &str, amount: f64) -> Vec<Cell> {
    vec![Cell::Text(id.into()), Cell::Number(amount), Cell::Text("2024-01-10".into()), Cell::Empty]
}

#[test]
fn huge_numeric_amount_is_rejected_not_matched() {
    let mut input = input(&[], &[&["DEBIT", "01/10/2024", "", "5.00", ""]]);
    input.repayments.rows.push(numeric_repayment("ACH-1", -1e30));
    let report = run(&config(None, 1), &input).unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].reason, RejectReason::InvalidAmount);
    assert!(report.matched.is_empty());
    assert_eq!(report.unmatched_transactions.len(), 1);
}

#[test]
fn huge_amounts_do_not_break_summary_totals() {
    let mut input = input(&[&["ACH-3", "12.00", "2024-01-10", ""]], &[]);
    input.repayments.rows.push(numeric_repayment("ACH-1", 1e20));
    input.repayments.rows.push(numeric_repayment("ACH-2", 1e20));
    let report = run(&config(None, 1), &input).unwrap();

    assert_eq!(report.rejected.len(), 2);
    assert!(report.rejected.iter().all(|r| r.reason == RejectReason::InvalidAmount));
    let unmatched = report.summary.total(Classification::UnmatchedRepayment);
    assert_eq!(unmatched.count, 1);
    assert_eq!(unmatched.amount_cents, 1200);
}

#[test]
fn dwolla_debit_carries_transfer_hint() {
    let input = input(
        &[&["ACH-1", "500.00", "2024-01-10", ""], &["ACH-2", "75.00", "2024-01-10", ""]],
        &[
            &["DEBIT", "01/11/2024", "ORIG CO NAME:DWOLLA INC", "-500.00", "ACH_DEBIT"],
            &["DEBIT", "01/14/2024", "CHECK 1042", "-75.00", "CHECK_PAID"],
        ],
    );
    let report = run(&config(None, 1), &input).unwrap();

    assert_eq!(report.matched.len(), 2);
    let hinted = &report.matched[0];
    assert!(hinted.transfer_hint);
    assert_eq!(hinted.confidence, Some(0.99));
    let plain = &report.matched[1];
    assert!(!plain.transfer_hint);
    assert_eq!(plain.confidence, Some(0.5));
    assert_eq!(plain.classification, Classification::MatchedExact);
}

#[test]
fn chase_export_with_parenthesised_amounts_and_serials() {
    let mut input = input(&[&["ACH-9", "$1,234.56", "2024-01-10", ""]], &[]);
    input.transactions.rows.push(vec![
        Cell::Text("DEBIT".into()),
        Cell::Number(45302.0),
        Cell::Text("ONLINE TRANSFER".into()),
        Cell::Text("(1,234.56)".into()),
        Cell::Empty,
    ]);
    let report = run(&config(None, 1), &input).unwrap();
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.matched[0].delta.unwrap().days, 1);
}

#[test]
fn debit_only_direction_ignores_credits() {
    let input = input(
        &[&["ACH-1", "100.00", "2024-01-10", ""]],
        &[
            &["CREDIT", "01/10/2024", "DEPOSIT", "100.00", ""],
            &["DEBIT", "01/14/2024", "TRANSFER", "-100.00", ""],
        ],
    );
    let cfg = ReconConfig { match_direction: MatchDirection::Debit, ..config(None, 1) };
    let report = run(&cfg, &input).unwrap();
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.matched[0].transaction.as_ref().unwrap().row, 3);
    assert_eq!(report.unmatched_transactions.len(), 1);
    assert_eq!(report.unmatched_transactions[0].transaction.as_ref().unwrap().row, 2);
}

#[test]
fn config_file_drives_columns() {
    let cfg = ReconConfig::from_toml(
        r#"
[repayment_columns]
id = "Claim"
amount = "Repayment"
date = "Arrived"

[transaction_columns]
amount = "Amt"
date = "Post Date"
reference = "Ref"
"#,
    )
    .unwrap();
    let input = ReconInput {
        repayments: RawSheet::from_strings(
            "Repayments to Date",
            &["Claim", "Repayment", "Arrived"],
            &[&["C-1", "40", "2024-03-01"]],
        ),
        transactions: RawSheet::from_strings(
            "Chase",
            &["Ref", "Amt", "Post Date"],
            &[&["T-77", "40.00", "2024-03-02"]],
        ),
    };
    let report = run(&cfg, &input).unwrap();
    assert_eq!(report.matched.len(), 1);
    assert_eq!(report.matched[0].transaction.as_ref().unwrap().reference, "T-77");
}

// -------------------------------------------------------------------------
// Properties
// -------------------------------------------------------------------------

fn date_str(offset: u32) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
    (base + chrono::Duration::days(offset as i64)).format("%Y-%m-%d").to_string()
}

fn cents_str(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    format!("{sign}{}.{:02}", cents.abs() / 100, cents.abs() % 100)
}

/// A few distinct amounts so collisions (and therefore competition) are common.
fn amount() -> impl Strategy<Value = i64> {
    prop_oneof![Just(50000i64), Just(50001), Just(48000), Just(1250), 1i64..100]
}

prop_compose! {
    fn r2d_row()(id in 0u32..40, cents in amount(), day in 0u32..60, bad in 0u8..20) -> Vec<String> {
        let amount = if bad == 0 { "N/A".to_string() } else { cents_str(cents) };
        vec![format!("ACH-{id}"), amount, date_str(day), String::new()]
    }
}

prop_compose! {
    fn chase_row()(cents in amount(), debit in any::<bool>(), day in 0u32..60, bad in 0u8..20) -> Vec<String> {
        let signed = if debit { -cents } else { cents };
        let date = if bad == 0 { "someday".to_string() } else { date_str(day) };
        vec![String::new(), date, String::new(), cents_str(signed), String::new()]
    }
}

fn build_input(r2d: &[Vec<String>], chase: &[Vec<String>]) -> ReconInput {
    let to_sheet = |name: &str, headers: &[&str], rows: &[Vec<String>]| RawSheet {
        name: name.into(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|v| Cell::from(v.as_str())).collect())
            .collect(),
    };
    ReconInput {
        repayments: to_sheet("Repayments to Date", R2D_HEADERS, r2d),
        transactions: to_sheet("Chase", CHASE_HEADERS, chase),
    }
}

fn transaction_rows(report: &ReconReport) -> Vec<usize> {
    report
        .matched
        .iter()
        .chain(&report.unmatched_transactions)
        .filter_map(|r| r.transaction.as_ref().map(|t| t.row))
        .collect()
}

proptest! {
    #[test]
    fn every_record_lands_in_exactly_one_place(
        r2d in prop::collection::vec(r2d_row(), 0..25),
        chase in prop::collection::vec(chase_row(), 0..25),
        use_cutoff in any::<bool>(),
    ) {
        let input = build_input(&r2d, &chase);
        let cutoff = if use_cutoff { Some("2023-12-20") } else { None };
        let report = run(&config(cutoff, 1), &input).unwrap();

        // Repayments: matched or unmatched, never both, never missing
        let mut rep_rows: Vec<usize> = report
            .matched
            .iter()
            .chain(&report.unmatched_repayments)
            .filter_map(|r| r.repayment.as_ref().map(|r| r.row))
            .collect();
        let r2d_rejected = report.rejected.iter().filter(|r| r.sheet == "Repayments to Date").count();
        prop_assert_eq!(rep_rows.len() + r2d_rejected, r2d.len());
        rep_rows.sort_unstable();
        rep_rows.dedup();
        prop_assert_eq!(rep_rows.len(), report.summary.repayments_read);

        // Transactions: matched, unmatched or filtered
        let mut txn_rows = transaction_rows(&report);
        txn_rows.extend(report.filtered.iter().map(|t| t.row));
        let chase_rejected = report.rejected.iter().filter(|r| r.sheet == "Chase").count();
        prop_assert_eq!(txn_rows.len() + chase_rejected, chase.len());
        let unique: HashSet<usize> = txn_rows.iter().copied().collect();
        prop_assert_eq!(unique.len(), txn_rows.len());

        // Summary agrees with the result sets
        let s = &report.summary;
        prop_assert_eq!(
            s.total(Classification::MatchedExact).count + s.total(Classification::MatchedPartial).count,
            report.matched.len()
        );
        prop_assert_eq!(s.filtered.count, report.filtered.len());
        prop_assert_eq!(s.rejected_count(), report.rejected.len());
    }

    #[test]
    fn no_transaction_is_consumed_twice(
        r2d in prop::collection::vec(r2d_row(), 0..30),
        chase in prop::collection::vec(chase_row(), 0..10),
    ) {
        let report = run(&config(None, 1), &build_input(&r2d, &chase)).unwrap();
        let matched_rows: Vec<usize> = report
            .matched
            .iter()
            .filter_map(|r| r.transaction.as_ref().map(|t| t.row))
            .collect();
        let unique: HashSet<usize> = matched_rows.iter().copied().collect();
        prop_assert_eq!(unique.len(), matched_rows.len());
        for m in &report.matched {
            let delta = m.delta.unwrap();
            prop_assert!(delta.amount_cents.abs() <= 1);
        }
    }

    #[test]
    fn full_pipeline_is_deterministic(
        r2d in prop::collection::vec(r2d_row(), 0..20),
        chase in prop::collection::vec(chase_row(), 0..20),
    ) {
        let cfg = config(Some("2023-12-15"), 1);
        let first = run(&cfg, &build_input(&r2d, &chase)).unwrap();
        let second = run(&cfg, &build_input(&r2d, &chase)).unwrap();
        let a = serde_json::to_string(&first.tables()).unwrap();
        let b = serde_json::to_string(&second.tables()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn cutoff_filtering_is_idempotent(
        rows in prop::collection::vec((amount(), any::<bool>(), 0u32..60), 0..30),
    ) {
        let mut txns: Vec<TransactionRecord> = rows
            .iter()
            .enumerate()
            .map(|(i, (cents, debit, day))| TransactionRecord {
                row: i + 2,
                reference: format!("row {}", i + 2),
                amount_cents: if *debit { -cents } else { *cents },
                date: chrono::NaiveDate::parse_from_str(&date_str(*day), "%Y-%m-%d").unwrap(),
                description: String::new(),
                filtered: false,
            })
            .collect();
        let cutoff = chrono::NaiveDate::from_ymd_opt(2023, 12, 20);
        let once = apply_cutoff(&mut txns, cutoff);
        let after_once = txns.clone();
        let twice = apply_cutoff(&mut txns, cutoff);
        prop_assert_eq!(once, twice);
        prop_assert_eq!(after_once, txns);
    }
}
