//! Raw sheet rows → typed records.
//!
//! Column names are bound once per sheet. A missing required column aborts
//! the whole run; a bad cell only rejects its row.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use crate::config::{RepaymentColumns, TransactionColumns};
use crate::error::ReconError;
use crate::model::{
    Cell, RawSheet, RejectReason, RepaymentRecord, RepaymentStatus, RowRejection,
    TransactionRecord,
};

/// Records parsed from one sheet plus the rows that were turned away.
#[derive(Debug)]
pub struct Normalized<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RowRejection>,
}

// ---------------------------------------------------------------------------
// Column binding
// ---------------------------------------------------------------------------

struct Binder<'a> {
    sheet: &'a RawSheet,
    missing: Vec<String>,
}

impl<'a> Binder<'a> {
    fn new(sheet: &'a RawSheet) -> Self {
        Self { sheet, missing: Vec::new() }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.sheet.headers.iter().position(|h| h.trim() == name)
    }

    fn required(&mut self, name: &str) -> usize {
        match self.position(name) {
            Some(idx) => idx,
            None => {
                self.missing.push(name.to_string());
                usize::MAX
            }
        }
    }

    fn optional(&self, name: Option<&str>) -> Option<usize> {
        let name = name.filter(|n| !n.trim().is_empty())?;
        let idx = self.position(name);
        if idx.is_none() {
            log::warn!("sheet '{}': optional column '{name}' not found, leaving it empty", self.sheet.name);
        }
        idx
    }

    fn finish(self) -> Result<(), ReconError> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(ReconError::Schema {
                sheet: self.sheet.name.clone(),
                missing: self.missing,
            })
        }
    }
}

fn cell(row: &[Cell], idx: usize) -> &Cell {
    static EMPTY: Cell = Cell::Empty;
    row.get(idx).unwrap_or(&EMPTY)
}

fn text(row: &[Cell], idx: Option<usize>) -> String {
    idx.map(|i| cell(row, i).to_text()).unwrap_or_default()
}

fn reject(sheet: &RawSheet, row: usize, reason: RejectReason, column: &str, value: &Cell) -> RowRejection {
    let rejection = RowRejection {
        sheet: sheet.name.clone(),
        row,
        reason,
        column: column.to_string(),
        value: value.to_text(),
    };
    log::warn!(
        "sheet '{}' row {}: {} in column '{}' ({:?})",
        rejection.sheet,
        rejection.row,
        rejection.reason,
        rejection.column,
        rejection.value
    );
    rejection
}

// ---------------------------------------------------------------------------
// R2D
// ---------------------------------------------------------------------------

pub fn normalize_repayments(
    sheet: &RawSheet,
    columns: &RepaymentColumns,
) -> Result<Normalized<RepaymentRecord>, ReconError> {
    let mut binder = Binder::new(sheet);
    let id_idx = binder.required(&columns.id);
    let amount_idx = binder.required(&columns.amount);
    let date_idx = binder.required(&columns.date);
    let fallback_idx = binder.optional(columns.fallback_date.as_deref());
    let description_idx = binder.optional(columns.description.as_deref());
    binder.finish()?;

    let mut records = Vec::new();
    let mut rejected = Vec::new();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (i, row) in sheet.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let sheet_row = RawSheet::sheet_row(i);

        let amount_cell = cell(row, amount_idx);
        let Some(amount_cents) = parse_amount_cell(amount_cell) else {
            rejected.push(reject(sheet, sheet_row, RejectReason::InvalidAmount, &columns.amount, amount_cell));
            continue;
        };

        // A blank primary date defers to the fallback column; the rejection
        // names whichever column was actually read.
        let (date_column, date_cell) = match (cell(row, date_idx).is_blank(), fallback_idx, &columns.fallback_date) {
            (true, Some(fi), Some(name)) => (name.as_str(), cell(row, fi)),
            _ => (columns.date.as_str(), cell(row, date_idx)),
        };
        let Some(due_date) = parse_date_cell(date_cell) else {
            rejected.push(reject(sheet, sheet_row, RejectReason::InvalidDate, date_column, date_cell));
            continue;
        };

        let id = cell(row, id_idx).to_text();
        if !id.is_empty() && !seen_ids.insert(id.clone()) {
            rejected.push(reject(sheet, sheet_row, RejectReason::DuplicateId, &columns.id, cell(row, id_idx)));
            continue;
        }

        records.push(RepaymentRecord {
            row: sheet_row,
            id,
            amount_cents,
            due_date,
            description: text(row, description_idx),
            status: RepaymentStatus::Open,
        });
    }

    log::debug!(
        "sheet '{}': {} repayment(s), {} rejected",
        sheet.name,
        records.len(),
        rejected.len()
    );
    Ok(Normalized { records, rejected })
}

// ---------------------------------------------------------------------------
// Chase
// ---------------------------------------------------------------------------

pub fn normalize_transactions(
    sheet: &RawSheet,
    columns: &TransactionColumns,
) -> Result<Normalized<TransactionRecord>, ReconError> {
    let mut binder = Binder::new(sheet);
    let amount_idx = binder.required(&columns.amount);
    let date_idx = binder.required(&columns.date);
    let reference_idx = binder.optional(columns.reference.as_deref());
    let description_idx = binder.optional(columns.description.as_deref());
    binder.finish()?;

    let mut records = Vec::new();
    let mut rejected = Vec::new();

    for (i, row) in sheet.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let sheet_row = RawSheet::sheet_row(i);

        let amount_cell = cell(row, amount_idx);
        let Some(amount_cents) = parse_amount_cell(amount_cell) else {
            rejected.push(reject(sheet, sheet_row, RejectReason::InvalidAmount, &columns.amount, amount_cell));
            continue;
        };

        let date_cell = cell(row, date_idx);
        let Some(date) = parse_date_cell(date_cell) else {
            rejected.push(reject(sheet, sheet_row, RejectReason::InvalidDate, &columns.date, date_cell));
            continue;
        };

        let reference = match reference_idx {
            Some(ri) if !cell(row, ri).is_blank() => cell(row, ri).to_text(),
            _ => format!("row {sheet_row}"),
        };

        records.push(TransactionRecord {
            row: sheet_row,
            reference,
            amount_cents,
            date,
            description: text(row, description_idx),
            filtered: false,
        });
    }

    log::debug!(
        "sheet '{}': {} transaction(s), {} rejected",
        sheet.name,
        records.len(),
        rejected.len()
    );
    Ok(Normalized { records, rejected })
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Largest accepted magnitude, in cents ($10 trillion).
///
/// Keeps every difference and per-row sum the engine computes well inside
/// `i64`; anything larger is treated as an unreadable amount.
pub const MAX_AMOUNT_CENTS: i64 = 1_000_000_000_000_000;

fn parse_amount_cell(cell: &Cell) -> Option<i64> {
    let cents = match cell {
        Cell::Number(n) if n.is_finite() => {
            let scaled = (n * 100.0).round();
            if scaled.abs() > MAX_AMOUNT_CENTS as f64 {
                return None;
            }
            scaled as i64
        }
        Cell::Text(s) => parse_amount_cents(s)?,
        _ => return None,
    };
    (cents.abs() <= MAX_AMOUNT_CENTS).then_some(cents)
}

/// Parse a currency string into minor units.
///
/// Accepts `1234.5`, `-1,234.56`, `$1,234.56`, `(1,234.56)` and `-$5`.
/// Fractions beyond two digits round half away from zero.
pub fn parse_amount_cents(raw: &str) -> Option<i64> {
    let mut s = raw.trim();
    let mut negative = false;

    if let Some(inner) = s.strip_prefix('(').and_then(|rest| rest.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }
    if let Some(rest) = s.strip_prefix('-') {
        if negative {
            return None;
        }
        negative = true;
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }
    if let Some(rest) = s.strip_prefix('$') {
        s = rest.trim_start();
    }
    // "$-5.00" is how some exports write negatives
    if !negative {
        if let Some(rest) = s.strip_prefix('-') {
            negative = true;
            s = rest;
        }
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !valid_integer_part(int_part) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let digits: String = int_part.chars().filter(|c| *c != ',').collect();
    let whole: i64 = if digits.is_empty() { 0 } else { digits.parse().ok()? };

    let frac_bytes = frac_part.as_bytes();
    let digit = |i: usize| frac_bytes.get(i).map(|b| (b - b'0') as i64).unwrap_or(0);
    let mut cents = digit(0) * 10 + digit(1);
    if digit(2) >= 5 {
        cents += 1;
    }

    let total = whole.checked_mul(100)?.checked_add(cents)?;
    Some(if negative { -total } else { total })
}

/// Digits, optionally grouped in threes by commas (`1,234,567`).
fn valid_integer_part(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if !s.contains(',') {
        return s.bytes().all(|b| b.is_ascii_digit());
    }
    let mut groups = s.split(',');
    let first = groups.next().unwrap_or("");
    if first.is_empty() || first.len() > 3 || !first.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

// Two-digit years go first: %Y would read "1/10/24" as year 24.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y", "%Y/%m/%d", "%d-%b-%Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];

fn parse_date_cell(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => excel_serial_to_date(*n),
        Cell::Text(s) => parse_date(s),
        Cell::Empty => None,
    }
}

/// Parse a date string in one of the accepted layouts.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Excel 1900-system serial → date. Day 60 (the phantom 1900-02-29) is rejected.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 2_958_466.0 {
        return None;
    }
    let days = serial.floor() as i64;
    if days == 60 {
        return None;
    }
    let base = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_signed(Duration::days(days))
}
