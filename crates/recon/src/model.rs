use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A raw cell value as handed over by the spreadsheet layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// True for empty cells and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) | Self::Date(_) => false,
        }
    }

    /// Display form used for identifiers, descriptions and rejection values.
    pub fn to_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.trim().to_string(),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }
}

/// One loaded sheet: a header row followed by data rows.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    /// Build a sheet from string cells. Empty strings become [`Cell::Empty`].
    pub fn from_strings(name: &str, headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Cell::from(*v)).collect())
                .collect(),
        }
    }

    /// 1-based sheet row of a data row index (the header is row 1).
    pub fn sheet_row(index: usize) -> usize {
        index + 2
    }
}

/// The two sheets of one reconciliation request.
pub struct ReconInput {
    pub repayments: RawSheet,
    pub transactions: RawSheet,
}

// ---------------------------------------------------------------------------
// Normalized records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepaymentStatus {
    Open,
    Settled,
}

/// One expected repayment from the R2D sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepaymentRecord {
    pub row: usize,
    pub id: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub description: String,
    pub status: RepaymentStatus,
}

/// One bank-ledger line. Negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionRecord {
    pub row: usize,
    pub reference: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    pub description: String,
    pub filtered: bool,
}

impl TransactionRecord {
    pub fn is_debit(&self) -> bool {
        self.amount_cents < 0
    }

    pub fn magnitude_cents(&self) -> i64 {
        self.amount_cents.saturating_abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    InvalidAmount,
    InvalidDate,
    DuplicateId,
}

impl RejectReason {
    pub const ALL: [RejectReason; 3] = [Self::InvalidAmount, Self::InvalidDate, Self::DuplicateId];
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount => write!(f, "invalid-amount"),
            Self::InvalidDate => write!(f, "invalid-date"),
            Self::DuplicateId => write!(f, "duplicate-id"),
        }
    }
}

/// A data row that could not be normalized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowRejection {
    pub sheet: String,
    pub row: usize,
    pub reason: RejectReason,
    pub column: String,
    pub value: String,
}

// ---------------------------------------------------------------------------
// Pair matching
// ---------------------------------------------------------------------------

/// Matcher output as indices into the repayment and transaction slices.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PairMatchOutput {
    pub matched: Vec<(usize, usize)>,
    pub unmatched_repayments: Vec<usize>,
    pub unmatched_transactions: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Classification {
    MatchedExact,
    MatchedPartial,
    UnmatchedRepayment,
    UnmatchedTransaction,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Self::MatchedExact,
        Self::MatchedPartial,
        Self::UnmatchedRepayment,
        Self::UnmatchedTransaction,
    ];

    pub fn is_matched(self) -> bool {
        matches!(self, Self::MatchedExact | Self::MatchedPartial)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchedExact => write!(f, "matched-exact"),
            Self::MatchedPartial => write!(f, "matched-partial"),
            Self::UnmatchedRepayment => write!(f, "unmatched-repayment"),
            Self::UnmatchedTransaction => write!(f, "unmatched-transaction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscrepancyFlag {
    /// Amounts differ by a non-zero amount inside the tolerance.
    AmountRounding,
    /// Dates further apart than the exact-match window.
    DateDrift,
}

impl std::fmt::Display for DiscrepancyFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AmountRounding => write!(f, "amount-rounding"),
            Self::DateDrift => write!(f, "date-drift"),
        }
    }
}

/// Repayment minus transaction magnitude, and transaction date minus due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Delta {
    pub amount_cents: i64,
    pub days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repayment: Option<RepaymentRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<Delta>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<DiscrepancyFlag>,
    /// Matched pairs only: the bank description names a transfer rail.
    pub transfer_hint: bool,
    /// Matched pairs only, in `0.50..=0.99`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl MatchResult {
    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationTotal {
    pub classification: Classification,
    pub count: usize,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterStats {
    pub count: usize,
    pub amount_cents: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RejectionTotal {
    pub reason: RejectReason,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconSummary {
    pub repayments_read: usize,
    pub transactions_read: usize,
    pub classifications: Vec<ClassificationTotal>,
    pub flagged: usize,
    pub filtered: FilterStats,
    pub rejected: Vec<RejectionTotal>,
    pub tolerance_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<NaiveDate>,
}

impl ReconSummary {
    pub fn total(&self, classification: Classification) -> ClassificationTotal {
        self.classifications
            .iter()
            .copied()
            .find(|t| t.classification == classification)
            .unwrap_or(ClassificationTotal {
                classification,
                count: 0,
                amount_cents: 0,
            })
    }

    pub fn rejected_count(&self) -> usize {
        self.rejected.iter().map(|r| r.count).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub repayments_sheet: String,
    pub transactions_sheet: String,
}

/// Everything a run produces, grouped for the serialization layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub matched: Vec<MatchResult>,
    pub unmatched_repayments: Vec<MatchResult>,
    pub unmatched_transactions: Vec<MatchResult>,
    pub filtered: Vec<TransactionRecord>,
    pub rejected: Vec<RowRejection>,
}
