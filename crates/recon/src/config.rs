use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything a reconciliation run needs besides the two input sheets.
///
/// Every field has a default, so an empty TOML document is a valid config
/// that reads the "Repayments to Date" and "Chase" sheets with the column
/// names of the standard exports.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub sheets: SheetNames,
    #[serde(default)]
    pub repayment_columns: RepaymentColumns,
    #[serde(default)]
    pub transaction_columns: TransactionColumns,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub match_direction: MatchDirection,
    /// ISO date; debits posted strictly before it are filtered out.
    #[serde(default)]
    pub cutoff: Option<String>,
}

fn default_name() -> String {
    "R2D reconciliation".into()
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            sheets: SheetNames::default(),
            repayment_columns: RepaymentColumns::default(),
            transaction_columns: TransactionColumns::default(),
            tolerance: ToleranceConfig::default(),
            match_direction: MatchDirection::default(),
            cutoff: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sheets + column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SheetNames {
    pub repayments: String,
    pub transactions: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            repayments: "Repayments to Date".into(),
            transactions: "Chase".into(),
        }
    }
}

/// Header names bound to [`crate::model::RepaymentRecord`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepaymentColumns {
    pub id: String,
    pub amount: String,
    pub date: String,
    /// Used when the primary date cell is empty.
    pub fallback_date: Option<String>,
    pub description: Option<String>,
}

impl Default for RepaymentColumns {
    fn default() -> Self {
        Self {
            id: "ACH ID".into(),
            amount: "Amount Transferred".into(),
            date: "Likely Arrived Date".into(),
            fallback_date: Some("Transfer Initiated Date".into()),
            description: Some("Recipient Name".into()),
        }
    }
}

/// Header names bound to [`crate::model::TransactionRecord`] fields.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransactionColumns {
    pub reference: Option<String>,
    pub amount: String,
    pub date: String,
    pub description: Option<String>,
}

impl Default for TransactionColumns {
    fn default() -> Self {
        Self {
            reference: None,
            amount: "Amount".into(),
            date: "Posting Date".into(),
            description: Some("Description".into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance + direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToleranceConfig {
    /// Maximum amount deviation, in minor currency units.
    pub amount_cents: i64,
    /// Day difference still counted as an exact match.
    pub date_window_days: i64,
    /// Candidates further apart than this are never paired. `None` = no limit.
    pub max_date_window_days: Option<i64>,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount_cents: 1,
            date_window_days: 5,
            max_date_window_days: None,
        }
    }
}

/// Which side of the bank ledger may satisfy a repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchDirection {
    #[default]
    Any,
    Debit,
    Credit,
}

impl MatchDirection {
    pub fn admits(self, amount_cents: i64) -> bool {
        match self {
            Self::Any => true,
            Self::Debit => amount_cents < 0,
            Self::Credit => amount_cents > 0,
        }
    }
}

impl std::str::FromStr for MatchDirection {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(ReconError::config(
                "match_direction",
                format!("expected \"any\", \"debit\" or \"credit\", got \"{other}\""),
            )),
        }
    }
}

impl std::fmt::Display for MatchDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Debit => write!(f, "debit"),
            Self::Credit => write!(f, "credit"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let tol = &self.tolerance;
        if tol.amount_cents < 0 {
            return Err(ReconError::config(
                "tolerance.amount_cents",
                format!("must not be negative, got {}", tol.amount_cents),
            ));
        }
        if tol.date_window_days < 0 {
            return Err(ReconError::config(
                "tolerance.date_window_days",
                format!("must not be negative, got {}", tol.date_window_days),
            ));
        }
        if let Some(max) = tol.max_date_window_days {
            if max < 0 {
                return Err(ReconError::config(
                    "tolerance.max_date_window_days",
                    format!("must not be negative, got {max}"),
                ));
            }
        }

        let required = [
            ("repayment_columns.id", &self.repayment_columns.id),
            ("repayment_columns.amount", &self.repayment_columns.amount),
            ("repayment_columns.date", &self.repayment_columns.date),
            ("transaction_columns.amount", &self.transaction_columns.amount),
            ("transaction_columns.date", &self.transaction_columns.date),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ReconError::config(field, "column name must not be empty"));
            }
        }

        self.cutoff_date()?;
        Ok(())
    }

    /// The parsed cutoff, if one is configured.
    pub fn cutoff_date(&self) -> Result<Option<NaiveDate>, ReconError> {
        match self.cutoff.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    ReconError::config("cutoff", format!("expected YYYY-MM-DD, got \"{raw}\""))
                }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
