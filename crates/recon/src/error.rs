use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Invalid configuration value (negative tolerance, bad cutoff, etc.).
    Configuration { field: String, message: String },
    /// Required columns missing from an input sheet.
    Schema { sheet: String, missing: Vec<String> },
}

impl ReconError {
    pub(crate) fn config(field: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::Configuration { field, message } => {
                write!(f, "invalid configuration '{field}': {message}")
            }
            Self::Schema { sheet, missing } => {
                let cols: Vec<String> = missing.iter().map(|c| format!("'{c}'")).collect();
                write!(
                    f,
                    "sheet '{sheet}': missing required column{} {}",
                    if missing.len() == 1 { "" } else { "s" },
                    cols.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for ReconError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_names_every_column() {
        let err = ReconError::Schema {
            sheet: "Chase".into(),
            missing: vec!["Amount".into(), "Posting Date".into()],
        };
        assert_eq!(
            err.to_string(),
            "sheet 'Chase': missing required columns 'Amount', 'Posting Date'"
        );
    }

    #[test]
    fn configuration_error_names_field() {
        let err = ReconError::config("tolerance.amount_cents", "must not be negative, got -1");
        assert!(err.to_string().contains("'tolerance.amount_cents'"));
    }
}
