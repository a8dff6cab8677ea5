//! `r2d run` and `r2d validate`: Repayments-to-Date vs. Chase reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use r2d_recon::config::MatchDirection;
use r2d_recon::model::Classification;
use r2d_recon::normalize::parse_amount_cents;
use r2d_recon::{ReconConfig, ReconError, ReconInput, ReconReport};

use crate::exit_codes::{
    recon_exit_code, EXIT_IO, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_REJECTED_ROWS, EXIT_RECON_RUNTIME,
};
use crate::CliError;

/// Prefix of the default output workbook name; the run date is appended.
const DEFAULT_OUTPUT_PREFIX: &str = "Repayments_to_Date_recon";

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile a Repayments-to-Date sheet against a Chase export
    #[command(after_help = "\
Examples:
  r2d run ledger.xlsx
  r2d run ledger.xlsx --cutoff 2024-01-01 --tolerance 0.01
  r2d run ledger.xlsx --config monthly.toml --out recon.xlsx --json-out recon.json
  r2d run --r2d-csv repayments.csv --chase-csv chase.csv --json")]
    Run {
        /// Workbook holding both sheets (xlsx, xls, xlsb, ods)
        #[arg(
            required_unless_present_all = ["r2d_csv", "chase_csv"],
            conflicts_with_all = ["r2d_csv", "chase_csv"]
        )]
        workbook: Option<PathBuf>,

        /// Repayments-to-Date sheet exported as CSV (instead of a workbook)
        #[arg(long, requires = "chase_csv")]
        r2d_csv: Option<PathBuf>,

        /// Chase ledger exported as CSV (instead of a workbook)
        #[arg(long, requires = "r2d_csv")]
        chase_csv: Option<PathBuf>,

        /// TOML config file (sheet names, column mapping, tolerances)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Name of the Repayments-to-Date sheet
        #[arg(long)]
        r2d_sheet: Option<String>,

        /// Name of the Chase sheet
        #[arg(long)]
        chase_sheet: Option<String>,

        /// Ignore Chase debits posted before this date (YYYY-MM-DD)
        #[arg(long, alias = "ignore-debits-before")]
        cutoff: Option<String>,

        /// Amount tolerance in currency units (e.g. 0.01)
        #[arg(long)]
        tolerance: Option<String>,

        /// Which Chase side may settle a repayment: any, debit, credit
        #[arg(long)]
        direction: Option<MatchDirection>,

        /// Output workbook [default: Repayments_to_Date_recon-YYYY-MM-DD.xlsx]
        #[arg(long, short = 'o')]
        out: Option<PathBuf>,

        /// Print the JSON report to stdout
        #[arg(long)]
        json: bool,

        /// Also write the JSON report to a file
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Suppress the human summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,

        /// Exit 63 when any row was rejected (outputs are still written)
        #[arg(long)]
        strict: bool,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  r2d validate monthly.toml")]
    Validate {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            workbook,
            r2d_csv,
            chase_csv,
            config,
            r2d_sheet,
            chase_sheet,
            cutoff,
            tolerance,
            direction,
            out,
            json,
            json_out,
            quiet,
            strict,
        } => {
            let source = match (workbook, r2d_csv, chase_csv) {
                (Some(path), None, None) => InputSource::Workbook(path),
                (None, Some(r2d), Some(chase)) => InputSource::Csv { r2d, chase },
                _ => {
                    return Err(CliError::args(
                        "give either a workbook or both --r2d-csv and --chase-csv",
                    ))
                }
            };
            let overrides = Overrides { r2d_sheet, chase_sheet, cutoff, tolerance, direction };
            let output = OutputOptions {
                out: out.unwrap_or_else(default_output_path),
                json,
                json_out,
                quiet,
                strict,
            };
            cmd_recon_run(source, config, overrides, output)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
    }
}

enum InputSource {
    Workbook(PathBuf),
    Csv { r2d: PathBuf, chase: PathBuf },
}

/// Command-line values that win over the config file.
#[derive(Default)]
struct Overrides {
    r2d_sheet: Option<String>,
    chase_sheet: Option<String>,
    cutoff: Option<String>,
    tolerance: Option<String>,
    direction: Option<MatchDirection>,
}

struct OutputOptions {
    out: PathBuf,
    json: bool,
    json_out: Option<PathBuf>,
    quiet: bool,
    strict: bool,
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

fn engine_err(err: ReconError) -> CliError {
    let hint = match &err {
        ReconError::Schema { .. } => {
            Some("map column names in the config's [repayment_columns] / [transaction_columns]")
        }
        ReconError::Configuration { field, .. } if field == "cutoff" => {
            Some("dates are ISO formatted, e.g. --cutoff 2024-01-01")
        }
        _ => None,
    };
    CliError {
        code: recon_exit_code(&err),
        message: err.to_string(),
        hint: hint.map(String::from),
    }
}

fn default_output_path() -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    PathBuf::from(format!("{DEFAULT_OUTPUT_PREFIX}-{today}.xlsx"))
}

fn load_config(path: Option<&Path>) -> Result<ReconConfig, CliError> {
    match path {
        None => Ok(ReconConfig::default()),
        Some(path) => {
            let config_str = std::fs::read_to_string(path).map_err(|e| {
                recon_err(EXIT_IO, format!("cannot read config {}: {e}", path.display()))
            })?;
            ReconConfig::from_toml(&config_str).map_err(engine_err)
        }
    }
}

fn apply_overrides(config: &mut ReconConfig, overrides: Overrides) -> Result<(), CliError> {
    if let Some(name) = overrides.r2d_sheet {
        config.sheets.repayments = name;
    }
    if let Some(name) = overrides.chase_sheet {
        config.sheets.transactions = name;
    }
    if let Some(cutoff) = overrides.cutoff {
        config.cutoff = Some(cutoff);
    }
    if let Some(raw) = overrides.tolerance {
        let cents = parse_amount_cents(&raw).ok_or_else(|| {
            recon_err(EXIT_RECON_INVALID_CONFIG, format!("invalid --tolerance \"{raw}\""))
                .with_hint("tolerance is in currency units, e.g. --tolerance 0.01")
        })?;
        config.tolerance.amount_cents = cents;
    }
    if let Some(direction) = overrides.direction {
        config.match_direction = direction;
    }
    config.validate().map_err(engine_err)
}

fn load_input(source: &InputSource, config: &ReconConfig) -> Result<ReconInput, CliError> {
    match source {
        InputSource::Workbook(path) => {
            r2d_io::xlsx::read_input(path, &config.sheets).map_err(|e| {
                let err = recon_err(EXIT_IO, e);
                if err.message.starts_with("Sheet '") {
                    err.with_hint("pick other sheets with --r2d-sheet / --chase-sheet")
                } else {
                    err
                }
            })
        }
        InputSource::Csv { r2d, chase } => {
            let repayments = r2d_io::csv::read_sheet(r2d, &config.sheets.repayments)
                .map_err(|e| recon_err(EXIT_IO, e))?;
            let transactions = r2d_io::csv::read_sheet(chase, &config.sheets.transactions)
                .map_err(|e| recon_err(EXIT_IO, e))?;
            Ok(ReconInput { repayments, transactions })
        }
    }
}

fn cmd_recon_run(
    source: InputSource,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    output: OutputOptions,
) -> Result<(), CliError> {
    let mut config = load_config(config_path.as_deref())?;
    apply_overrides(&mut config, overrides)?;
    log::debug!("resolved config: {:?}", config);

    let input = load_input(&source, &config)?;
    let report = r2d_recon::run(&config, &input).map_err(engine_err)?;

    r2d_io::xlsx::export_report(&report, &output.out).map_err(|e| recon_err(EXIT_IO, e))?;

    if let Some(ref path) = output.json_out {
        r2d_io::json::export_report(&report, path).map_err(|e| recon_err(EXIT_IO, e))?;
    }

    if output.json {
        let json_str = r2d_io::json::report_to_string(&report)
            .map_err(|e| recon_err(EXIT_RECON_RUNTIME, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    if !output.quiet {
        print_summary(&report);
        eprintln!("wrote {}", output.out.display());
        if let Some(ref path) = output.json_out {
            eprintln!("wrote {}", path.display());
        }
    }

    let rejected = report.summary.rejected_count();
    if output.strict && rejected > 0 {
        return Err(recon_err(
            EXIT_RECON_REJECTED_ROWS,
            format!("{rejected} row(s) rejected (--strict)"),
        ));
    }

    Ok(())
}

/// Human summary to stderr.
fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    eprintln!("recon '{}'", report.meta.config_name);
    eprintln!(
        "R2D:   {} row(s) ({})",
        s.repayments_read, report.meta.repayments_sheet
    );
    eprintln!(
        "Chase: {} row(s) ({})",
        s.transactions_read, report.meta.transactions_sheet
    );
    for classification in Classification::ALL {
        let total = s.total(classification);
        eprintln!(
            "{}: {} ({})",
            classification,
            total.count,
            format_cents(total.amount_cents)
        );
    }
    if s.filtered.count > 0 {
        let before = s.cutoff.map(|d| format!(" before {d}")).unwrap_or_default();
        eprintln!(
            "filtered: {} debit(s){} ({})",
            s.filtered.count,
            before,
            format_cents(s.filtered.amount_cents)
        );
    }
    if s.flagged > 0 {
        eprintln!("flagged for review: {}", s.flagged);
    }

    let rejected = s.rejected_count();
    if rejected > 0 {
        let reasons: Vec<String> = s
            .rejected
            .iter()
            .filter(|r| r.count > 0)
            .map(|r| format!("{} {}", r.count, r.reason))
            .collect();
        eprintln!("note: {} rows skipped ({})", rejected, reasons.join(", "));
    }
}

/// `$1,234.56` / `-$0.05`.
fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let whole = (abs / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{sign}${grouped}.{:02}", abs % 100)
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&config_path))?;

    let cutoff = config
        .cutoff_date()
        .map_err(engine_err)?
        .map(|d| d.to_string())
        .unwrap_or_else(|| "none".into());
    eprintln!(
        "valid: '{}' reading '{}' / '{}', tolerance {} cent(s), date window {} day(s), cutoff {}, direction {}",
        config.name,
        config.sheets.repayments,
        config.sheets.transactions,
        config.tolerance.amount_cents,
        config.tolerance.date_window_days,
        cutoff,
        config.match_direction,
    );
    Ok(())
}
