// Excel workbook input (xlsx, xls, xlsb, ods) and report export (xlsx only)
//
// Input: the first row of a sheet's used range is its header row.
// Export: one worksheet per report table, values typed so money and dates
//         stay numeric in Excel.

use std::io::{Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;
use r2d_recon::config::SheetNames;
use r2d_recon::normalize::{excel_serial_to_date, parse_date};
use r2d_recon::{Cell, RawSheet, ReconInput, ReconReport, Table, TableValue};
use rust_xlsxwriter::{Format, Workbook, Worksheet};

const MONEY_FORMAT: &str = "$#,##0.00";
const DATE_FORMAT: &str = "yyyy-mm-dd";
const MAX_COLUMN_WIDTH: usize = 60;

/// Read one named sheet from a workbook.
pub fn read_sheet(path: &Path, name: &str) -> Result<RawSheet, String> {
    let mut workbook = open(path)?;
    load_sheet(&mut workbook, name)
}

/// Read both reconciliation sheets from a single workbook.
pub fn read_input(path: &Path, sheets: &SheetNames) -> Result<ReconInput, String> {
    let mut workbook = open(path)?;
    let repayments = load_sheet(&mut workbook, &sheets.repayments)?;
    let transactions = load_sheet(&mut workbook, &sheets.transactions)?;
    Ok(ReconInput { repayments, transactions })
}

/// Names of all sheets in a workbook, in workbook order.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, String> {
    let workbook = open(path)?;
    Ok(workbook.sheet_names().to_vec())
}

fn open(path: &Path) -> Result<Sheets<std::io::BufReader<std::fs::File>>, String> {
    open_workbook_auto(path).map_err(|e| format!("Failed to open workbook '{}': {}", path.display(), e))
}

fn load_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, name: &str) -> Result<RawSheet, String> {
    let available: Vec<String> = workbook.sheet_names().to_vec();
    if !available.iter().any(|s| s == name) {
        return Err(format!(
            "Sheet '{}' not found (available: {})",
            name,
            available.join(", ")
        ));
    }

    let range = workbook
        .worksheet_range(name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(|d| data_to_cell(d).to_text()).collect(),
        None => Vec::new(),
    };
    let rows: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(data_to_cell).collect()).collect();

    log::debug!("sheet '{}': {} column(s), {} data row(s)", name, headers.len(), rows.len());

    Ok(RawSheet { name: name.to_string(), headers, rows })
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        // 1900 date system assumed; 1904 workbooks are rare for bank exports
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            match excel_serial_to_date(serial) {
                Some(date) => Cell::Date(date),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => match parse_date(s) {
            Some(date) => Cell::Date(date),
            None => Cell::Text(s.clone()),
        },
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

// ============================================================================
// Export
// ============================================================================

/// Write every report table to its own worksheet.
pub fn export_report(report: &ReconReport, path: &Path) -> Result<(), String> {
    let mut workbook = Workbook::new();

    let header_format = Format::new().set_bold();
    let money_format = Format::new().set_num_format(MONEY_FORMAT);
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    for table in report.tables() {
        let worksheet = workbook
            .add_worksheet()
            .set_name(table.name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", table.name, e))?;
        write_table(worksheet, &table, &header_format, &money_format, &date_format)?;
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    log::info!("wrote {}", path.display());
    Ok(())
}

fn write_table(
    worksheet: &mut Worksheet,
    table: &Table,
    header_format: &Format,
    money_format: &Format,
    date_format: &Format,
) -> Result<(), String> {
    let err = |e: rust_xlsxwriter::XlsxError| format!("Failed to write sheet '{}': {}", table.name, e);

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.len()).collect();

    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *name, header_format)
            .map_err(err)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let r = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let c = col as u16;
            let shown = match value {
                TableValue::Empty => 0,
                TableValue::Text(s) => {
                    worksheet.write_string(r, c, s).map_err(err)?;
                    s.chars().count()
                }
                TableValue::Money(cents) => {
                    worksheet
                        .write_number_with_format(r, c, *cents as f64 / 100.0, money_format)
                        .map_err(err)?;
                    money_width(*cents)
                }
                TableValue::Int(n) => {
                    worksheet.write_number(r, c, *n as f64).map_err(err)?;
                    n.to_string().len()
                }
                TableValue::Number(n) => {
                    worksheet.write_number(r, c, *n).map_err(err)?;
                    n.to_string().len()
                }
                TableValue::Date(d) => {
                    worksheet
                        .write_number_with_format(r, c, date_to_serial(*d), date_format)
                        .map_err(err)?;
                    DATE_FORMAT.len()
                }
            };
            if let Some(w) = widths.get_mut(col) {
                *w = (*w).max(shown);
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet
            .set_column_width(col as u16, (width + 2).min(MAX_COLUMN_WIDTH) as f64)
            .map_err(err)?;
    }
    worksheet.set_freeze_panes(1, 0).map_err(err)?;

    Ok(())
}

/// Excel 1900-system serial for a date (valid from 1900-03-01 on).
fn date_to_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// Display width of a cents value rendered as `$#,##0.00`.
fn money_width(cents: i64) -> usize {
    let digits = (cents.unsigned_abs() / 100).to_string().len();
    let separators = (digits - 1) / 3;
    let sign = usize::from(cents < 0);
    sign + 1 + digits + separators + 3
}
