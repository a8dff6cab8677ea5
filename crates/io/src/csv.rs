// CSV/TSV sheet import (bank ledger and R2D exports)

use std::io::Read;
use std::path::Path;

use r2d_recon::{Cell, RawSheet};

/// Read a delimited text file as a sheet. The first record is the header row.
///
/// The delimiter is sniffed from the first lines; non-UTF-8 files are
/// decoded as Windows-1252.
pub fn read_sheet(path: &Path, name: &str) -> Result<RawSheet, String> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    sheet_from_string(&content, delimiter, name)
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Consistent lines times field count; wider wins ties
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            log::warn!("{} is not valid UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn sheet_from_string(content: &str, delimiter: u8, name: &str) -> Result<RawSheet, String> {
    // Chase exports carry a trailing comma on data rows only.
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(first) => first
            .map_err(|e| format!("{}: {}", name, e))?
            .iter()
            .map(|h| h.to_string())
            .collect(),
        None => Vec::new(),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| format!("{}: {}", name, e))?;
        rows.push(record.iter().map(Cell::from).collect());
    }

    log::debug!(
        "csv '{}': delimiter {:?}, {} column(s), {} data row(s)",
        name,
        delimiter as char,
        headers.len(),
        rows.len()
    );

    Ok(RawSheet { name: name.to_string(), headers, rows })
}
