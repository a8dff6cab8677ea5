// JSON export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use r2d_recon::ReconReport;

/// Export the full report (result sets, rejections, summary) as pretty JSON.
pub fn export_report(report: &ReconReport, path: &Path) -> Result<(), String> {
    let file = File::create(path)
        .map_err(|e| format!("Failed to create '{}': {}", path.display(), e))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(|e| e.to_string())?;

    log::info!("wrote {}", path.display());
    Ok(())
}

/// Render the report as a pretty JSON string.
pub fn report_to_string(report: &ReconReport) -> Result<String, String> {
    serde_json::to_string_pretty(report).map_err(|e| e.to_string())
}
