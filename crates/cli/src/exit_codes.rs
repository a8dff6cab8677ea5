//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 2       | Universal  | CLI usage error (bad args, missing flags)    |
//! | 3       | Universal  | I/O error (unreadable input, unwritable out) |
//! | 60-69   | recon      | Reconciliation codes                         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use r2d_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, conflicting or missing options.
pub const EXIT_USAGE: u8 = 2;

/// I/O error - input workbook/CSV unreadable, sheet missing, output unwritable.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Config file failed to parse or validate (bad TOML, negative tolerance,
/// unparsable cutoff).
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// A sheet is missing one or more required columns.
pub const EXIT_RECON_SCHEMA: u8 = 61;

/// Runtime failure after inputs loaded (serialization error).
pub const EXIT_RECON_RUNTIME: u8 = 62;

/// `--strict` and at least one row was rejected. Outputs are still written.
pub const EXIT_RECON_REJECTED_ROWS: u8 = 63;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::Configuration { .. } => EXIT_RECON_INVALID_CONFIG,
        ReconError::Schema { .. } => EXIT_RECON_SCHEMA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_recon_range() {
        let parse = ReconError::ConfigParse("expected `=`".into());
        let config = ReconError::Configuration { field: "cutoff".into(), message: "bad".into() };
        let schema = ReconError::Schema { sheet: "Chase".into(), missing: vec!["Amount".into()] };
        assert_eq!(recon_exit_code(&parse), EXIT_RECON_INVALID_CONFIG);
        assert_eq!(recon_exit_code(&config), EXIT_RECON_INVALID_CONFIG);
        assert_eq!(recon_exit_code(&schema), EXIT_RECON_SCHEMA);
    }

    #[test]
    fn codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_RECON_INVALID_CONFIG,
            EXIT_RECON_SCHEMA,
            EXIT_RECON_RUNTIME,
            EXIT_RECON_REJECTED_ROWS,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
