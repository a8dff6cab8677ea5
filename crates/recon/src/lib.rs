//! `r2d-recon`: Repayments-to-Date vs. bank ledger reconciliation engine.
//!
//! Pure engine crate: receives two pre-loaded sheets, returns classified
//! results and summary tables. No CLI or IO dependencies.

pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;

pub use config::ReconConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{Cell, RawSheet, ReconInput, ReconReport};
pub use report::{Table, TableValue};
