// Ads performance report engine.
//
// Rows from spreadsheet exports or API dumps are aggregated per period,
// compared against the previous period, classified by a rule engine and
// turned into a renderer-ready view model.

pub mod aggregate;
pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod insights;
pub mod loader;
pub mod metrics;
pub mod output;
pub mod period;
pub mod pipeline;
pub mod reports;
pub mod types;
pub mod util;

pub use error::{ReportError, Result};
