use crate::model::{ApplyLog, DerivationReport, ExtractionReport, MatchBucket, StructureReport};

mod review;
mod run;
mod summary;
mod totals;
#[cfg(test)]
mod tests;

pub use run::{ReportBundle, aggregate, run, write_report_artifacts};
pub use summary::log_console_summary;

use review::*;
use summary::*;
use totals::*;
