use crate::model::{ApplyLog, ApplyLogEntry, ApplyStatus, DerivationReport, DerivationResult};

mod backup;
mod failure;
mod run;
#[cfg(test)]
mod tests;

pub use run::{ApplyOptions, apply_derivations, run};

use backup::*;
use failure::*;
