use crate::config::AuditConfig;
use crate::model::{CorpusRecipe, CorruptionType, IssueType, QaFinding, Severity};

mod fields;
mod scan;
#[cfg(test)]
mod tests;

pub use fields::{FieldDefect, classify_field};
pub use scan::{audit_corpus, run};

#[cfg(test)]
use scan::scan;
