use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::*;
use crate::model::MatchBucketCounts;
use crate::util::percent_of;

/// Every phase artifact embedded verbatim, plus totals recomputable from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub run_id: String,
    pub generated_at: String,
    pub high_confidence_cutoff: f64,
    pub totals: ReportTotals,
    pub structure: StructureReport,
    pub extraction: Option<ExtractionReport>,
    pub derivation: Option<DerivationReport>,
    pub apply_log: Option<ApplyLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTotals {
    pub total_recipes: usize,
    pub defective_records: usize,
    pub defective_percent: f64,
    pub by_corruption_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub matching: Option<MatchTotals>,
    pub derivation: Option<DerivationTotals>,
    pub apply: Option<ApplyTotals>,
    pub manual_review_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchTotals {
    pub records_compared: usize,
    pub records_without_relations: usize,
    pub buckets: MatchBucketCounts,
    pub low_match_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationTotals {
    pub candidates: usize,
    pub derived: usize,
    pub failed: usize,
    pub high_confidence: usize,
    pub needs_review: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyTotals {
    pub mode: String,
    pub total_fixes: usize,
    pub applied_fixes: usize,
    pub skipped_fixes: usize,
    pub errors: usize,
    pub backup_created: bool,
    pub applied_percent: f64,
}

impl ReportTotals {
    pub fn compute(
        structure: &StructureReport,
        extraction: Option<&ExtractionReport>,
        derivation: Option<&DerivationReport>,
        apply_log: Option<&ApplyLog>,
        high_confidence_cutoff: f64,
    ) -> Self {
        let total = structure.total_recipes;

        let matching = extraction.map(|report| MatchTotals {
            records_compared: report.records_compared,
            records_without_relations: report.records_without_relations,
            buckets: report.buckets.clone(),
            low_match_percent: percent_of(report.buckets.low, total),
        });

        let derivation_totals = derivation.map(|report| DerivationTotals {
            candidates: report.candidates,
            derived: report.derived,
            failed: report.failed,
            high_confidence: report.high_confidence,
            needs_review: report
                .results
                .iter()
                .filter(|result| needs_review(result.confidence, high_confidence_cutoff))
                .count(),
        });

        let apply = apply_log.map(|log| ApplyTotals {
            mode: log.mode.clone(),
            total_fixes: log.total_fixes,
            applied_fixes: log.applied_fixes,
            skipped_fixes: log.skipped_fixes,
            errors: log.errors,
            backup_created: log.backup_created,
            applied_percent: percent_of(log.applied_fixes, total),
        });

        let low_matches = extraction
            .map(|report| {
                report
                    .results
                    .iter()
                    .filter(|result| result.bucket == MatchBucket::Low)
                    .count()
            })
            .unwrap_or(0);

        Self {
            total_recipes: total,
            defective_records: structure.summary.defective_records,
            defective_percent: percent_of(structure.summary.defective_records, total),
            by_corruption_type: structure.summary.by_corruption_type.clone(),
            by_severity: structure.summary.by_severity.clone(),
            manual_review_rows: structure.findings.len()
                + derivation_totals.as_ref().map(|d| d.needs_review).unwrap_or(0)
                + low_matches,
            matching,
            derivation: derivation_totals,
            apply,
        }
    }

    #[cfg(test)]
    pub fn from_full_report(report: &FullReport) -> Self {
        Self::compute(
            &report.structure,
            report.extraction.as_ref(),
            report.derivation.as_ref(),
            report.apply_log.as_ref(),
            report.high_confidence_cutoff,
        )
    }
}

pub(super) fn needs_review(confidence: f64, high_confidence_cutoff: f64) -> bool {
    confidence > 0.0 && confidence < high_confidence_cutoff
}
