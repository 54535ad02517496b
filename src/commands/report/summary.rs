use tracing::info;

use super::*;
use crate::cli::RunMode;
use crate::util::percent_of;

/// Console summary; also the reference output the full report must reproduce.
pub fn summary_lines(totals: &ReportTotals) -> Vec<String> {
    let mut lines = vec![format!(
        "structure: {} of {} recipes defective ({:.1}%)",
        totals.defective_records, totals.total_recipes, totals.defective_percent
    )];

    for (kind, count) in &totals.by_corruption_type {
        lines.push(format!("  {kind}: {count}"));
    }

    match &totals.matching {
        Some(matching) => lines.push(format!(
            "matching: {} compared, perfect={} high={} medium={} low={} extraction_error={} ({} without relations)",
            matching.records_compared,
            matching.buckets.perfect,
            matching.buckets.high,
            matching.buckets.medium,
            matching.buckets.low,
            matching.buckets.extraction_error,
            matching.records_without_relations
        )),
        None => lines.push("matching: not run".to_string()),
    }

    match &totals.derivation {
        Some(derivation) => lines.push(format!(
            "derivation: {} candidates, {} derived, {} failed, {} high confidence, {} need review",
            derivation.candidates,
            derivation.derived,
            derivation.failed,
            derivation.high_confidence,
            derivation.needs_review
        )),
        None => lines.push("derivation: not run".to_string()),
    }

    match &totals.apply {
        Some(apply) => lines.push(format!(
            "apply ({}): {} total, {} {}, {} skipped, {} errors, backup {}",
            apply.mode,
            apply.total_fixes,
            apply.applied_fixes,
            apply_verb(apply),
            apply.skipped_fixes,
            apply.errors,
            if apply.backup_created { "created" } else { "not created" }
        )),
        None => lines.push("apply: not run".to_string()),
    }

    lines.push(format!("manual review rows: {}", totals.manual_review_rows));
    lines
}

/// A dry run writes nothing, so its passing fixes are only candidates.
fn apply_verb(apply: &ApplyTotals) -> &'static str {
    if apply.mode == RunMode::DryRun.as_str() {
        "would apply"
    } else {
        "applied"
    }
}

pub fn log_console_summary(totals: &ReportTotals) {
    for line in summary_lines(totals) {
        info!("{line}");
    }
}

pub fn render_executive_summary(report: &FullReport) -> String {
    let totals = &report.totals;
    let total = totals.total_recipes;
    let mut out = String::new();

    out.push_str("# Recipe Corpus QA Executive Summary\n\n");
    out.push_str(&format!("Generated: {}\n\n", report.generated_at));
    out.push_str(&format!("Total recipes: {total}\n\n"));

    out.push_str("## Structural Integrity\n\n");
    out.push_str(&format!(
        "- Defective records: {} ({:.1}%)\n",
        totals.defective_records, totals.defective_percent
    ));
    for (kind, count) in &totals.by_corruption_type {
        out.push_str(&format!("- {kind}: {count} ({:.1}%)\n", percent_of(*count, total)));
    }
    for (severity, count) in &totals.by_severity {
        out.push_str(&format!("- severity {severity}: {count}\n"));
    }
    out.push('\n');

    out.push_str("## Ingredient Matching\n\n");
    match &totals.matching {
        Some(matching) => {
            let buckets = &matching.buckets;
            for (label, count) in [
                ("perfect", buckets.perfect),
                ("high", buckets.high),
                ("medium", buckets.medium),
                ("low", buckets.low),
                ("extraction_error", buckets.extraction_error),
            ] {
                out.push_str(&format!("- {label}: {count} ({:.1}%)\n", percent_of(count, total)));
            }
            out.push_str(&format!(
                "- records without relations: {}\n",
                matching.records_without_relations
            ));
        }
        None => out.push_str("Not run.\n"),
    }
    out.push('\n');

    out.push_str("## Ingredient Derivation\n\n");
    match &totals.derivation {
        Some(derivation) => {
            out.push_str(&format!("- candidates: {}\n", derivation.candidates));
            out.push_str(&format!("- derived: {}\n", derivation.derived));
            out.push_str(&format!("- failed: {}\n", derivation.failed));
            out.push_str(&format!(
                "- high confidence (>= {:.2}): {}\n",
                report.high_confidence_cutoff, derivation.high_confidence
            ));
            out.push_str(&format!("- needs review: {}\n", derivation.needs_review));
        }
        None => out.push_str("Not run.\n"),
    }
    out.push('\n');

    out.push_str("## Applied Fixes\n\n");
    match &totals.apply {
        Some(apply) => {
            out.push_str(&format!("- mode: {}\n", apply.mode));
            out.push_str(&format!(
                "- {}: {} ({:.1}% of corpus)\n",
                apply_verb(apply),
                apply.applied_fixes,
                apply.applied_percent
            ));
            out.push_str(&format!("- skipped: {}\n", apply.skipped_fixes));
            out.push_str(&format!("- errors: {}\n", apply.errors));
            out.push_str(&format!(
                "- backup created: {}\n",
                if apply.backup_created { "yes" } else { "no" }
            ));
        }
        None => out.push_str("Not run.\n"),
    }
    out.push('\n');

    out.push_str(&format!(
        "Manual review rows: {}\n",
        totals.manual_review_rows
    ));
    out
}
