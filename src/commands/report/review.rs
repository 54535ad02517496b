use std::collections::HashMap;

use serde::Serialize;

use super::*;
use super::totals::needs_review;
use crate::model::{IssueType, Severity};

const CSV_HEADER: [&str; 7] = [
    "recipe_id",
    "recipe_name",
    "issue_type",
    "severity",
    "confidence",
    "status",
    "notes",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualReviewRow {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub issue_type: String,
    pub severity: String,
    pub confidence: Option<f64>,
    pub status: String,
    pub notes: String,
}

pub fn manual_review_rows(
    structure: &StructureReport,
    extraction: Option<&ExtractionReport>,
    derivation: Option<&DerivationReport>,
    high_confidence_cutoff: f64,
) -> Vec<ManualReviewRow> {
    let mut rows = structure
        .findings
        .iter()
        .map(|finding| ManualReviewRow {
            recipe_id: finding.recipe_id,
            recipe_name: finding.recipe_name.clone(),
            issue_type: finding.issue_type.as_str().to_string(),
            severity: finding.severity.as_str().to_string(),
            confidence: None,
            status: "detected".to_string(),
            notes: finding.details.clone(),
        })
        .collect::<Vec<ManualReviewRow>>();

    let severity_by_id = structure
        .findings
        .iter()
        .map(|finding| (finding.recipe_id, finding.severity))
        .collect::<HashMap<i64, Severity>>();

    if let Some(derivation) = derivation {
        for result in &derivation.results {
            if !needs_review(result.confidence, high_confidence_cutoff) {
                continue;
            }
            rows.push(ManualReviewRow {
                recipe_id: result.recipe_id,
                recipe_name: result.recipe_name.clone(),
                issue_type: IssueType::MissingIngredients.as_str().to_string(),
                severity: severity_by_id
                    .get(&result.recipe_id)
                    .copied()
                    .unwrap_or(Severity::Medium)
                    .as_str()
                    .to_string(),
                confidence: Some(result.confidence),
                status: "needs_review".to_string(),
                notes: result.validation_notes.join("; "),
            });
        }
    }

    if let Some(extraction) = extraction {
        for result in extraction.results.iter().filter(|r| r.bucket == MatchBucket::Low) {
            rows.push(ManualReviewRow {
                recipe_id: result.recipe_id,
                recipe_name: result.recipe_name.clone(),
                issue_type: IssueType::IngredientMismatch.as_str().to_string(),
                severity: Severity::Low.as_str().to_string(),
                confidence: result.match_ratio,
                status: "needs_review".to_string(),
                notes: format!(
                    "{} of {} ingredient lines matched a normalized relation",
                    result.matched_count, result.free_text_count
                ),
            });
        }
    }

    rows
}

pub fn render_csv(rows: &[ManualReviewRow]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');

    for row in rows {
        let fields = [
            row.recipe_id.to_string(),
            csv_field(&row.recipe_name),
            row.issue_type.clone(),
            row.severity.clone(),
            row.confidence.map(|value| format!("{value:.2}")).unwrap_or_default(),
            row.status.clone(),
            csv_field(&row.notes),
        ];
        out.push_str(&fields.join(","));
        out.push('\n');
    }

    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
