use std::collections::HashSet;

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateReason {
    MissingIngredients,
    LowMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub reason: CandidateReason,
}

/// Phase 1 records missing ingredients, then (optionally) Phase 2 low-match records, each id once.
pub fn select_candidates(
    structure: &StructureReport,
    extraction: Option<&ExtractionReport>,
    include_low_match: bool,
) -> Vec<Candidate> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for finding in &structure.findings {
        if finding.corruption_type.missing_ingredients() && seen.insert(finding.recipe_id) {
            out.push(Candidate {
                recipe_id: finding.recipe_id,
                recipe_name: finding.recipe_name.clone(),
                reason: CandidateReason::MissingIngredients,
            });
        }
    }

    if include_low_match {
        for result in extraction.map(|report| report.results.as_slice()).unwrap_or_default() {
            if result.bucket == MatchBucket::Low && seen.insert(result.recipe_id) {
                out.push(Candidate {
                    recipe_id: result.recipe_id,
                    recipe_name: result.recipe_name.clone(),
                    reason: CandidateReason::LowMatch,
                });
            }
        }
    }

    out
}
