use std::cell::RefCell;
use std::time::Duration;

use super::*;
use crate::collab::{CollaboratorError, ExtractedIngredient};
use crate::commands::audit::audit_corpus;
use crate::config::AuditConfig;
use crate::model::{CorruptionType, IngredientMatch, IssueType, MatchBucketCounts, QaFinding, Severity};
use crate::store::fixtures;

enum Reply {
    Recipe(f64),
    Nothing,
    Down,
}

struct ScriptedExtractor {
    reply: Reply,
    seen: RefCell<Vec<String>>,
}

impl ScriptedExtractor {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl RecipeExtractor for ScriptedExtractor {
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<ExtractionResponse>, CollaboratorError> {
        self.seen.borrow_mut().push(request.text.to_string());
        match self.reply {
            Reply::Recipe(confidence) => Ok(Some(ExtractionResponse {
                name: "Meatloaf".to_string(),
                description: None,
                ingredients: vec![
                    ExtractedIngredient {
                        name: "ground beef".to_string(),
                        amount: Some("2".to_string()),
                        unit: Some("lb".to_string()),
                        notes: None,
                    },
                    ExtractedIngredient {
                        name: "parsley".to_string(),
                        amount: None,
                        unit: None,
                        notes: Some("Optional garnish".to_string()),
                    },
                ],
                instructions: Vec::new(),
                confidence,
                validation_notes: vec!["inferred beef from step 1".to_string()],
            })),
            Reply::Nothing => Ok(None),
            Reply::Down => Err(CollaboratorError::Timeout {
                service: "extraction",
                secs: 30,
            }),
        }
    }
}

fn meatloaf() -> CorpusRecipe {
    CorpusRecipe {
        id: 7,
        name: "Meatloaf".to_string(),
        description: Some("Weeknight classic".to_string()),
        ingredients: Some("[]".to_string()),
        instructions: Some(r#"["Mix the beef with breadcrumbs.", "Bake for an hour."]"#.to_string()),
        chef_name: None,
        source_url: Some("https://example.com/meatloaf".to_string()),
        is_public: true,
        qa_status: "pending".to_string(),
        qa_confidence: None,
        qa_method: None,
        qa_notes: None,
        qa_issues_found: None,
        qa_fixes_applied: None,
        qa_timestamp: None,
    }
}

fn finding(recipe_id: i64, corruption_type: CorruptionType) -> QaFinding {
    QaFinding {
        recipe_id,
        recipe_name: format!("recipe {recipe_id}"),
        issue_type: IssueType::MissingIngredients,
        severity: Severity::High,
        corruption_type,
        details: String::new(),
        source: "unknown".to_string(),
        is_public: true,
        known_bad_name: false,
    }
}

fn structure(findings: Vec<QaFinding>) -> StructureReport {
    StructureReport {
        run_id: "structure-test".to_string(),
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        total_recipes: 10,
        summary: Default::default(),
        findings,
    }
}

fn low_match(recipe_id: i64) -> IngredientMatch {
    IngredientMatch {
        recipe_id,
        recipe_name: format!("recipe {recipe_id}"),
        free_text_count: 5,
        relation_count: 1,
        matched_count: 1,
        match_ratio: Some(0.2),
        bucket: MatchBucket::Low,
        unmatched_lines: Vec::new(),
        error: None,
    }
}

fn options() -> DeriveOptions {
    DeriveOptions {
        include_low_match: false,
        limit: None,
        delay: Duration::ZERO,
    }
}

#[test]
fn candidates_cover_missing_ingredients_and_optional_low_matches() {
    let structure = structure(vec![
        finding(1, CorruptionType::EmptyIngredients),
        finding(2, CorruptionType::EmptyInstructions),
        finding(3, CorruptionType::Both),
    ]);
    let extraction = ExtractionReport {
        run_id: "extraction-test".to_string(),
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        records_compared: 2,
        records_without_relations: 0,
        buckets: MatchBucketCounts::default(),
        results: vec![low_match(3), low_match(4)],
    };

    let ids = |candidates: Vec<Candidate>| candidates.iter().map(|c| c.recipe_id).collect::<Vec<i64>>();
    assert_eq!(ids(select_candidates(&structure, Some(&extraction), false)), vec![1, 3]);

    let with_low = select_candidates(&structure, Some(&extraction), true);
    assert_eq!(with_low.last().map(|c| c.reason), Some(CandidateReason::LowMatch));
    assert_eq!(ids(with_low), vec![1, 3, 4]);
}

#[test]
fn context_includes_instructions_and_fragments() {
    let mut recipe = meatloaf();
    recipe.ingredients = Some(r#"["2 lb beef", ""]"#.to_string());
    let text = build_context(&recipe);

    assert!(text.starts_with("Recipe: Meatloaf\n"));
    assert!(text.contains("Description: Weeknight classic"));
    assert!(text.contains("1. Mix the beef with breadcrumbs."));
    assert!(text.contains("2. Bake for an hour."));
    assert!(text.contains("- 2 lb beef"));
}

#[test]
fn confident_response_becomes_derivation() {
    let extractor = ScriptedExtractor::new(Reply::Recipe(0.93));
    let result = derive_one(&meatloaf(), &extractor, &ThresholdConfig::default());

    assert_eq!(result.confidence, 0.93);
    assert_eq!(result.derived_ingredients.len(), 2);
    assert_eq!(result.derived_ingredients[0].ingredient, "ground beef");
    assert_eq!(result.derived_ingredients[0].amount, "2");
    assert_eq!(result.derived_ingredients[0].unit, "lb");
    assert_eq!(result.derived_ingredients[0].optional, None);
    assert_eq!(result.derived_ingredients[1].optional, Some(true));
    assert!(result.original_ingredients.is_empty());
    assert!(extractor.seen.borrow()[0].contains("Bake for an hour."));
}

#[test]
fn out_of_range_confidence_is_clamped() {
    let extractor = ScriptedExtractor::new(Reply::Recipe(1.7));
    let result = derive_one(&meatloaf(), &extractor, &ThresholdConfig::default());
    assert_eq!(result.confidence, 1.0);
}

#[test]
fn unusable_responses_record_zero_confidence() {
    for reply in [Reply::Recipe(0.3), Reply::Nothing, Reply::Down] {
        let extractor = ScriptedExtractor::new(reply);
        let result = derive_one(&meatloaf(), &extractor, &ThresholdConfig::default());
        assert_eq!(result.confidence, 0.0);
        assert!(result.derived_ingredients.is_empty());
        assert_eq!(result.validation_notes.len(), 1);
    }
}

#[test]
fn derive_ingredients_keeps_totals_consistent_with_candidates() {
    let connection = fixtures::corpus();
    fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));
    fixtures::insert_recipe(&connection, "Stew", None, None);
    fixtures::insert_recipe(&connection, "Salad", Some(r#"["lettuce"]"#), Some(r#"["Toss."]"#));

    let mut structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    structure.findings.push(finding(999, CorruptionType::EmptyIngredients));

    let extractor = ScriptedExtractor::new(Reply::Recipe(0.95));
    let report = derive_ingredients(
        &connection,
        &structure,
        None,
        &extractor,
        &ThresholdConfig::default(),
        &options(),
    )
    .expect("derive");

    assert_eq!(report.candidates, 3);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.derived, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(report.high_confidence, 2);
    assert_eq!(extractor.seen.borrow().len(), 2);
    assert!(report.results.iter().all(|r| (0.0..=1.0).contains(&r.confidence)));
}

#[test]
fn limit_truncates_candidates() {
    let connection = fixtures::corpus();
    fixtures::insert_recipe(&connection, "A", Some("[]"), Some(r#"["Bake."]"#));
    fixtures::insert_recipe(&connection, "B", Some("[]"), Some(r#"["Bake."]"#));
    let structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");

    let extractor = ScriptedExtractor::new(Reply::Nothing);
    let mut options = options();
    options.limit = Some(1);
    let report = derive_ingredients(
        &connection,
        &structure,
        None,
        &extractor,
        &ThresholdConfig::default(),
        &options,
    )
    .expect("derive");

    assert_eq!(report.candidates, 1);
    assert_eq!(report.failed, 1);
}
