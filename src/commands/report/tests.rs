use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::RunMode;
use crate::commands::apply::{ApplyOptions, apply_derivations};
use crate::commands::audit::audit_corpus;
use crate::config::AuditConfig;
use crate::model::{DerivationResult, DerivedIngredient, IngredientMatch, MatchBucketCounts};
use crate::store::{self, fixtures};
use crate::util::read_json;

const CUTOFF: f64 = 0.90;

fn derivation(results: Vec<DerivationResult>) -> DerivationReport {
    let derived = results.iter().filter(|r| r.confidence > 0.0).count();
    DerivationReport {
        run_id: "derivation-test".to_string(),
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        candidates: results.len(),
        derived,
        failed: results.len() - derived,
        high_confidence: results.iter().filter(|r| r.confidence >= CUTOFF).count(),
        results,
    }
}

fn derived_result(recipe_id: i64, name: &str, confidence: f64) -> DerivationResult {
    DerivationResult {
        recipe_id,
        recipe_name: name.to_string(),
        original_ingredients: Vec::new(),
        derived_ingredients: vec![DerivedIngredient {
            ingredient: "ground beef".to_string(),
            amount: "2".to_string(),
            unit: "lb".to_string(),
            optional: None,
        }],
        confidence,
        validation_notes: vec!["amounts guessed".to_string()],
    }
}

fn low_match(recipe_id: i64) -> ExtractionReport {
    let mut buckets = MatchBucketCounts::default();
    buckets.record(MatchBucket::Low);
    ExtractionReport {
        run_id: "extraction-test".to_string(),
        generated_at: "2026-01-01T00:00:00Z".to_string(),
        records_compared: 1,
        records_without_relations: 0,
        buckets,
        results: vec![IngredientMatch {
            recipe_id,
            recipe_name: "Stew".to_string(),
            free_text_count: 4,
            relation_count: 4,
            matched_count: 1,
            match_ratio: Some(0.25),
            bucket: MatchBucket::Low,
            unmatched_lines: vec!["1 onion".to_string()],
            error: None,
        }],
    }
}

#[test]
fn mid_confidence_fix_lands_in_manual_review_and_corpus_is_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));

    let structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    let derivations = derivation(vec![derived_result(id, "Meatloaf", 0.72)]);
    let log = apply_derivations(
        &connection,
        &derivations,
        &ApplyOptions {
            mode: RunMode::Apply,
            min_confidence: 0.90,
            reapply: false,
            backups_dir: dir.path().join("backups"),
        },
    )
    .expect("apply");
    assert_eq!(log.skipped_fixes, 1);

    let bundle = aggregate(structure, None, Some(derivations), Some(log), CUTOFF);

    let review = bundle
        .review_rows
        .iter()
        .find(|row| row.status == "needs_review")
        .expect("needs review row");
    assert_eq!(review.recipe_id, id);
    assert_eq!(review.confidence, Some(0.72));
    assert_eq!(review.issue_type, "missing_ingredients");
    assert_eq!(review.severity, "high");

    let totals = &bundle.full.totals;
    assert_eq!(totals.derivation.as_ref().map(|d| d.needs_review), Some(1));
    assert_eq!(totals.apply.as_ref().map(|a| a.applied_fixes), Some(0));
    assert_eq!(totals.manual_review_rows, bundle.review_rows.len());

    let recipe = store::load_recipe(&connection, id).expect("load").expect("recipe");
    assert_eq!(recipe.qa_status, "pending");
    assert_eq!(recipe.ingredients.as_deref(), Some("[]"));
}

#[test]
fn written_full_report_reproduces_console_summary() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let broken = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));
    fixtures::insert_recipe(&connection, "Untitled", None, None);
    let stew = fixtures::insert_recipe(
        &connection,
        "Stew",
        Some(r#"["1 onion","2 carrots","1 lb beef","1 cup stock"]"#),
        Some(r#"["Simmer for two hours."]"#),
    );

    let structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    let bundle = aggregate(
        structure,
        Some(low_match(stew)),
        Some(derivation(vec![
            derived_result(broken, "Meatloaf", 0.95),
            derived_result(broken + 1, "Untitled", 0.0),
        ])),
        None,
        CUTOFF,
    );

    let paths = ArtifactPaths::new(dir.path());
    write_report_artifacts(&paths, &bundle).expect("write");

    let reloaded: FullReport = read_json(&paths.full_report).expect("reload");
    let recomputed = ReportTotals::from_full_report(&reloaded);
    assert_eq!(summary_lines(&recomputed), summary_lines(&bundle.full.totals));
    assert_eq!(summary_lines(&reloaded.totals), summary_lines(&recomputed));
    assert_eq!(recomputed.manual_review_rows, 3);
    assert_eq!(recomputed.defective_records, 2);

    let csv = std::fs::read_to_string(&paths.manual_review).expect("csv");
    assert_eq!(csv.lines().count(), 4);
    assert!(csv.starts_with("recipe_id,recipe_name,issue_type,severity,confidence,status,notes\n"));

    let summary = std::fs::read_to_string(&paths.executive_summary).expect("summary");
    assert!(summary.contains("## Ingredient Matching"));
    assert!(summary.contains("- low: 1 (33.3%)"));
    assert!(summary.contains("## Applied Fixes\n\nNot run."));
}

#[test]
fn structure_only_report_marks_later_phases_not_run() {
    let connection = fixtures::corpus();
    fixtures::insert_recipe(&connection, "Toast", Some(r#"["bread"]"#), Some(r#"["Toast it."]"#));

    let structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    let bundle = aggregate(structure, None, None, None, CUTOFF);

    assert!(bundle.review_rows.is_empty());
    let lines = summary_lines(&bundle.full.totals);
    assert_eq!(lines[0], "structure: 0 of 1 recipes defective (0.0%)");
    assert!(lines.contains(&"matching: not run".to_string()));
    assert!(lines.contains(&"derivation: not run".to_string()));
    assert!(lines.contains(&"apply: not run".to_string()));
}

#[test]
fn csv_quotes_fields_with_delimiters() {
    let rows = vec![ManualReviewRow {
        recipe_id: 7,
        recipe_name: "Mac \"n\" Cheese, Baked".to_string(),
        issue_type: "missing_ingredients".to_string(),
        severity: "high".to_string(),
        confidence: Some(0.5),
        status: "needs_review".to_string(),
        notes: "plain".to_string(),
    }];

    let csv = render_csv(&rows);
    let line = csv.lines().nth(1).expect("row");
    assert_eq!(
        line,
        "7,\"Mac \"\"n\"\" Cheese, Baked\",missing_ingredients,high,0.50,needs_review,plain"
    );
}

#[test]
fn dry_run_summary_reports_fixes_as_would_apply() {
    let dir = tempfile::tempdir().expect("tempdir");
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));

    let structure = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    let derivations = derivation(vec![derived_result(id, "Meatloaf", 0.95)]);
    let log = apply_derivations(
        &connection,
        &derivations,
        &ApplyOptions {
            mode: RunMode::DryRun,
            min_confidence: 0.90,
            reapply: false,
            backups_dir: dir.path().join("backups"),
        },
    )
    .expect("dry run");

    let bundle = aggregate(structure, None, Some(derivations), Some(log), CUTOFF);

    assert!(bundle.executive_summary.contains("- would apply: 1 ("));
    assert!(!bundle.executive_summary.contains("- applied:"));
    let lines = summary_lines(&bundle.full.totals);
    assert!(lines.iter().any(|line| line.starts_with("apply (dry-run): 1 total, 1 would apply,")));

    let recipe = store::load_recipe(&connection, id).expect("load").expect("recipe");
    assert_eq!(recipe.ingredients.as_deref(), Some("[]"));
}
