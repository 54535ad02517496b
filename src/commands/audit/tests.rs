use super::*;
use crate::store::fixtures;

fn recipe(id: i64, name: &str, ingredients: Option<&str>, instructions: Option<&str>) -> CorpusRecipe {
    CorpusRecipe {
        id,
        name: name.to_string(),
        description: None,
        ingredients: ingredients.map(ToOwned::to_owned),
        instructions: instructions.map(ToOwned::to_owned),
        chef_name: Some("Alton Brown".to_string()),
        source_url: None,
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

#[test]
fn empty_or_invalid_values() {
    assert_eq!(classify_field(None), Some(FieldDefect::Missing));
    assert_eq!(classify_field(Some("")), Some(FieldDefect::Missing));
    assert_eq!(classify_field(Some("[]")), Some(FieldDefect::EmptyArray));
    assert_eq!(classify_field(Some(r#"["", " "]"#)), Some(FieldDefect::BlankEntries));
    assert_eq!(classify_field(Some("null")), Some(FieldDefect::Missing));
    assert_eq!(classify_field(Some("[\"flour\"")), Some(FieldDefect::Malformed));
    assert_eq!(classify_field(Some(r#"["flour","egg"]"#)), None);
    assert_eq!(classify_field(Some(r#"[{"name":"flour"}]"#)), None);
}

#[test]
fn classify_field_distinguishes_defects() {
    assert_eq!(classify_field(None), Some(FieldDefect::Missing));
    assert_eq!(classify_field(Some("  ")), Some(FieldDefect::Missing));
    assert_eq!(classify_field(Some("[]")), Some(FieldDefect::EmptyArray));
    assert_eq!(classify_field(Some(r#"["", null]"#)), Some(FieldDefect::BlankEntries));
    assert_eq!(classify_field(Some("1 cup flour")), Some(FieldDefect::Malformed));
    assert_eq!(classify_field(Some(r#"{"a":1}"#)), Some(FieldDefect::Malformed));
    assert_eq!(classify_field(Some(r#"["2 eggs"]"#)), None);
}

#[test]
fn empty_ingredient_array_is_empty_ingredients() {
    let recipes = vec![recipe(1, "Pancakes", Some("[]"), Some(r#"["step1","step2","step3"]"#))];
    let report = scan(&recipes, &AuditConfig::default()).expect("scan");

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(finding.corruption_type, CorruptionType::EmptyIngredients);
    assert_eq!(finding.issue_type, IssueType::MissingIngredients);
    assert_eq!(finding.severity, Severity::High);
    assert!(!finding.known_bad_name);
}

#[test]
fn scan_skips_healthy_records_and_buckets_the_rest() {
    let mut private = recipe(4, "Soup", Some("not json"), Some(r#"["Simmer."]"#));
    private.is_public = false;
    private.chef_name = None;

    let recipes = vec![
        recipe(1, "Stew", Some(r#"["beef"]"#), Some(r#"["Brown the beef."]"#)),
        recipe(2, "Pie", None, None),
        recipe(3, "Tart", Some(r#"["flour"]"#), Some(r#"[" "]"#)),
        private,
    ];
    let report = scan(&recipes, &AuditConfig::default()).expect("scan");

    assert_eq!(report.total_recipes, 4);
    assert_eq!(report.summary.defective_records, 3);
    assert_eq!(report.summary.by_corruption_type.get("both"), Some(&1));
    assert_eq!(report.summary.by_corruption_type.get("empty_instructions"), Some(&1));
    assert_eq!(report.summary.by_corruption_type.get("empty_ingredients"), Some(&1));
    assert_eq!(report.summary.by_severity.get("critical"), Some(&1));
    assert_eq!(report.summary.by_visibility.get("private"), Some(&1));
    assert_eq!(report.summary.by_source.get("unknown"), Some(&1));
    assert_eq!(report.summary.by_source.get("Alton Brown"), Some(&2));

    let tart = report
        .findings
        .iter()
        .find(|finding| finding.recipe_id == 3)
        .expect("tart finding");
    assert_eq!(tart.issue_type, IssueType::EmptyStrings);
    assert_eq!(tart.severity, Severity::Medium);

    let soup = report
        .findings
        .iter()
        .find(|finding| finding.recipe_id == 4)
        .expect("soup finding");
    assert_eq!(soup.issue_type, IssueType::MalformedJson);
}

#[test]
fn known_bad_name_forces_both() {
    let recipes = vec![recipe(
        9,
        "Untitled Recipe",
        Some(r#"["flour","egg"]"#),
        Some(r#"["Mix.","Bake."]"#),
    )];
    let report = scan(&recipes, &AuditConfig::default()).expect("scan");

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].corruption_type, CorruptionType::Both);
    assert_eq!(report.findings[0].severity, Severity::Critical);
    assert!(report.findings[0].known_bad_name);
    assert_eq!(report.summary.known_bad_name_overrides, 1);
}

#[test]
fn invalid_known_name_pattern_is_an_error() {
    let config = AuditConfig {
        known_corrupted_names: vec!["(unclosed".to_string()],
    };
    assert!(scan(&[], &config).is_err());
}

#[test]
fn audit_corpus_reads_the_store() {
    let connection = fixtures::corpus();
    fixtures::insert_recipe(&connection, "Meatloaf", Some("[]"), Some(r#"["Bake."]"#));
    fixtures::insert_recipe(&connection, "Chili", Some(r#"["beans"]"#), Some(r#"["Simmer."]"#));

    let report = audit_corpus(&connection, &AuditConfig::default()).expect("audit");
    assert_eq!(report.total_recipes, 2);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].recipe_name, "Meatloaf");
}
