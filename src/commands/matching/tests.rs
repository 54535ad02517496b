use std::collections::HashMap;

use super::*;
use crate::store::fixtures;

fn recipe(id: i64, ingredients: &str) -> CorpusRecipe {
    CorpusRecipe {
        id,
        name: format!("recipe {id}"),
        description: None,
        ingredients: Some(ingredients.to_string()),
        instructions: Some(r#"["Cook."]"#.to_string()),
        chef_name: None,
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

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn free_text_lines_accepts_strings_and_objects() {
    let lines = free_text_lines(r#"["2 cups flour", {"name": "eggs", "amount": 3}, "", null]"#)
        .expect("lines");
    assert_eq!(lines, names(&["2 cups flour", "eggs"]));

    assert!(free_text_lines("2 cups flour").is_err());
    assert!(free_text_lines(r#"{"name": "flour"}"#).is_err());
    assert!(free_text_lines(r#"[{"amount": 2}]"#).is_err());
}

#[test]
fn normalize_tokens_drops_numbers_and_plurals() {
    assert_eq!(normalize_tokens("3 Large Eggs"), names(&["large", "egg"]));
    assert_eq!(normalize_tokens("2 ripe tomatoes, diced"), names(&["ripe", "tomato", "diced"]));
    assert_eq!(normalize_tokens("1 cup blueberries"), names(&["cup", "blueberry"]));
    assert_eq!(normalize_tokens("Swiss chard"), names(&["swiss", "chard"]));
}

#[test]
fn bucket_boundaries_follow_thresholds() {
    let thresholds = ThresholdConfig::default();
    assert_eq!(bucket_for(1.0, &thresholds), MatchBucket::Perfect);
    assert_eq!(bucket_for(0.8, &thresholds), MatchBucket::High);
    assert_eq!(bucket_for(0.79, &thresholds), MatchBucket::Medium);
    assert_eq!(bucket_for(0.6, &thresholds), MatchBucket::Medium);
    assert_eq!(bucket_for(0.59, &thresholds), MatchBucket::Low);
}

#[test]
fn match_record_counts_lines_with_relations() {
    let thresholds = ThresholdConfig::default();
    let pancakes = recipe(1, r#"["2 cups flour", "3 eggs", "1 tsp salt"]"#);

    let perfect = match_record(&pancakes, &names(&["flour", "egg", "salt"]), &thresholds);
    assert_eq!(perfect.bucket, MatchBucket::Perfect);
    assert_eq!(perfect.matched_count, 3);
    assert_eq!(perfect.match_ratio, Some(1.0));

    let partial = match_record(&pancakes, &names(&["all-purpose flour", "egg"]), &thresholds);
    assert_eq!(partial.matched_count, 1);
    assert_eq!(partial.bucket, MatchBucket::Low);
    assert_eq!(partial.unmatched_lines, names(&["2 cups flour", "1 tsp salt"]));

    let medium = match_record(&pancakes, &names(&["flour", "eggs"]), &thresholds);
    assert_eq!(medium.match_ratio, Some(0.6667));
    assert_eq!(medium.bucket, MatchBucket::Medium);
}

#[test]
fn unparseable_free_text_is_extraction_error() {
    let broken = recipe(2, "2 cups flour, 3 eggs");
    let result = match_record(&broken, &names(&["flour"]), &ThresholdConfig::default());
    assert_eq!(result.bucket, MatchBucket::ExtractionError);
    assert!(result.match_ratio.is_none());
    assert!(result.error.is_some());
}

#[test]
fn compare_skips_records_without_free_text_and_counts_missing_relations() {
    let recipes = vec![
        recipe(1, r#"["2 cups flour"]"#),
        recipe(2, "[]"),
        recipe(3, r#"["1 onion"]"#),
        recipe(4, "not json"),
    ];
    let mut relations = HashMap::new();
    relations.insert(1, names(&["flour"]));
    relations.insert(2, names(&["flour"]));
    relations.insert(4, names(&["onion"]));

    let report = compare(&recipes, &relations, &ThresholdConfig::default());
    assert_eq!(report.records_compared, 2);
    assert_eq!(report.records_without_relations, 1);
    assert_eq!(report.buckets.perfect, 1);
    assert_eq!(report.buckets.extraction_error, 1);
    assert_eq!(report.buckets.total(), report.records_compared);
}

#[test]
fn match_corpus_reads_relation_table() {
    let connection = fixtures::corpus();
    let id = fixtures::insert_recipe(
        &connection,
        "Omelette",
        Some(r#"["3 eggs", "1 tbsp butter", "chives"]"#),
        Some(r#"["Whisk.", "Cook."]"#),
    );
    fixtures::link_ingredient(&connection, id, "egg");
    fixtures::link_ingredient(&connection, id, "butter");

    let structure = crate::commands::audit::audit_corpus(&connection, &Default::default())
        .expect("structure");
    let report = match_corpus(&connection, &structure, &ThresholdConfig::default()).expect("match");

    assert_eq!(report.records_compared, 1);
    assert_eq!(report.results[0].matched_count, 2);
    assert_eq!(report.results[0].bucket, MatchBucket::Medium);
}
