use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::MatchArgs;
use crate::config::load_config;
use crate::model::{ExtractionReport, MatchBucketCounts, StructureReport};
use crate::store;
use crate::util::{now_utc_string, read_required_artifact, round_ratio, utc_compact_string, write_json_pretty};

pub fn run(args: MatchArgs) -> Result<()> {
    let config = load_config(args.corpus.config.as_deref())?;
    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let structure: StructureReport = read_required_artifact(&paths.structure_report, "structure")?;
    let connection = store::open_corpus_read_only(&args.corpus.db_path())?;

    let report = match_corpus(&connection, &structure, &config.thresholds)?;
    write_json_pretty(&paths.extraction_report, &report)?;

    info!(path = %paths.extraction_report.display(), "wrote extraction report");
    Ok(())
}

pub fn match_corpus(
    connection: &Connection,
    structure: &StructureReport,
    thresholds: &ThresholdConfig,
) -> Result<ExtractionReport> {
    let recipes = store::load_corpus(connection).context("failed to load corpus for matching")?;
    let relations = store::load_ingredient_relations(connection)
        .context("failed to load normalized ingredient relations")?;

    info!(
        structure_run_id = %structure.run_id,
        recipes = recipes.len(),
        records_with_relations = relations.len(),
        "comparing free-text ingredients with relations"
    );

    Ok(compare(&recipes, &relations, thresholds))
}

pub fn compare(
    recipes: &[CorpusRecipe],
    relations: &HashMap<i64, Vec<String>>,
    thresholds: &ThresholdConfig,
) -> ExtractionReport {
    let mut buckets = MatchBucketCounts::default();
    let mut records_without_relations = 0usize;
    let mut results = Vec::new();

    for recipe in recipes {
        let has_free_text = recipe
            .ingredients
            .as_deref()
            .map(|raw| !matches!(raw.trim(), "" | "[]" | "null"))
            .unwrap_or(false);
        if !has_free_text {
            continue;
        }

        let Some(names) = relations.get(&recipe.id).filter(|names| !names.is_empty()) else {
            records_without_relations += 1;
            continue;
        };

        let result = match_record(recipe, names, thresholds);
        if let Some(error) = result.error.as_deref() {
            warn!(recipe_id = recipe.id, error, "ingredient comparison failed");
        }
        debug!(
            recipe_id = recipe.id,
            bucket = result.bucket.as_str(),
            matched = result.matched_count,
            "record compared"
        );
        buckets.record(result.bucket);
        results.push(result);
    }

    info!(
        compared = buckets.total(),
        without_relations = records_without_relations,
        perfect = buckets.perfect,
        high = buckets.high,
        medium = buckets.medium,
        low = buckets.low,
        extraction_error = buckets.extraction_error,
        "ingredient matching completed"
    );

    ExtractionReport {
        run_id: format!("extraction-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        records_compared: results.len(),
        records_without_relations,
        buckets,
        results,
    }
}

pub fn match_record(
    recipe: &CorpusRecipe,
    relation_names: &[String],
    thresholds: &ThresholdConfig,
) -> IngredientMatch {
    let lines = match free_text_lines(recipe.ingredients.as_deref().unwrap_or_default()) {
        Ok(lines) if !lines.is_empty() => lines,
        Ok(_) => return failed_match(recipe, relation_names, "ingredient list has no usable lines".to_string()),
        Err(err) => return failed_match(recipe, relation_names, err),
    };

    let relation_tokens = relation_names
        .iter()
        .map(|name| normalize_tokens(name))
        .collect::<Vec<Vec<String>>>();

    let mut unmatched_lines = Vec::new();
    for line in &lines {
        let tokens = normalize_tokens(line).into_iter().collect::<HashSet<String>>();
        if !relation_tokens.iter().any(|relation| line_matches(&tokens, relation)) {
            unmatched_lines.push(line.clone());
        }
    }

    let matched_count = lines.len() - unmatched_lines.len();
    let ratio = matched_count as f64 / lines.len() as f64;

    IngredientMatch {
        recipe_id: recipe.id,
        recipe_name: recipe.name.clone(),
        free_text_count: lines.len(),
        relation_count: relation_names.len(),
        matched_count,
        match_ratio: Some(round_ratio(ratio)),
        bucket: bucket_for(ratio, thresholds),
        unmatched_lines,
        error: None,
    }
}

fn failed_match(recipe: &CorpusRecipe, relation_names: &[String], error: String) -> IngredientMatch {
    IngredientMatch {
        recipe_id: recipe.id,
        recipe_name: recipe.name.clone(),
        free_text_count: 0,
        relation_count: relation_names.len(),
        matched_count: 0,
        match_ratio: None,
        bucket: MatchBucket::ExtractionError,
        unmatched_lines: Vec::new(),
        error: Some(error),
    }
}

pub fn bucket_for(ratio: f64, thresholds: &ThresholdConfig) -> MatchBucket {
    if ratio >= 1.0 {
        MatchBucket::Perfect
    } else if ratio >= thresholds.match_high {
        MatchBucket::High
    } else if ratio >= thresholds.match_medium {
        MatchBucket::Medium
    } else {
        MatchBucket::Low
    }
}
