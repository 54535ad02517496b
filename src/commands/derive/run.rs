use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::DeriveArgs;
use crate::collab::{HttpCollaborator, pause_after_call};
use crate::config::load_config;
use crate::model::{SourceMetadata, clamp_confidence};
use crate::store;
use crate::util::{
    now_utc_string, read_optional_artifact, read_required_artifact, utc_compact_string,
    write_json_pretty,
};

#[derive(Debug, Clone)]
pub struct DeriveOptions {
    pub include_low_match: bool,
    pub limit: Option<usize>,
    pub delay: Duration,
}

pub fn run(args: DeriveArgs) -> Result<()> {
    let mut config = load_config(args.corpus.config.as_deref())?;
    if let Some(delay_ms) = args.delay_ms {
        config.collaborators.request_delay_ms = delay_ms;
    }

    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let structure: StructureReport = read_required_artifact(&paths.structure_report, "structure")?;
    let extraction: Option<ExtractionReport> = read_optional_artifact(&paths.extraction_report)?;
    if args.include_low_match && extraction.is_none() {
        warn!(
            path = %paths.extraction_report.display(),
            "extraction report missing; low-match records will not be derived"
        );
    }

    let collaborator = HttpCollaborator::from_config(&config.collaborators)?;
    if !collaborator.has_extraction() {
        bail!("derivation requires collaborators.extraction_url to be configured");
    }

    let connection = store::open_corpus_read_only(&args.corpus.db_path())?;
    let options = DeriveOptions {
        include_low_match: args.include_low_match,
        limit: args.limit,
        delay: config.collaborators.request_delay(),
    };

    let report = derive_ingredients(
        &connection,
        &structure,
        extraction.as_ref(),
        &collaborator,
        &config.thresholds,
        &options,
    )?;
    write_json_pretty(&paths.derivation_report, &report)?;

    info!(path = %paths.derivation_report.display(), "wrote derivation report");
    Ok(())
}

pub fn derive_ingredients(
    connection: &Connection,
    structure: &StructureReport,
    extraction: Option<&ExtractionReport>,
    extractor: &dyn RecipeExtractor,
    thresholds: &ThresholdConfig,
    options: &DeriveOptions,
) -> Result<DerivationReport> {
    let mut candidates = select_candidates(structure, extraction, options.include_low_match);
    if let Some(limit) = options.limit {
        candidates.truncate(limit);
    }

    info!(candidates = candidates.len(), "deriving ingredient lists");

    let mut results = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let recipe = store::load_recipe(connection, candidate.recipe_id)
            .with_context(|| format!("failed to read recipe {}", candidate.recipe_id))?;

        let result = match recipe {
            Some(recipe) => {
                let result = derive_one(&recipe, extractor, thresholds);
                pause_after_call(options.delay);
                result
            }
            None => unusable(
                candidate.recipe_id,
                &candidate.recipe_name,
                Vec::new(),
                "record no longer exists in the corpus".to_string(),
            ),
        };

        info!(
            position = index + 1,
            total = candidates.len(),
            recipe_id = result.recipe_id,
            derived = result.derived_ingredients.len(),
            confidence = result.confidence,
            "derivation finished"
        );
        results.push(result);
    }

    let derived = results.iter().filter(|result| result.confidence > 0.0).count();
    let high_confidence = results
        .iter()
        .filter(|result| result.confidence >= thresholds.high_confidence)
        .count();

    let report = DerivationReport {
        run_id: format!("derivation-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        candidates: candidates.len(),
        derived,
        failed: results.len() - derived,
        high_confidence,
        results,
    };

    info!(
        candidates = report.candidates,
        derived = report.derived,
        failed = report.failed,
        high_confidence = report.high_confidence,
        "ingredient derivation completed"
    );

    Ok(report)
}

/// One collaborator call; every failure mode collapses to a zero-confidence result with a note.
pub fn derive_one(
    recipe: &CorpusRecipe,
    extractor: &dyn RecipeExtractor,
    thresholds: &ThresholdConfig,
) -> DerivationResult {
    let original_ingredients = super::context::partial_ingredients(recipe);
    let text = build_context(recipe);
    let metadata = SourceMetadata {
        title: Some(recipe.name.clone()),
        description: recipe.description.clone(),
        image: None,
    };
    let request = ExtractionRequest {
        text: &text,
        url: recipe.source_url.as_deref().unwrap_or_default(),
        metadata: &metadata,
    };

    let response = match extractor.extract(&request) {
        Ok(Some(response)) => response,
        Ok(None) => {
            return unusable(
                recipe.id,
                &recipe.name,
                original_ingredients,
                "extraction collaborator did not recognise a recipe".to_string(),
            );
        }
        Err(err) => {
            warn!(recipe_id = recipe.id, error = %err, "extraction collaborator failed");
            return unusable(
                recipe.id,
                &recipe.name,
                original_ingredients,
                format!("extraction collaborator failed: {err}"),
            );
        }
    };

    let confidence = clamp_confidence(response.confidence);
    if confidence < thresholds.collaborator_min_confidence {
        return unusable(
            recipe.id,
            &recipe.name,
            original_ingredients,
            format!(
                "collaborator confidence {confidence:.2} is below the minimum {:.2}",
                thresholds.collaborator_min_confidence
            ),
        );
    }

    let derived_ingredients = derived_from(&response);
    if derived_ingredients.is_empty() {
        return unusable(
            recipe.id,
            &recipe.name,
            original_ingredients,
            "collaborator returned no ingredients".to_string(),
        );
    }

    DerivationResult {
        recipe_id: recipe.id,
        recipe_name: recipe.name.clone(),
        original_ingredients,
        derived_ingredients,
        confidence,
        validation_notes: response.validation_notes,
    }
}

fn derived_from(response: &ExtractionResponse) -> Vec<DerivedIngredient> {
    response
        .ingredients
        .iter()
        .filter(|ingredient| !ingredient.name.trim().is_empty())
        .map(|ingredient| DerivedIngredient {
            ingredient: ingredient.name.trim().to_string(),
            amount: ingredient.amount.clone().unwrap_or_default(),
            unit: ingredient.unit.clone().unwrap_or_default(),
            optional: ingredient.is_optional().then_some(true),
        })
        .collect()
}

fn unusable(
    recipe_id: i64,
    recipe_name: &str,
    original_ingredients: Vec<String>,
    note: String,
) -> DerivationResult {
    DerivationResult {
        recipe_id,
        recipe_name: recipe_name.to_string(),
        original_ingredients,
        derived_ingredients: Vec::new(),
        confidence: 0.0,
        validation_notes: vec![note],
    }
}
