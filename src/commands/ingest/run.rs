use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::IngestArgs;
use crate::collab::{
    ContentRetriever, ExtractionRequest, HttpCollaborator, RecipeExtractor, accept_extraction,
    pause_after_call,
};
use crate::config::{QaConfig, load_config};
use crate::model::{IngestCounts, IngestEntry, IngestOutcome, IngestReport};
use crate::store;
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

pub fn run(args: IngestArgs) -> Result<()> {
    let started_ts = Utc::now();
    let mut config = load_config(args.corpus.config.as_deref())?;
    if let Some(delay_ms) = args.delay_ms {
        config.collaborators.request_delay_ms = delay_ms;
    }

    let urls = collect_urls(&args.urls, args.url_file.as_deref())?;
    if urls.is_empty() {
        bail!("no URLs given; pass --url or --url-file");
    }

    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let db_path = args.corpus.db_path();
    if let Some(parent) = db_path.parent() {
        crate::util::ensure_directory(parent)?;
    }
    let mut connection = store::open_corpus(&db_path)?;

    let collaborator = HttpCollaborator::from_config(&config.collaborators)?;
    let fallback: Option<&dyn RecipeExtractor> = if collaborator.has_extraction() {
        Some(&collaborator)
    } else {
        None
    };

    info!(urls = urls.len(), chef = %args.chef, db = %db_path.display(), "starting ingest");

    let report = ingest_urls(
        &mut connection,
        &urls,
        &args.chef,
        &config,
        &collaborator,
        fallback,
    )?;

    let report_path = paths
        .ingest_dir
        .join(format!("ingest_report_{}.json", utc_compact_string(started_ts)));
    write_json_pretty(&report_path, &report)?;

    info!(path = %report_path.display(), "wrote ingest report");
    log_counts(&report.counts);

    Ok(())
}

fn collect_urls(urls: &[String], url_file: Option<&Path>) -> Result<Vec<String>> {
    let mut out = urls
        .iter()
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect::<Vec<String>>();

    if let Some(path) = url_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read url file {}", path.display()))?;
        out.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(ToOwned::to_owned),
        );
    }

    Ok(out)
}

fn log_counts(counts: &IngestCounts) {
    info!(
        urls = counts.urls,
        inserted = counts.inserted,
        duplicate_exact = counts.duplicate_exact,
        duplicate_fuzzy = counts.duplicate_fuzzy,
        retrieval_failed = counts.retrieval_failed,
        parse_failed = counts.parse_failed,
        quality_rejected = counts.quality_rejected,
        insert_failed = counts.insert_failed,
        "ingest completed"
    );
}

pub fn ingest_urls(
    connection: &mut Connection,
    urls: &[String],
    chef: &str,
    config: &QaConfig,
    retriever: &dyn ContentRetriever,
    fallback: Option<&dyn RecipeExtractor>,
) -> Result<IngestReport> {
    let started_at = now_utc_string();
    let run_id = format!("ingest-{}", utc_compact_string(Utc::now()));
    let extractor = ContentExtractor::new(&config.extraction)?;
    let mut detector = DuplicateDetector::from_corpus(connection, config.thresholds.title_similarity)?;
    let chef_id = store::ensure_chef(connection, chef)?;
    let delay = config.collaborators.request_delay();

    let mut counts = IngestCounts::default();
    let mut entries = Vec::with_capacity(urls.len());

    for url in urls {
        let entry = ingest_one(
            connection,
            url,
            chef,
            chef_id,
            config,
            &extractor,
            &mut detector,
            retriever,
            fallback,
            delay,
        )?;
        counts.record(entry.outcome);
        entries.push(entry);
    }

    Ok(IngestReport {
        run_id,
        started_at,
        completed_at: now_utc_string(),
        chef: chef.to_string(),
        counts,
        entries,
    })
}

#[allow(clippy::too_many_arguments)]
fn ingest_one(
    connection: &mut Connection,
    url: &str,
    chef: &str,
    chef_id: i64,
    config: &QaConfig,
    extractor: &ContentExtractor,
    detector: &mut DuplicateDetector,
    retriever: &dyn ContentRetriever,
    fallback: Option<&dyn RecipeExtractor>,
    delay: std::time::Duration,
) -> Result<IngestEntry> {
    let entry = |outcome, title: Option<String>, reason: Option<String>| IngestEntry {
        url: url.to_string(),
        outcome,
        title,
        recipe_id: None,
        parse_path: None,
        reason,
    };

    if let Some(verdict) = detector.check_url(url) {
        info!(url, matched = %verdict.matched_title, "duplicate url skipped");
        return Ok(entry(
            IngestOutcome::DuplicateExact,
            Some(verdict.matched_title),
            Some("identical url already linked".to_string()),
        ));
    }

    let document = retriever.retrieve(url);
    pause_after_call(delay);
    let document = match document {
        Ok(document) => document,
        Err(err) => {
            warn!(url, error = %err, "retrieval failed");
            return Ok(entry(IngestOutcome::RetrievalFailed, None, Some(err.to_string())));
        }
    };

    let (recipe, path) = match extractor.extract(&document) {
        ExtractionOutcome::Accepted { recipe, path } => (recipe, path),
        ExtractionOutcome::Rejected(Rejection::NoTitle) => {
            match extract_with_collaborator(extractor, &document, config, fallback, delay) {
                Ok(Some(recipe)) => (recipe, ParsePath::Collaborator),
                Ok(None) => {
                    warn!(url, "no recipe structure recognized");
                    return Ok(entry(
                        IngestOutcome::ParseFailed,
                        None,
                        Some(Rejection::NoTitle.describe(extractor.config())),
                    ));
                }
                Err(rejection) => {
                    return Ok(entry(
                        IngestOutcome::QualityRejected,
                        None,
                        Some(rejection.describe(extractor.config())),
                    ));
                }
            }
        }
        ExtractionOutcome::Rejected(rejection) => {
            info!(url, reason = %rejection.describe(extractor.config()), "rejected by quality gate");
            return Ok(entry(
                IngestOutcome::QualityRejected,
                None,
                Some(rejection.describe(extractor.config())),
            ));
        }
    };

    if let Some(verdict) = detector.check(url, &recipe.title, chef) {
        info!(
            url,
            title = %recipe.title,
            matched = %verdict.matched_title,
            similarity = verdict.similarity,
            "fuzzy duplicate skipped"
        );
        let outcome = match verdict.rule {
            DuplicateRule::ExactUrl => IngestOutcome::DuplicateExact,
            DuplicateRule::FuzzyTitle => IngestOutcome::DuplicateFuzzy,
        };
        return Ok(entry(
            outcome,
            Some(recipe.title),
            Some(format!(
                "matches existing title '{}' (similarity {:.3})",
                verdict.matched_title, verdict.similarity
            )),
        ));
    }

    match store::insert_extracted_recipe(connection, &recipe, chef_id) {
        Ok(recipe_id) => {
            detector.remember(url, &recipe.title, chef);
            info!(url, recipe_id, title = %recipe.title, path = path.as_str(), "recipe inserted");
            Ok(IngestEntry {
                url: url.to_string(),
                outcome: IngestOutcome::Inserted,
                title: Some(recipe.title),
                recipe_id: Some(recipe_id),
                parse_path: Some(path.as_str().to_string()),
                reason: None,
            })
        }
        Err(err) if insert_failure_is_record_level(&err) => {
            warn!(url, error = %err, "recipe insert failed");
            Ok(entry(
                IngestOutcome::InsertFailed,
                Some(recipe.title),
                Some(format!("{err:#}")),
            ))
        }
        Err(err) => Err(err).with_context(|| format!("corpus store failed while inserting {url}")),
    }
}

/// Serialization problems and constraint-style SQLite errors only affect the one recipe.
pub fn insert_failure_is_record_level(err: &anyhow::Error) -> bool {
    match err.downcast_ref::<rusqlite::Error>() {
        Some(sqlite) => store::is_record_level(sqlite),
        None => err.downcast_ref::<serde_json::Error>().is_some(),
    }
}

fn extract_with_collaborator(
    extractor: &ContentExtractor,
    document: &crate::model::SourceDocument,
    config: &QaConfig,
    fallback: Option<&dyn RecipeExtractor>,
    delay: std::time::Duration,
) -> Result<Option<crate::model::ExtractedRecipe>, Rejection> {
    let Some(collaborator) = fallback else {
        return Ok(None);
    };

    let request = ExtractionRequest {
        text: &document.raw_text,
        url: &document.url,
        metadata: &document.metadata,
    };
    let response = collaborator.extract(&request);
    pause_after_call(delay);

    let response = match response {
        Ok(response) => response,
        Err(err) => {
            warn!(url = %document.url, error = %err, "extraction collaborator failed");
            return Ok(None);
        }
    };

    let Some(response) = accept_extraction(response, config.thresholds.collaborator_min_confidence)
    else {
        return Ok(None);
    };

    extractor
        .gate(extractor.recipe_from_collaborator(document, &response))
        .map(Some)
}
