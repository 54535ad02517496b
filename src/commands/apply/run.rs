use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::{ApplyArgs, RunMode};
use crate::commands::matching::free_text_lines;
use crate::config::load_config;
use crate::model::{IssueType, clamp_confidence};
use crate::store::{self, QaFixUpdate};
use crate::util::{now_utc_string, read_required_artifact, utc_compact_string, write_json_pretty};

const FIX_METHOD: &str = "collaborator_derivation";
const FIXES_APPLIED: &str = "ingredients_derived";
const FIXED_STATUS: &str = "fixed";

#[derive(Debug, Clone)]
pub struct ApplyOptions {
    pub mode: RunMode,
    pub min_confidence: f64,
    pub reapply: bool,
    pub backups_dir: PathBuf,
}

pub fn run(args: ApplyArgs) -> Result<()> {
    let config = load_config(args.corpus.config.as_deref())?;
    let min_confidence = args
        .min_confidence
        .unwrap_or(config.thresholds.apply_min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        bail!("--min-confidence must be in [0.0, 1.0], got {min_confidence}");
    }

    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let derivation: DerivationReport =
        read_required_artifact(&paths.derivation_report, "derivation")?;

    let db_path = args.corpus.db_path();
    let connection = if args.mode.is_dry_run() {
        store::open_corpus_read_only(&db_path)?
    } else {
        store::open_corpus(&db_path)?
    };

    let options = ApplyOptions {
        mode: args.mode,
        min_confidence,
        reapply: args.reapply,
        backups_dir: paths.backups_dir.clone(),
    };
    let log = apply_derivations(&connection, &derivation, &options)?;
    write_json_pretty(&paths.apply_log, &log)?;

    info!(path = %paths.apply_log.display(), "wrote apply log");
    Ok(())
}

struct PlannedFix<'a> {
    result: &'a DerivationResult,
    confidence: f64,
    ingredients_before: usize,
}

pub fn apply_derivations(
    connection: &Connection,
    report: &DerivationReport,
    options: &ApplyOptions,
) -> Result<ApplyLog> {
    let started = Utc::now();
    let run_id = format!("apply-{}", utc_compact_string(started));
    let started_at = now_utc_string();

    info!(
        mode = options.mode.as_str(),
        min_confidence = options.min_confidence,
        results = report.results.len(),
        "applying derived ingredient fixes"
    );

    let mut entries = Vec::with_capacity(report.results.len());
    let mut planned = Vec::new();

    for result in &report.results {
        let confidence = clamp_confidence(result.confidence);
        let ingredients_after = result.derived_ingredients.len();

        if confidence < options.min_confidence || result.derived_ingredients.is_empty() {
            let message = if result.derived_ingredients.is_empty() {
                "no derived ingredients to apply".to_string()
            } else {
                format!(
                    "confidence {confidence:.2} below threshold {:.2}",
                    options.min_confidence
                )
            };
            entries.push(
                entry(result, ApplyStatus::Skipped, confidence, 0, ingredients_after)
                    .with_message(message),
            );
            continue;
        }

        let current = store::load_recipe(connection, result.recipe_id)
            .with_context(|| format!("failed to read recipe {}", result.recipe_id))?;
        let Some(current) = current else {
            entries.push(
                entry(result, ApplyStatus::Error, confidence, 0, ingredients_after)
                    .with_error(ApplyFailure::missing_record(result.recipe_id).to_string()),
            );
            continue;
        };

        let ingredients_before = current
            .ingredients
            .as_deref()
            .and_then(|raw| free_text_lines(raw).ok())
            .map(|lines| lines.len())
            .unwrap_or(0);

        if current.qa_status == FIXED_STATUS && !options.reapply {
            entries.push(
                entry(result, ApplyStatus::Skipped, confidence, ingredients_before, ingredients_after)
                    .with_message("already fixed in an earlier run; pass --reapply to overwrite".to_string()),
            );
            continue;
        }

        planned.push(PlannedFix {
            result,
            confidence,
            ingredients_before,
        });
    }

    let mut backup_path = None;
    if !options.mode.is_dry_run() && !planned.is_empty() {
        let ids = planned.iter().map(|fix| fix.result.recipe_id).collect::<Vec<i64>>();
        let (path, backed_up) = backup_records(
            connection,
            &ids,
            &options.backups_dir,
            &run_id,
            &utc_compact_string(started),
        )?;
        backup_path = Some(path.display().to_string());

        planned.retain(|fix| {
            let found = backed_up.contains(&fix.result.recipe_id);
            if !found {
                let after = fix.result.derived_ingredients.len();
                entries.push(
                    entry(fix.result, ApplyStatus::Error, fix.confidence, fix.ingredients_before, after)
                        .with_error(ApplyFailure::missing_record(fix.result.recipe_id).to_string()),
                );
            }
            found
        });
    }

    for fix in &planned {
        let after = fix.result.derived_ingredients.len();

        if options.mode.is_dry_run() {
            info!(
                recipe_id = fix.result.recipe_id,
                ingredients_before = fix.ingredients_before,
                ingredients_after = after,
                confidence = fix.confidence,
                "would apply fix"
            );
            entries.push(
                entry(fix.result, ApplyStatus::Applied, fix.confidence, fix.ingredients_before, after)
                    .with_message("dry run: no write performed".to_string()),
            );
            continue;
        }

        match write_fix(connection, fix) {
            Ok(()) => {
                info!(recipe_id = fix.result.recipe_id, ingredients_after = after, "fix applied");
                entries.push(entry(
                    fix.result,
                    ApplyStatus::Applied,
                    fix.confidence,
                    fix.ingredients_before,
                    after,
                ));
            }
            Err(ApplyFailure::Record { message }) => {
                warn!(recipe_id = fix.result.recipe_id, error = %message, "fix failed for record");
                entries.push(
                    entry(fix.result, ApplyStatus::Error, fix.confidence, fix.ingredients_before, after)
                        .with_error(message),
                );
            }
            Err(fatal) => {
                let applied = entries
                    .iter()
                    .filter(|entry| entry.status == ApplyStatus::Applied)
                    .count();
                warn!(applied_before_abort = applied, "aborting apply run");
                return Err(fatal).context("apply run aborted");
            }
        }
    }

    let applied_fixes = count_status(&entries, ApplyStatus::Applied);
    let skipped_fixes = count_status(&entries, ApplyStatus::Skipped);
    let errors = count_status(&entries, ApplyStatus::Error);

    let log = ApplyLog {
        run_id,
        mode: options.mode.as_str().to_string(),
        min_confidence: options.min_confidence,
        started_at,
        completed_at: now_utc_string(),
        total_fixes: entries.len(),
        applied_fixes,
        skipped_fixes,
        errors,
        backup_created: backup_path.is_some(),
        backup_path,
        entries,
    };
    if !log.totals_consistent() {
        bail!(
            "apply log totals do not add up: {} total, {} applied, {} skipped, {} errors",
            log.total_fixes,
            log.applied_fixes,
            log.skipped_fixes,
            log.errors
        );
    }

    info!(
        mode = %log.mode,
        total = log.total_fixes,
        applied = log.applied_fixes,
        skipped = log.skipped_fixes,
        errors = log.errors,
        backup_created = log.backup_created,
        "apply completed"
    );

    Ok(log)
}

fn write_fix(connection: &Connection, fix: &PlannedFix<'_>) -> Result<(), ApplyFailure> {
    let recipe_id = fix.result.recipe_id;
    let ingredients_json = serde_json::to_string(&fix.result.derived_ingredients).map_err(|err| {
        ApplyFailure::Record {
            message: format!("failed to serialize derived ingredients: {err}"),
        }
    })?;
    let notes = fix.result.validation_notes.join("; ");
    let timestamp = now_utc_string();

    let update = QaFixUpdate {
        recipe_id,
        ingredients_json: &ingredients_json,
        confidence: fix.confidence,
        method: FIX_METHOD,
        notes: &notes,
        issues_found: IssueType::MissingIngredients.as_str(),
        fixes_applied: FIXES_APPLIED,
        timestamp: &timestamp,
    };

    match store::update_qa_fix(connection, &update) {
        Ok(0) => Err(ApplyFailure::missing_record(recipe_id)),
        Ok(_) => Ok(()),
        Err(err) => Err(ApplyFailure::classify(recipe_id, err)),
    }
}

fn entry(
    result: &DerivationResult,
    status: ApplyStatus,
    confidence: f64,
    ingredients_before: usize,
    ingredients_after: usize,
) -> ApplyLogEntry {
    ApplyLogEntry {
        recipe_id: result.recipe_id,
        recipe_name: result.recipe_name.clone(),
        status,
        confidence,
        ingredients_before,
        ingredients_after,
        message: None,
        error_message: None,
    }
}

impl ApplyLogEntry {
    fn with_message(mut self, message: String) -> Self {
        self.message = Some(message);
        self
    }

    fn with_error(mut self, error: String) -> Self {
        self.error_message = Some(error);
        self
    }
}

fn count_status(entries: &[ApplyLogEntry], status: ApplyStatus) -> usize {
    entries.iter().filter(|entry| entry.status == status).count()
}
