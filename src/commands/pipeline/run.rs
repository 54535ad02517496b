use std::time::Duration;

use anyhow::{Result, bail};
use rusqlite::Connection;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::PipelineArgs;
use crate::collab::HttpCollaborator;
use crate::commands::apply::{ApplyOptions, apply_derivations};
use crate::commands::audit::audit_corpus;
use crate::commands::derive::{DeriveOptions, derive_ingredients};
use crate::commands::matching::match_corpus;
use crate::commands::report::{ReportBundle, aggregate, log_console_summary, write_report_artifacts};
use crate::config::load_config;
use crate::store;
use crate::util::write_json_pretty;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: RunMode,
    pub min_confidence: f64,
    pub reapply: bool,
    pub include_low_match: bool,
    pub skip_derive: bool,
    /// Persist each phase artifact as it is produced.
    pub checkpoints: bool,
    pub delay: Duration,
}

pub fn run(args: PipelineArgs) -> Result<()> {
    let mut config = load_config(args.corpus.config.as_deref())?;
    if let Some(delay_ms) = args.delay_ms {
        config.collaborators.request_delay_ms = delay_ms;
    }
    let min_confidence = args
        .min_confidence
        .unwrap_or(config.thresholds.apply_min_confidence);
    if !(0.0..=1.0).contains(&min_confidence) {
        bail!("--min-confidence must be in [0.0, 1.0], got {min_confidence}");
    }

    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let db_path = args.corpus.db_path();
    let connection = if args.mode.is_dry_run() {
        store::open_corpus_read_only(&db_path)?
    } else {
        store::open_corpus(&db_path)?
    };

    let collaborator = HttpCollaborator::from_config(&config.collaborators)?;
    let extractor = collaborator
        .has_extraction()
        .then_some(&collaborator as &dyn RecipeExtractor);

    let options = PipelineOptions {
        mode: args.mode,
        min_confidence,
        reapply: args.reapply,
        include_low_match: args.include_low_match,
        skip_derive: args.skip_derive,
        checkpoints: !args.no_checkpoints,
        delay: config.collaborators.request_delay(),
    };

    let bundle = run_pipeline(&connection, &config, extractor, &options, &paths)?;
    log_console_summary(&bundle.full.totals);
    Ok(())
}

/// Phases 1-5 in order, each consuming the previous phase's value directly.
/// Derivation and apply are skipped when no extractor is available.
pub fn run_pipeline(
    connection: &Connection,
    config: &QaConfig,
    extractor: Option<&dyn RecipeExtractor>,
    options: &PipelineOptions,
    paths: &ArtifactPaths,
) -> Result<ReportBundle> {
    info!(
        mode = options.mode.as_str(),
        checkpoints = options.checkpoints,
        "starting qa pipeline"
    );

    let structure = audit_corpus(connection, &config.audit)?;
    info!(
        run_id = %structure.run_id,
        defective = structure.summary.defective_records,
        "phase 1 complete"
    );
    if options.checkpoints {
        write_json_pretty(&paths.structure_report, &structure)?;
    }

    let extraction = match_corpus(connection, &structure, &config.thresholds)?;
    info!(
        run_id = %extraction.run_id,
        compared = extraction.records_compared,
        low = extraction.buckets.low,
        "phase 2 complete"
    );
    if options.checkpoints {
        write_json_pretty(&paths.extraction_report, &extraction)?;
    }

    let extractor = if options.skip_derive {
        info!("derivation and apply skipped on request");
        None
    } else {
        if extractor.is_none() {
            warn!("extraction collaborator not configured; skipping derivation and apply");
        }
        extractor
    };

    let (derivation, apply_log) = match extractor {
        Some(extractor) => {
            let derivation = derive_ingredients(
                connection,
                &structure,
                Some(&extraction),
                extractor,
                &config.thresholds,
                &DeriveOptions {
                    include_low_match: options.include_low_match,
                    limit: None,
                    delay: options.delay,
                },
            )?;
            info!(
                run_id = %derivation.run_id,
                derived = derivation.derived,
                failed = derivation.failed,
                "phase 3 complete"
            );
            if options.checkpoints {
                write_json_pretty(&paths.derivation_report, &derivation)?;
            }

            let apply_log = apply_derivations(
                connection,
                &derivation,
                &ApplyOptions {
                    mode: options.mode,
                    min_confidence: options.min_confidence,
                    reapply: options.reapply,
                    backups_dir: paths.backups_dir.clone(),
                },
            )?;
            info!(
                run_id = %apply_log.run_id,
                applied = apply_log.applied_fixes,
                skipped = apply_log.skipped_fixes,
                errors = apply_log.errors,
                "phase 4 complete"
            );
            if options.checkpoints {
                write_json_pretty(&paths.apply_log, &apply_log)?;
            }

            (Some(derivation), Some(apply_log))
        }
        None => (None, None),
    };

    let bundle = aggregate(
        structure,
        Some(extraction),
        derivation,
        apply_log,
        config.thresholds.high_confidence,
    );
    write_report_artifacts(paths, &bundle)?;
    Ok(bundle)
}
