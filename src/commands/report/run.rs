use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::ReportArgs;
use crate::config::load_config;
use crate::util::{
    now_utc_string, read_optional_artifact, read_required_artifact, utc_compact_string,
    write_json_pretty, write_text,
};

#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub full: FullReport,
    pub executive_summary: String,
    pub review_rows: Vec<ManualReviewRow>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let config = load_config(args.corpus.config.as_deref())?;
    let paths = ArtifactPaths::new(&args.corpus.reports_dir());

    let structure: StructureReport = read_required_artifact(&paths.structure_report, "structure")?;
    let extraction: Option<ExtractionReport> = read_optional_artifact(&paths.extraction_report)?;
    let derivation: Option<DerivationReport> = read_optional_artifact(&paths.derivation_report)?;
    let apply_log: Option<ApplyLog> = read_optional_artifact(&paths.apply_log)?;

    for (phase, present) in [
        ("matching", extraction.is_some()),
        ("derivation", derivation.is_some()),
        ("apply", apply_log.is_some()),
    ] {
        if !present {
            warn!(phase, "phase artifact missing; reporting it as not run");
        }
    }

    let bundle = aggregate(
        structure,
        extraction,
        derivation,
        apply_log,
        config.thresholds.high_confidence,
    );
    write_report_artifacts(&paths, &bundle)?;
    log_console_summary(&bundle.full.totals);
    Ok(())
}

pub fn aggregate(
    structure: StructureReport,
    extraction: Option<ExtractionReport>,
    derivation: Option<DerivationReport>,
    apply_log: Option<ApplyLog>,
    high_confidence_cutoff: f64,
) -> ReportBundle {
    let totals = ReportTotals::compute(
        &structure,
        extraction.as_ref(),
        derivation.as_ref(),
        apply_log.as_ref(),
        high_confidence_cutoff,
    );
    let review_rows = manual_review_rows(
        &structure,
        extraction.as_ref(),
        derivation.as_ref(),
        high_confidence_cutoff,
    );

    let full = FullReport {
        run_id: format!("report-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        high_confidence_cutoff,
        totals,
        structure,
        extraction,
        derivation,
        apply_log,
    };
    let executive_summary = render_executive_summary(&full);

    ReportBundle {
        full,
        executive_summary,
        review_rows,
    }
}

pub fn write_report_artifacts(paths: &ArtifactPaths, bundle: &ReportBundle) -> Result<()> {
    write_json_pretty(&paths.full_report, &bundle.full)?;
    write_text(&paths.executive_summary, &bundle.executive_summary)?;
    write_text(&paths.manual_review, &render_csv(&bundle.review_rows))?;

    info!(
        full_report = %paths.full_report.display(),
        executive_summary = %paths.executive_summary.display(),
        manual_review = %paths.manual_review.display(),
        review_rows = bundle.review_rows.len(),
        "wrote report artifacts"
    );
    Ok(())
}
