use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "recipe-qa",
    version,
    about = "Recipe ingestion, duplicate detection and corpus quality-assurance pipeline"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrieve, extract, de-duplicate and insert recipes from URLs.
    Ingest(IngestArgs),
    /// Phase 1: structural scan of the corpus.
    Audit(AuditArgs),
    /// Phase 2: compare free-text ingredients with normalized relations.
    Match(MatchArgs),
    /// Phase 3: derive ingredient lists for structurally incomplete records.
    Derive(DeriveArgs),
    /// Phase 4: apply confident derivations to the corpus.
    Apply(ApplyArgs),
    /// Phase 5: merge phase artifacts into summary, full report and review export.
    Report(ReportArgs),
    /// Phases 1-5 chained in memory.
    Pipeline(PipelineArgs),
    /// Match cookware mentions and link recipes to the equipment catalog.
    LinkEquipment(LinkEquipmentArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CorpusArgs {
    #[arg(long, default_value = ".cache/recipe-qa")]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub reports_dir: Option<PathBuf>,

    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CorpusArgs {
    pub fn db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.cache_root.join("recipes.sqlite"))
    }

    pub fn reports_dir(&self) -> PathBuf {
        self.reports_dir
            .clone()
            .unwrap_or_else(|| self.cache_root.join("qa-reports"))
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RunMode {
    DryRun,
    Apply,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry-run",
            Self::Apply => "apply",
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == Self::DryRun
    }
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long = "url")]
    pub urls: Vec<String>,

    #[arg(long)]
    pub url_file: Option<PathBuf>,

    /// Source entity (chef or collection) the recipes are attributed to.
    #[arg(long)]
    pub chef: String,

    #[arg(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct AuditArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeriveArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    /// Also derive for records whose Phase 2 match quality is low.
    #[arg(long, default_value_t = false)]
    pub include_low_match: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long, value_enum, default_value_t = RunMode::DryRun)]
    pub mode: RunMode,

    #[arg(long)]
    pub min_confidence: Option<f64>,

    /// Re-apply fixes to records already marked fixed.
    #[arg(long, default_value_t = false)]
    pub reapply: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long, value_enum, default_value_t = RunMode::DryRun)]
    pub mode: RunMode,

    #[arg(long)]
    pub min_confidence: Option<f64>,

    #[arg(long, default_value_t = false)]
    pub reapply: bool,

    #[arg(long, default_value_t = false)]
    pub include_low_match: bool,

    /// Stop after Phase 2 and skip derivation/apply.
    #[arg(long, default_value_t = false)]
    pub skip_derive: bool,

    #[arg(long, default_value_t = false)]
    pub no_checkpoints: bool,

    #[arg(long)]
    pub delay_ms: Option<u64>,
}

#[derive(Args, Debug, Clone)]
pub struct LinkEquipmentArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[arg(long, value_enum, default_value_t = RunMode::DryRun)]
    pub mode: RunMode,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,
}
