use crate::cli::RunMode;
use crate::collab::RecipeExtractor;
use crate::config::QaConfig;

mod run;

pub use run::run;

#[cfg(test)]
use run::{PipelineOptions, run_pipeline};
