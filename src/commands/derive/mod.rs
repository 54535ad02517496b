use crate::collab::{ExtractionRequest, ExtractionResponse, RecipeExtractor};
use crate::config::ThresholdConfig;
use crate::model::{
    CorpusRecipe, DerivationReport, DerivationResult, DerivedIngredient, ExtractionReport,
    MatchBucket, StructureReport,
};

mod candidates;
mod context;
mod run;
#[cfg(test)]
mod tests;

pub use run::{DeriveOptions, derive_ingredients, run};

use candidates::*;
use context::*;
#[cfg(test)]
use run::derive_one;
