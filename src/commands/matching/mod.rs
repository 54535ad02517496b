use crate::config::ThresholdConfig;
use crate::model::{CorpusRecipe, IngredientMatch, MatchBucket};

mod normalize;
mod run;
#[cfg(test)]
mod tests;

pub use normalize::free_text_lines;
pub use run::{match_corpus, run};

use normalize::*;
#[cfg(test)]
use run::{bucket_for, compare, match_record};
