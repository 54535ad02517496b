use crate::model::CorpusRecipe;

mod link;
mod rules;

pub use link::run;

#[cfg(test)]
use link::link_equipment;
use rules::*;
