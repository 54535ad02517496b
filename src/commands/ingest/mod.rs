use crate::collab::ExtractionResponse;
use crate::config::ExtractionConfig;
use crate::model::{ExtractedRecipe, SourceDocument};

mod dedup;
mod durations;
mod extractor;
mod headings;
mod run;
mod structured;

pub use run::run;

#[cfg(test)]
use run::{ingest_urls, insert_failure_is_record_level};

use dedup::*;
use durations::*;
use extractor::*;
use headings::*;
use structured::*;
