use std::collections::HashMap;

use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRule {
    ExactUrl,
    FuzzyTitle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateVerdict {
    pub rule: DuplicateRule,
    pub matched_title: String,
    pub similarity: f64,
}

/// Case-insensitive normalized edit-distance similarity: `(maxLen - distance) / maxLen`.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.to_lowercase(), &b.to_lowercase())
}

fn source_key(source: &str) -> String {
    source.trim().to_lowercase()
}

pub struct DuplicateDetector {
    threshold: f64,
    titles_by_url: HashMap<String, String>,
    titles_by_source: HashMap<String, Vec<String>>,
}

impl DuplicateDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            titles_by_url: HashMap::new(),
            titles_by_source: HashMap::new(),
        }
    }

    pub fn from_corpus(connection: &Connection, threshold: f64) -> Result<Self> {
        let mut detector = Self::new(threshold);
        for (url, chef, title) in store::load_link_index(connection)? {
            detector.remember(&url, &title, chef.as_deref().unwrap_or_default());
        }
        Ok(detector)
    }

    pub fn remember(&mut self, url: &str, title: &str, source: &str) {
        self.titles_by_url
            .insert(url.to_string(), title.to_string());
        self.titles_by_source
            .entry(source_key(source))
            .or_default()
            .push(title.to_string());
    }

    pub fn check_url(&self, url: &str) -> Option<DuplicateVerdict> {
        self.titles_by_url
            .get(url)
            .map(|title| DuplicateVerdict {
                rule: DuplicateRule::ExactUrl,
                matched_title: title.clone(),
                similarity: 1.0,
            })
    }

    /// Exact URL first; otherwise the best fuzzy title match among titles from the same source.
    pub fn check(&self, url: &str, title: &str, source: &str) -> Option<DuplicateVerdict> {
        if let Some(verdict) = self.check_url(url) {
            return Some(verdict);
        }

        let existing = self.titles_by_source.get(&source_key(source))?;
        existing
            .iter()
            .map(|candidate| (candidate, title_similarity(title, candidate)))
            .filter(|(_, similarity)| *similarity >= self.threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, similarity)| DuplicateVerdict {
                rule: DuplicateRule::FuzzyTitle,
                matched_title: candidate.clone(),
                similarity,
            })
    }
}
