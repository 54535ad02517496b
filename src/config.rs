use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

pub const API_TOKEN_ENV: &str = "RECIPE_QA_API_TOKEN";

/// Every tunable threshold used across ingestion and the QA phases.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QaConfig {
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub collaborators: CollaboratorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdConfig {
    /// Fuzzy title similarity at or above which a candidate is a duplicate.
    #[serde(default = "default_title_similarity")]
    pub title_similarity: f64,
    /// Minimum derivation confidence for FixApplier to write a fix.
    #[serde(default = "default_apply_min_confidence")]
    pub apply_min_confidence: f64,
    /// Derivations below this (and above zero) are routed to manual review.
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,
    #[serde(default = "default_match_high")]
    pub match_high: f64,
    #[serde(default = "default_match_medium")]
    pub match_medium: f64,
    /// Extraction collaborator responses below this are treated as failures.
    #[serde(default = "default_collaborator_min_confidence")]
    pub collaborator_min_confidence: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            title_similarity: default_title_similarity(),
            apply_min_confidence: default_apply_min_confidence(),
            high_confidence: default_high_confidence(),
            match_high: default_match_high(),
            match_medium: default_match_medium(),
            collaborator_min_confidence: default_collaborator_min_confidence(),
        }
    }
}

fn default_title_similarity() -> f64 {
    0.85
}
fn default_apply_min_confidence() -> f64 {
    0.90
}
fn default_high_confidence() -> f64 {
    0.90
}
fn default_match_high() -> f64 {
    0.80
}
fn default_match_medium() -> f64 {
    0.60
}
fn default_collaborator_min_confidence() -> f64 {
    0.5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_min_ingredients")]
    pub min_ingredients: usize,
    #[serde(default = "default_min_instructions")]
    pub min_instructions: usize,
    /// Paragraphs shorter than this are not treated as instruction steps.
    #[serde(default = "default_min_instruction_chars")]
    pub min_instruction_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_ingredients: default_min_ingredients(),
            min_instructions: default_min_instructions(),
            min_instruction_chars: default_min_instruction_chars(),
        }
    }
}

fn default_min_ingredients() -> usize {
    3
}
fn default_min_instructions() -> usize {
    2
}
fn default_min_instruction_chars() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_known_corrupted_names")]
    pub known_corrupted_names: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            known_corrupted_names: default_known_corrupted_names(),
        }
    }
}

fn default_known_corrupted_names() -> Vec<String> {
    vec![
        r"^untitled(\s+recipe)?$".to_string(),
        r"lorem ipsum".to_string(),
        r"^test recipe\b".to_string(),
        r"^\[object object\]$".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollaboratorConfig {
    #[serde(default)]
    pub retrieval_url: Option<String>,
    #[serde(default)]
    pub extraction_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            retrieval_url: None,
            extraction_url: None,
            timeout_secs: default_timeout_secs(),
            request_delay_ms: default_request_delay_ms(),
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_retry_delay_ms() -> u64 {
    2000
}

impl CollaboratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl QaConfig {
    pub fn validate(&self) -> Result<()> {
        let thresholds = &self.thresholds;
        for (name, value) in [
            ("thresholds.title_similarity", thresholds.title_similarity),
            ("thresholds.apply_min_confidence", thresholds.apply_min_confidence),
            ("thresholds.high_confidence", thresholds.high_confidence),
            ("thresholds.match_high", thresholds.match_high),
            ("thresholds.match_medium", thresholds.match_medium),
            (
                "thresholds.collaborator_min_confidence",
                thresholds.collaborator_min_confidence,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) {
                bail!("{name} must be in [0.0, 1.0], got {value}");
            }
        }

        if thresholds.match_medium > thresholds.match_high {
            bail!(
                "thresholds.match_medium ({}) must not exceed thresholds.match_high ({})",
                thresholds.match_medium,
                thresholds.match_high
            );
        }

        if self.collaborators.timeout_secs == 0 {
            bail!("collaborators.timeout_secs must be > 0");
        }

        for pattern in &self.audit.known_corrupted_names {
            regex::Regex::new(pattern)
                .with_context(|| format!("invalid audit.known_corrupted_names pattern: {pattern}"))?;
        }

        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<QaConfig> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            toml::from_str::<QaConfig>(&content)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?
        }
        None => QaConfig::default(),
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = QaConfig::default();
        assert_eq!(config.thresholds.title_similarity, 0.85);
        assert_eq!(config.thresholds.apply_min_confidence, 0.90);
        assert_eq!(config.thresholds.match_high, 0.80);
        assert_eq!(config.thresholds.match_medium, 0.60);
        assert_eq!(config.extraction.min_ingredients, 3);
        assert_eq!(config.extraction.min_instructions, 2);
        assert_eq!(config.collaborators.max_retries, 0);
        config.validate().expect("defaults validate");
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let config: QaConfig = toml::from_str(
            "
            [thresholds]
            apply_min_confidence = 0.95

            [collaborators]
            extraction_url = \"http://localhost:8080/extract\"
            request_delay_ms = 0
            ",
        )
        .expect("parse");

        assert_eq!(config.thresholds.apply_min_confidence, 0.95);
        assert_eq!(config.thresholds.title_similarity, 0.85);
        assert_eq!(config.collaborators.request_delay_ms, 0);
        assert_eq!(config.collaborators.timeout_secs, 30);
        assert_eq!(config.extraction.min_instructions, 2);
    }

    #[test]
    fn validate_rejects_out_of_range_threshold() {
        let mut config = QaConfig::default();
        config.thresholds.apply_min_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = QaConfig::default();
        config.thresholds.match_medium = 0.9;
        assert!(config.validate().is_err());
    }
}
