use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub url: String,
    pub raw_text: String,
    pub metadata: SourceMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecipe {
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub prep_minutes: Option<u32>,
    pub cook_minutes: Option<u32>,
    pub total_minutes: Option<u32>,
    pub servings: Option<u32>,
    pub difficulty: Option<String>,
    pub cuisine: Option<String>,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorpusRecipe {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub ingredients: Option<String>,
    pub instructions: Option<String>,
    pub chef_name: Option<String>,
    pub source_url: Option<String>,
    pub is_public: bool,
    pub qa_status: String,
    pub qa_confidence: Option<f64>,
    pub qa_method: Option<String>,
    pub qa_notes: Option<String>,
    pub qa_issues_found: Option<String>,
    pub qa_fixes_applied: Option<String>,
    pub qa_timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    MissingIngredients,
    MissingInstructions,
    IngredientMismatch,
    MalformedJson,
    EmptyStrings,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingIngredients => "missing_ingredients",
            Self::MissingInstructions => "missing_instructions",
            Self::IngredientMismatch => "ingredient_mismatch",
            Self::MalformedJson => "malformed_json",
            Self::EmptyStrings => "empty_strings",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorruptionType {
    EmptyInstructions,
    EmptyIngredients,
    Both,
    None,
}

impl CorruptionType {
    pub fn from_flags(ingredients_invalid: bool, instructions_invalid: bool) -> Self {
        match (ingredients_invalid, instructions_invalid) {
            (true, true) => Self::Both,
            (true, false) => Self::EmptyIngredients,
            (false, true) => Self::EmptyInstructions,
            (false, false) => Self::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptyInstructions => "empty_instructions",
            Self::EmptyIngredients => "empty_ingredients",
            Self::Both => "both",
            Self::None => "none",
        }
    }

    pub fn missing_ingredients(self) -> bool {
        matches!(self, Self::EmptyIngredients | Self::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaFinding {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub corruption_type: CorruptionType,
    pub details: String,
    pub source: String,
    pub is_public: bool,
    #[serde(default)]
    pub known_bad_name: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureSummary {
    pub defective_records: usize,
    pub by_corruption_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    pub by_visibility: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub known_bad_name_overrides: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub run_id: String,
    pub generated_at: String,
    pub total_recipes: usize,
    pub summary: StructureSummary,
    pub findings: Vec<QaFinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchBucket {
    Perfect,
    High,
    Medium,
    Low,
    ExtractionError,
}

impl MatchBucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::ExtractionError => "extraction_error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientMatch {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub free_text_count: usize,
    pub relation_count: usize,
    pub matched_count: usize,
    pub match_ratio: Option<f64>,
    pub bucket: MatchBucket,
    pub unmatched_lines: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchBucketCounts {
    pub perfect: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub extraction_error: usize,
}

impl MatchBucketCounts {
    pub fn record(&mut self, bucket: MatchBucket) {
        match bucket {
            MatchBucket::Perfect => self.perfect += 1,
            MatchBucket::High => self.high += 1,
            MatchBucket::Medium => self.medium += 1,
            MatchBucket::Low => self.low += 1,
            MatchBucket::ExtractionError => self.extraction_error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.perfect + self.high + self.medium + self.low + self.extraction_error
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub run_id: String,
    pub generated_at: String,
    pub records_compared: usize,
    pub records_without_relations: usize,
    pub buckets: MatchBucketCounts,
    pub results: Vec<IngredientMatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedIngredient {
    pub ingredient: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationResult {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub original_ingredients: Vec<String>,
    pub derived_ingredients: Vec<DerivedIngredient>,
    pub confidence: f64,
    pub validation_notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivationReport {
    pub run_id: String,
    pub generated_at: String,
    pub candidates: usize,
    pub derived: usize,
    pub failed: usize,
    pub high_confidence: usize,
    pub results: Vec<DerivationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Backup {
    pub recipe_id: i64,
    pub full_field_snapshot: serde_json::Map<String, serde_json::Value>,
    pub snapshot_sha256: String,
    pub backup_timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupFile {
    pub run_id: String,
    pub created_at: String,
    pub record_count: usize,
    pub backups: Vec<Backup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyStatus {
    Applied,
    Skipped,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyLogEntry {
    pub recipe_id: i64,
    pub recipe_name: String,
    pub status: ApplyStatus,
    pub confidence: f64,
    pub ingredients_before: usize,
    pub ingredients_after: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplyLog {
    pub run_id: String,
    pub mode: String,
    pub min_confidence: f64,
    pub started_at: String,
    pub completed_at: String,
    pub total_fixes: usize,
    pub applied_fixes: usize,
    pub skipped_fixes: usize,
    pub errors: usize,
    pub backup_created: bool,
    pub backup_path: Option<String>,
    pub entries: Vec<ApplyLogEntry>,
}

impl ApplyLog {
    pub fn totals_consistent(&self) -> bool {
        self.total_fixes == self.applied_fixes + self.skipped_fixes + self.errors
            && self.total_fixes == self.entries.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestOutcome {
    Inserted,
    DuplicateExact,
    DuplicateFuzzy,
    RetrievalFailed,
    ParseFailed,
    QualityRejected,
    InsertFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEntry {
    pub url: String,
    pub outcome: IngestOutcome,
    pub title: Option<String>,
    pub recipe_id: Option<i64>,
    pub parse_path: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestCounts {
    pub urls: usize,
    pub inserted: usize,
    pub duplicate_exact: usize,
    pub duplicate_fuzzy: usize,
    pub retrieval_failed: usize,
    pub parse_failed: usize,
    pub quality_rejected: usize,
    pub insert_failed: usize,
}

impl IngestCounts {
    pub fn record(&mut self, outcome: IngestOutcome) {
        self.urls += 1;
        match outcome {
            IngestOutcome::Inserted => self.inserted += 1,
            IngestOutcome::DuplicateExact => self.duplicate_exact += 1,
            IngestOutcome::DuplicateFuzzy => self.duplicate_fuzzy += 1,
            IngestOutcome::RetrievalFailed => self.retrieval_failed += 1,
            IngestOutcome::ParseFailed => self.parse_failed += 1,
            IngestOutcome::QualityRejected => self.quality_rejected += 1,
            IngestOutcome::InsertFailed => self.insert_failed += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: String,
    pub started_at: String,
    pub completed_at: String,
    pub chef: String,
    pub counts: IngestCounts,
    pub entries: Vec<IngestEntry>,
}

pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}
