use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use regex::{Regex, RegexBuilder};
use rusqlite::Connection;
use tracing::{info, warn};

use super::*;
use crate::artifacts::ArtifactPaths;
use crate::cli::AuditArgs;
use crate::config::load_config;
use crate::model::{StructureReport, StructureSummary};
use crate::store;
use crate::util::{now_utc_string, utc_compact_string, write_json_pretty};

const UNKNOWN_SOURCE: &str = "unknown";

/// Record names known out-of-band to belong to corrupted rows.
pub struct KnownBadNames {
    patterns: Vec<Regex>,
}

impl KnownBadNames {
    pub fn compile(config: &AuditConfig) -> Result<Self> {
        let patterns = config
            .known_corrupted_names
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .with_context(|| format!("failed to compile known corrupted name pattern {pattern}"))
            })
            .collect::<Result<Vec<Regex>>>()?;
        Ok(Self { patterns })
    }

    pub fn matches(&self, name: &str) -> bool {
        let name = name.trim();
        self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

pub fn run(args: AuditArgs) -> Result<()> {
    let config = load_config(args.corpus.config.as_deref())?;
    let paths = ArtifactPaths::new(&args.corpus.reports_dir());
    let connection = store::open_corpus_read_only(&args.corpus.db_path())?;

    let report = audit_corpus(&connection, &config.audit)?;
    write_json_pretty(&paths.structure_report, &report)?;

    info!(path = %paths.structure_report.display(), "wrote structure report");
    Ok(())
}

pub fn audit_corpus(connection: &Connection, config: &AuditConfig) -> Result<StructureReport> {
    let recipes = store::load_corpus(connection).context("failed to load corpus for audit")?;
    scan(&recipes, config)
}

pub fn scan(recipes: &[CorpusRecipe], config: &AuditConfig) -> Result<StructureReport> {
    let known_bad = KnownBadNames::compile(config)?;
    let mut summary = StructureSummary::default();
    let mut findings = Vec::new();

    for recipe in recipes {
        let Some(finding) = inspect(recipe, &known_bad) else {
            continue;
        };

        summary.defective_records += 1;
        if finding.known_bad_name {
            summary.known_bad_name_overrides += 1;
        }
        bump(&mut summary.by_corruption_type, finding.corruption_type.as_str());
        bump(&mut summary.by_severity, finding.severity.as_str());
        bump(
            &mut summary.by_visibility,
            if finding.is_public { "public" } else { "private" },
        );
        bump(&mut summary.by_source, &finding.source);
        findings.push(finding);
    }

    if summary.known_bad_name_overrides > 0 {
        warn!(
            overrides = summary.known_bad_name_overrides,
            "records force-classified by known corrupted name"
        );
    }

    info!(
        total_recipes = recipes.len(),
        defective = summary.defective_records,
        both = summary.by_corruption_type.get("both").copied().unwrap_or(0),
        empty_ingredients = summary.by_corruption_type.get("empty_ingredients").copied().unwrap_or(0),
        empty_instructions = summary.by_corruption_type.get("empty_instructions").copied().unwrap_or(0),
        "structure scan completed"
    );

    Ok(StructureReport {
        run_id: format!("structure-{}", utc_compact_string(Utc::now())),
        generated_at: now_utc_string(),
        total_recipes: recipes.len(),
        summary,
        findings,
    })
}

fn inspect(recipe: &CorpusRecipe, known_bad: &KnownBadNames) -> Option<QaFinding> {
    let ingredients = classify_field(recipe.ingredients.as_deref());
    let instructions = classify_field(recipe.instructions.as_deref());
    let known_bad_name = known_bad.matches(&recipe.name);

    let corruption_type = if known_bad_name {
        CorruptionType::Both
    } else {
        CorruptionType::from_flags(ingredients.is_some(), instructions.is_some())
    };
    if corruption_type == CorruptionType::None {
        return None;
    }

    Some(QaFinding {
        recipe_id: recipe.id,
        recipe_name: recipe.name.clone(),
        issue_type: issue_type(ingredients, instructions),
        severity: severity_for(corruption_type),
        corruption_type,
        details: describe(ingredients, instructions, known_bad_name),
        source: recipe
            .chef_name
            .clone()
            .unwrap_or_else(|| UNKNOWN_SOURCE.to_string()),
        is_public: recipe.is_public,
        known_bad_name,
    })
}

fn issue_type(ingredients: Option<FieldDefect>, instructions: Option<FieldDefect>) -> IssueType {
    let defects = [ingredients, instructions];
    if defects.contains(&Some(FieldDefect::Malformed)) {
        return IssueType::MalformedJson;
    }
    if defects.contains(&Some(FieldDefect::BlankEntries)) {
        return IssueType::EmptyStrings;
    }

    match (ingredients, instructions) {
        (None, Some(_)) => IssueType::MissingInstructions,
        _ => IssueType::MissingIngredients,
    }
}

pub(super) fn severity_for(corruption_type: CorruptionType) -> Severity {
    match corruption_type {
        CorruptionType::Both => Severity::Critical,
        CorruptionType::EmptyIngredients => Severity::High,
        CorruptionType::EmptyInstructions => Severity::Medium,
        CorruptionType::None => Severity::Low,
    }
}

fn describe(
    ingredients: Option<FieldDefect>,
    instructions: Option<FieldDefect>,
    known_bad_name: bool,
) -> String {
    let state = |defect: Option<FieldDefect>| defect.map(FieldDefect::as_str).unwrap_or("ok");
    let mut details = format!(
        "ingredients: {}; instructions: {}",
        state(ingredients),
        state(instructions)
    );
    if known_bad_name {
        details.push_str("; name matches a known corrupted record");
    }
    details
}

fn bump(counts: &mut BTreeMap<String, usize>, key: &str) {
    *counts.entry(key.to_string()).or_insert(0) += 1;
}
