use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::*;

/// One catalog entity plus the mention patterns that link a recipe to it.
#[derive(Debug)]
pub struct EquipmentRule {
    pub canonical: &'static str,
    pub display_name: &'static str,
    pub patterns: &'static [&'static str],
    pub category: &'static str,
    pub metadata: &'static [(&'static str, &'static str)],
}

impl EquipmentRule {
    pub fn metadata_json(&self) -> String {
        let object = self
            .metadata
            .iter()
            .map(|(key, value)| (key.to_string(), Value::from(*value)))
            .collect::<Map<String, Value>>();
        Value::Object(object).to_string()
    }
}

pub const EQUIPMENT_RULES: &[EquipmentRule] = &[
    EquipmentRule {
        canonical: "skillet",
        display_name: "Skillet",
        patterns: &[r"\bskillets?\b", r"\bfrying pans?\b", r"\bcast[- ]iron pans?\b"],
        category: "cookware",
        metadata: &[("heat", "stovetop")],
    },
    EquipmentRule {
        canonical: "saucepan",
        display_name: "Saucepan",
        patterns: &[r"\bsauce\s?pans?\b"],
        category: "cookware",
        metadata: &[("heat", "stovetop")],
    },
    EquipmentRule {
        canonical: "dutch_oven",
        display_name: "Dutch Oven",
        patterns: &[r"\bdutch ovens?\b"],
        category: "cookware",
        metadata: &[("heat", "stovetop_or_oven")],
    },
    EquipmentRule {
        canonical: "sheet_pan",
        display_name: "Sheet Pan",
        patterns: &[r"\bsheet pans?\b", r"\bbaking sheets?\b", r"\bcookie sheets?\b"],
        category: "bakeware",
        metadata: &[("heat", "oven")],
    },
    EquipmentRule {
        canonical: "stand_mixer",
        display_name: "Stand Mixer",
        patterns: &[r"\bstand mixers?\b", r"\bpaddle attachment\b", r"\bdough hook\b"],
        category: "appliance",
        metadata: &[("power", "electric")],
    },
    EquipmentRule {
        canonical: "food_processor",
        display_name: "Food Processor",
        patterns: &[r"\bfood processors?\b"],
        category: "appliance",
        metadata: &[("power", "electric")],
    },
    EquipmentRule {
        canonical: "blender",
        display_name: "Blender",
        patterns: &[r"\bblenders?\b", r"\bblend until smooth\b"],
        category: "appliance",
        metadata: &[("power", "electric")],
    },
    EquipmentRule {
        canonical: "whisk",
        display_name: "Whisk",
        patterns: &[r"\bwhisks?\b", r"\bwhisked\b", r"\bwhisking\b"],
        category: "tool",
        metadata: &[],
    },
    EquipmentRule {
        canonical: "stockpot",
        display_name: "Stockpot",
        patterns: &[r"\bstock\s?pots?\b", r"\blarge pot\b"],
        category: "cookware",
        metadata: &[("heat", "stovetop")],
    },
    EquipmentRule {
        canonical: "grill_pan",
        display_name: "Grill Pan",
        patterns: &[r"\bgrill pans?\b"],
        category: "cookware",
        metadata: &[("heat", "stovetop")],
    },
    EquipmentRule {
        canonical: "slow_cooker",
        display_name: "Slow Cooker",
        patterns: &[r"\bslow cookers?\b", r"\bcrock\s?pots?\b"],
        category: "appliance",
        metadata: &[("power", "electric")],
    },
    EquipmentRule {
        canonical: "rolling_pin",
        display_name: "Rolling Pin",
        patterns: &[r"\brolling pins?\b"],
        category: "tool",
        metadata: &[],
    },
];

pub struct CompiledRule<'a> {
    pub rule: &'a EquipmentRule,
    matchers: Vec<Regex>,
}

impl CompiledRule<'_> {
    pub fn matches(&self, text: &str) -> bool {
        self.matchers.iter().any(|matcher| matcher.is_match(text))
    }
}

pub fn compile_rules(rules: &[EquipmentRule]) -> Result<Vec<CompiledRule<'_>>> {
    rules
        .iter()
        .map(|rule| {
            let matchers = rule
                .patterns
                .iter()
                .map(|pattern| {
                    RegexBuilder::new(pattern)
                        .case_insensitive(true)
                        .build()
                        .with_context(|| {
                            format!("failed to compile pattern {pattern} for {}", rule.canonical)
                        })
                })
                .collect::<Result<Vec<Regex>>>()?;
            Ok(CompiledRule { rule, matchers })
        })
        .collect()
}

pub(super) fn mention_text(recipe: &CorpusRecipe) -> String {
    [
        Some(recipe.name.as_str()),
        recipe.description.as_deref(),
        recipe.ingredients.as_deref(),
        recipe.instructions.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<&str>>()
    .join("\n")
}
