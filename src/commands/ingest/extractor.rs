use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use super::*;

pub struct ExtractorPatterns {
    pub ld_json_block: Regex,
    pub markdown_heading: Regex,
    pub bold_heading: Regex,
    pub colon_heading: Regex,
    pub list_item: Regex,
    pub checkbox: Regex,
    pub step_prefix: Regex,
    pub markdown_link: Regex,
    pub markdown_image: Regex,
    pub html_image: Regex,
    pub ingredients_heading: Regex,
    pub instructions_heading: Regex,
    pub cuisine_line: Regex,
    pub difficulty_line: Regex,
    pub tags_line: Regex,
}

impl ExtractorPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            ld_json_block: Regex::new(r"(?is)<script[^>]*application/ld\+json[^>]*>(.*?)</script>")
                .context("failed to compile ld+json regex")?,
            markdown_heading: Regex::new(r"^(?P<hashes>#{1,6})\s+(?P<text>.+?)\s*#*\s*$")
                .context("failed to compile markdown heading regex")?,
            bold_heading: Regex::new(r"^(?:\*\*|__)(?P<text>[^*_]{1,60}?)(?:\*\*|__)\s*:?\s*$")
                .context("failed to compile bold heading regex")?,
            colon_heading: Regex::new(r"^(?P<text>[A-Za-z][A-Za-z &/\-]{1,40}):\s*$")
                .context("failed to compile colon heading regex")?,
            list_item: Regex::new(r"^\s*(?:[-*+•▪◦]|\d{1,2}[.)])\s+(?P<body>.+)$")
                .context("failed to compile list item regex")?,
            checkbox: Regex::new(r"^\[[ xX]\]\s*").context("failed to compile checkbox regex")?,
            step_prefix: Regex::new(r"(?i)^\s*step\s*\d+\s*[:.)\-]?\s*")
                .context("failed to compile step prefix regex")?,
            markdown_link: Regex::new(r"\[(?P<text>[^\]]+)\]\([^)]*\)")
                .context("failed to compile markdown link regex")?,
            markdown_image: Regex::new(r"!\[[^\]]*\]\((?P<url>[^)\s]+)[^)]*\)")
                .context("failed to compile markdown image regex")?,
            html_image: Regex::new(r#"(?i)<img[^>]+src=["'](?P<url>[^"']+)["']"#)
                .context("failed to compile html image regex")?,
            ingredients_heading: Regex::new(r"(?i)^ingredients?\b")
                .context("failed to compile ingredients heading regex")?,
            instructions_heading: Regex::new(
                r"(?i)^(?:instructions?|directions?|method|steps|preparation)\b",
            )
            .context("failed to compile instructions heading regex")?,
            cuisine_line: Regex::new(r"(?im)^\s*(?:\*\*)?cuisine(?:\*\*)?\s*:\s*(?:\*\*)?\s*(?P<v>.+?)\s*$")
                .context("failed to compile cuisine regex")?,
            difficulty_line: Regex::new(
                r"(?im)^\s*(?:\*\*)?(?:difficulty|skill level)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(?P<v>.+?)\s*$",
            )
            .context("failed to compile difficulty regex")?,
            tags_line: Regex::new(r"(?im)^\s*(?:\*\*)?(?:tags|keywords)(?:\*\*)?\s*:\s*(?:\*\*)?\s*(?P<v>.+?)\s*$")
                .context("failed to compile tags regex")?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParsePath {
    StructuredData,
    Headings,
    Collaborator,
}

impl ParsePath {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StructuredData => "structured_data",
            Self::Headings => "headings",
            Self::Collaborator => "collaborator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    NoTitle,
    QualityGate {
        ingredients: usize,
        instructions: usize,
    },
}

impl Rejection {
    pub fn describe(&self, config: &ExtractionConfig) -> String {
        match self {
            Self::NoTitle => "no recognizable recipe structure or title".to_string(),
            Self::QualityGate {
                ingredients,
                instructions,
            } => format!(
                "quality gate: {ingredients} ingredients (min {}), {instructions} instructions (min {})",
                config.min_ingredients, config.min_instructions
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Accepted {
        recipe: ExtractedRecipe,
        path: ParsePath,
    },
    Rejected(Rejection),
}

pub struct ContentExtractor {
    config: ExtractionConfig,
    patterns: ExtractorPatterns,
    durations: DurationPatterns,
}

impl ContentExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            patterns: ExtractorPatterns::new()?,
            durations: DurationPatterns::new()?,
        })
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extract(&self, document: &SourceDocument) -> ExtractionOutcome {
        let mut rejection = Rejection::NoTitle;

        if let Some(node) = find_structured_recipe(&self.patterns, &document.raw_text) {
            let candidate = recipe_from_structured(&self.patterns, &self.durations, document, &node);
            match self.gate(candidate) {
                Ok(recipe) => {
                    return ExtractionOutcome::Accepted {
                        recipe,
                        path: ParsePath::StructuredData,
                    };
                }
                Err(reason) => rejection = reason,
            }
        }

        if let Some(candidate) = recipe_from_headings(&self.patterns, &self.durations, &self.config, document) {
            match self.gate(candidate) {
                Ok(recipe) => {
                    return ExtractionOutcome::Accepted {
                        recipe,
                        path: ParsePath::Headings,
                    };
                }
                Err(reason) => {
                    if rejection == Rejection::NoTitle {
                        rejection = reason;
                    }
                }
            }
        }

        ExtractionOutcome::Rejected(rejection)
    }

    /// The quality gate: a title, and at least one of the ingredient or instruction
    /// counts meeting its configured minimum.
    pub fn gate(&self, recipe: ExtractedRecipe) -> Result<ExtractedRecipe, Rejection> {
        if recipe.title.trim().is_empty() {
            return Err(Rejection::NoTitle);
        }

        if recipe.ingredients.len() < self.config.min_ingredients
            && recipe.instructions.len() < self.config.min_instructions
        {
            return Err(Rejection::QualityGate {
                ingredients: recipe.ingredients.len(),
                instructions: recipe.instructions.len(),
            });
        }

        Ok(recipe)
    }

    pub fn recipe_from_collaborator(
        &self,
        document: &SourceDocument,
        response: &ExtractionResponse,
    ) -> ExtractedRecipe {
        let times = self.durations.find_times(&document.raw_text);
        ExtractedRecipe {
            url: document.url.clone(),
            title: clean_title(&response.name),
            description: response
                .description
                .clone()
                .or_else(|| non_empty(document.metadata.description.as_deref())),
            ingredients: response
                .ingredients
                .iter()
                .map(|ingredient| ingredient.to_line())
                .filter(|line| !line.is_empty())
                .collect(),
            instructions: response
                .instructions
                .iter()
                .map(|step| clean_inline(&self.patterns, strip_step_prefix(&self.patterns, step)))
                .filter(|step| !step.is_empty())
                .collect(),
            prep_minutes: times.prep_minutes,
            cook_minutes: times.cook_minutes,
            total_minutes: times.total_minutes,
            servings: self.durations.find_servings(&document.raw_text),
            difficulty: None,
            cuisine: None,
            tags: Vec::new(),
            image_url: first_image(&self.patterns, &document.raw_text)
                .or_else(|| non_empty(document.metadata.image.as_deref())),
        }
    }
}

pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(ToOwned::to_owned)
}

pub fn clean_title(title: &str) -> String {
    let base = title.split(" | ").next().unwrap_or(title);
    base.split_whitespace().collect::<Vec<&str>>().join(" ")
}

pub fn clean_inline(patterns: &ExtractorPatterns, text: &str) -> String {
    let without_checkbox = patterns.checkbox.replace(text.trim(), "");
    let without_links = patterns.markdown_link.replace_all(&without_checkbox, "$text");
    without_links
        .replace("**", "")
        .replace("__", "")
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

pub fn strip_step_prefix<'a>(patterns: &ExtractorPatterns, text: &'a str) -> &'a str {
    match patterns.step_prefix.find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    }
}

pub fn first_image(patterns: &ExtractorPatterns, text: &str) -> Option<String> {
    let markdown = patterns
        .markdown_image
        .captures(text)
        .map(|c| (c.get(0).map(|m| m.start()).unwrap_or(0), c["url"].to_string()));
    let html = patterns
        .html_image
        .captures(text)
        .map(|c| (c.get(0).map(|m| m.start()).unwrap_or(0), c["url"].to_string()));

    match (markdown, html) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a.1 } else { b.1 }),
        (Some(a), None) => Some(a.1),
        (None, Some(b)) => Some(b.1),
        (None, None) => None,
    }
}
