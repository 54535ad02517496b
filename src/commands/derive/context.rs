use serde_json::Value;

use super::*;
use crate::commands::audit::{FieldDefect, classify_field};
use crate::commands::matching::free_text_lines;

/// Plain-text context sent to the extraction collaborator.
pub fn build_context(recipe: &CorpusRecipe) -> String {
    let mut out = format!("Recipe: {}\n", recipe.name.trim());

    if let Some(description) = recipe.description.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        out.push_str(&format!("Description: {description}\n"));
    }

    let steps = instruction_steps(recipe.instructions.as_deref());
    if !steps.is_empty() {
        out.push_str("\nInstructions:\n");
        for (index, step) in steps.iter().enumerate() {
            out.push_str(&format!("{}. {step}\n", index + 1));
        }
    }

    let partial = partial_ingredients(recipe);
    if !partial.is_empty() {
        out.push_str("\nPartial ingredients:\n");
        for line in &partial {
            out.push_str(&format!("- {line}\n"));
        }
    }

    out
}

pub(super) fn partial_ingredients(recipe: &CorpusRecipe) -> Vec<String> {
    let Some(raw) = recipe.ingredients.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };
    match free_text_lines(raw) {
        Ok(lines) => lines,
        Err(_) if classify_field(Some(raw)) == Some(FieldDefect::Malformed) => vec![raw.to_string()],
        Err(_) => Vec::new(),
    }
}

fn instruction_steps(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.trim().to_string()),
                Value::Object(map) => map.get("text").and_then(Value::as_str).map(|text| text.trim().to_string()),
                _ => None,
            })
            .filter(|step| !step.is_empty())
            .collect(),
        Ok(Value::Null) => Vec::new(),
        Ok(Value::String(text)) => text_lines(&text),
        _ => text_lines(raw),
    }
}

fn text_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}
