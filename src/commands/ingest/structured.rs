use serde_json::Value;

use super::*;

pub fn find_structured_recipe(patterns: &ExtractorPatterns, raw_text: &str) -> Option<Value> {
    let mut blocks = patterns
        .ld_json_block
        .captures_iter(raw_text)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect::<Vec<String>>();

    let trimmed = raw_text.trim();
    if blocks.is_empty() && (trimmed.starts_with('{') || trimmed.starts_with('[')) {
        blocks.push(trimmed.to_string());
    }

    blocks
        .iter()
        .filter_map(|block| serde_json::from_str::<Value>(block).ok())
        .find_map(|value| find_recipe_node(&value).cloned())
}

fn find_recipe_node(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find_map(find_recipe_node),
        Value::Object(map) => {
            if map.get("@type").map(type_is_recipe).unwrap_or(false) {
                return Some(value);
            }
            ["@graph", "mainEntity", "mainEntityOfPage"]
                .iter()
                .filter_map(|key| map.get(*key))
                .find_map(find_recipe_node)
        }
        _ => None,
    }
}

fn type_is_recipe(value: &Value) -> bool {
    match value {
        Value::String(kind) => kind.eq_ignore_ascii_case("recipe"),
        Value::Array(kinds) => kinds.iter().any(type_is_recipe),
        _ => false,
    }
}

pub fn recipe_from_structured(
    patterns: &ExtractorPatterns,
    durations: &DurationPatterns,
    document: &SourceDocument,
    node: &Value,
) -> ExtractedRecipe {
    let title = text_field(node, "name")
        .or_else(|| non_empty(document.metadata.title.as_deref()))
        .map(|title| clean_title(&title))
        .unwrap_or_default();

    let ingredients = string_list(node.get("recipeIngredient").or_else(|| node.get("ingredients")))
        .into_iter()
        .map(|line| clean_inline(patterns, &line))
        .filter(|line| !line.is_empty())
        .collect();

    let mut instructions = Vec::new();
    if let Some(value) = node.get("recipeInstructions") {
        collect_structured_steps(patterns, value, &mut instructions);
    }

    let minutes = |key: &str| text_field(node, key).and_then(|value| durations.parse_minutes(&value));
    let prep_minutes = minutes("prepTime");
    let cook_minutes = minutes("cookTime");
    let total_minutes = minutes("totalTime").or(match (prep_minutes, cook_minutes) {
        (Some(prep), Some(cook)) => total_of(prep, cook),
        _ => None,
    });

    let mut tags = split_keywords(node.get("keywords"));
    for category in string_list(node.get("recipeCategory")) {
        if !tags.iter().any(|tag: &String| tag.eq_ignore_ascii_case(&category)) {
            tags.push(category);
        }
    }

    ExtractedRecipe {
        url: document.url.clone(),
        title,
        description: text_field(node, "description")
            .or_else(|| non_empty(document.metadata.description.as_deref())),
        ingredients,
        instructions,
        prep_minutes,
        cook_minutes,
        total_minutes,
        servings: node.get("recipeYield").and_then(|value| yield_servings(durations, value)),
        difficulty: text_field(node, "difficulty"),
        cuisine: string_list(node.get("recipeCuisine")).into_iter().next(),
        tags,
        image_url: node
            .get("image")
            .and_then(image_url)
            .or_else(|| non_empty(document.metadata.image.as_deref())),
    }
}

fn collect_structured_steps(patterns: &ExtractorPatterns, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(text) => {
            for line in text.lines() {
                let cleaned = clean_inline(patterns, strip_step_prefix(patterns, line));
                if !cleaned.is_empty() {
                    out.push(cleaned);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_structured_steps(patterns, item, out);
            }
        }
        Value::Object(map) => {
            if let Some(children) = map.get("itemListElement") {
                collect_structured_steps(patterns, children, out);
            } else if let Some(text) = map.get("text").or_else(|| map.get("name")) {
                collect_structured_steps(patterns, text, out);
            }
        }
        _ => {}
    }
}

fn text_field(node: &Value, key: &str) -> Option<String> {
    match node.get(key)? {
        Value::String(text) => non_empty(Some(text.as_str())),
        Value::Number(number) => Some(number.to_string()),
        Value::Array(items) => items.iter().find_map(|item| item.as_str()).and_then(|text| non_empty(Some(text))),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(text)) => non_empty(Some(text.as_str())).into_iter().collect(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => non_empty(Some(text.as_str())),
                Value::Object(map) => map.get("name").and_then(Value::as_str).and_then(|text| non_empty(Some(text))),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn split_keywords(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(text)) => text
            .split(',')
            .filter_map(|part| non_empty(Some(part)))
            .collect(),
        other => string_list(other),
    }
}

fn yield_servings(durations: &DurationPatterns, value: &Value) -> Option<u32> {
    match value {
        Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()).filter(|n| *n > 0),
        Value::String(text) => durations.find_servings(&format!("serves {text}")),
        Value::Array(items) => items.iter().find_map(|item| yield_servings(durations, item)),
        _ => None,
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(url) => non_empty(Some(url.as_str())),
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(map) => map.get("url").or_else(|| map.get("contentUrl")).and_then(image_url),
        _ => None,
    }
}
