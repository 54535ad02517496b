use std::collections::HashSet;

use serde_json::Value;

const NAME_KEYS: [&str; 3] = ["name", "ingredient", "item"];

/// Free-text ingredient lines stored as a JSON list of strings or of `{name, ...}` objects.
pub fn free_text_lines(raw: &str) -> Result<Vec<String>, String> {
    let value = serde_json::from_str::<Value>(raw)
        .map_err(|err| format!("ingredients are not valid json: {err}"))?;
    let Value::Array(items) = value else {
        return Err("ingredients are not a json list".to_string());
    };

    let mut lines = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let line = match item {
            Value::String(text) => text.trim().to_string(),
            Value::Object(map) => NAME_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(|text| text.trim().to_string())
                .ok_or_else(|| format!("ingredient entry {index} has no name"))?,
            Value::Null => String::new(),
            other => return Err(format!("ingredient entry {index} is not text: {other}")),
        };
        if !line.is_empty() {
            lines.push(line);
        }
    }

    Ok(lines)
}

pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .map(singular)
        .collect()
}

fn singular(token: &str) -> String {
    if let Some(stem) = token.strip_suffix("ies").filter(|stem| stem.len() > 2) {
        return format!("{stem}y");
    }
    if let Some(stem) = token.strip_suffix("oes").filter(|stem| stem.len() > 2) {
        return format!("{stem}o");
    }
    if token.len() > 3 && token.ends_with('s') && !token.ends_with("ss") {
        return token[..token.len() - 1].to_string();
    }
    token.to_string()
}

/// A line corresponds to a relation when every token of the relation name appears in it.
pub fn line_matches(line_tokens: &HashSet<String>, relation_tokens: &[String]) -> bool {
    !relation_tokens.is_empty() && relation_tokens.iter().all(|token| line_tokens.contains(token))
}
