use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefect {
    /// NULL column, empty string or JSON `null`.
    Missing,
    EmptyArray,
    /// A non-empty array in which every element is blank.
    BlankEntries,
    /// Not JSON, or JSON that is not a list.
    Malformed,
}

impl FieldDefect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::EmptyArray => "empty array",
            Self::BlankEntries => "only blank entries",
            Self::Malformed => "malformed json",
        }
    }
}

pub fn classify_field(value: Option<&str>) -> Option<FieldDefect> {
    let Some(raw) = value else {
        return Some(FieldDefect::Missing);
    };
    if raw.trim().is_empty() {
        return Some(FieldDefect::Missing);
    }

    match serde_json::from_str::<Value>(raw) {
        Err(_) => Some(FieldDefect::Malformed),
        Ok(Value::Null) => Some(FieldDefect::Missing),
        Ok(Value::Array(items)) if items.is_empty() => Some(FieldDefect::EmptyArray),
        Ok(Value::Array(items)) if items.iter().all(is_blank) => Some(FieldDefect::BlankEntries),
        Ok(Value::Array(_)) => None,
        Ok(_) => Some(FieldDefect::Malformed),
    }
}

fn is_blank(item: &Value) -> bool {
    match item {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        _ => false,
    }
}
