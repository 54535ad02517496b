use serde::{Deserialize, Deserializer, Serialize};

use super::CollaboratorError;
use crate::model::{SourceMetadata, clamp_confidence};

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionRequest<'a> {
    pub text: &'a str,
    pub url: &'a str,
    pub metadata: &'a SourceMetadata,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractedIngredient {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ExtractedIngredient {
    pub fn is_optional(&self) -> bool {
        self.notes
            .as_deref()
            .map(|notes| notes.to_ascii_lowercase().contains("optional"))
            .unwrap_or(false)
    }

    pub fn to_line(&self) -> String {
        [self.amount.as_deref(), self.unit.as_deref(), Some(self.name.as_str())]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<&str>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExtractionResponse {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<ExtractedIngredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    pub confidence: f64,
    #[serde(default)]
    pub validation_notes: Vec<String>,
}

pub trait RecipeExtractor {
    /// `Ok(None)` when the collaborator does not recognise the input as a recipe.
    fn extract(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<ExtractionResponse>, CollaboratorError>;
}

/// Clamps the self-reported confidence and drops responses under `min_confidence`.
pub fn accept_extraction(
    response: Option<ExtractionResponse>,
    min_confidence: f64,
) -> Option<ExtractionResponse> {
    let mut response = response?;
    response.confidence = clamp_confidence(response.confidence);
    if response.confidence < min_confidence {
        return None;
    }
    Some(response)
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(text)) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Some(serde_json::Value::Number(number)) => Some(number.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_amounts_deserialize_as_strings() {
        let response: ExtractionResponse = serde_json::from_str(
            r#"{
              "name": "Pancakes",
              "ingredients": [
                {"name": "flour", "amount": 2, "unit": "cups"},
                {"name": "salt", "amount": null, "notes": "optional, to taste"}
              ],
              "instructions": ["Mix", "Cook"],
              "confidence": 0.8
            }"#,
        )
        .expect("parse");

        assert_eq!(response.ingredients[0].amount.as_deref(), Some("2"));
        assert_eq!(response.ingredients[0].to_line(), "2 cups flour");
        assert!(response.ingredients[1].amount.is_none());
        assert!(response.ingredients[1].is_optional());
    }

    #[test]
    fn low_confidence_is_treated_as_failure() {
        let response = ExtractionResponse {
            name: "Soup".to_string(),
            description: None,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            confidence: 0.49,
            validation_notes: Vec::new(),
        };
        assert!(accept_extraction(Some(response.clone()), 0.5).is_none());

        let mut confident = response;
        confident.confidence = 1.7;
        let accepted = accept_extraction(Some(confident), 0.5).expect("accepted");
        assert_eq!(accepted.confidence, 1.0);
    }
}
