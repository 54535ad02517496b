use serde::{Deserialize, Serialize};

use super::CollaboratorError;
use crate::model::{SourceDocument, SourceMetadata};

#[derive(Debug, Clone, Serialize)]
pub struct RetrievalRequest<'a> {
    pub url: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalResponse {
    pub success: bool,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub metadata: Option<SourceMetadata>,
    #[serde(default)]
    pub error: Option<String>,
}

impl RetrievalResponse {
    pub fn into_document(self, url: &str) -> Result<SourceDocument, CollaboratorError> {
        if !self.success {
            return Err(CollaboratorError::Unsuccessful {
                service: "retrieval",
                message: self.error.unwrap_or_else(|| "no error message".to_string()),
            });
        }

        let text = self.text.unwrap_or_default();
        if text.trim().is_empty() {
            return Err(CollaboratorError::Unsuccessful {
                service: "retrieval",
                message: "empty page text".to_string(),
            });
        }

        Ok(SourceDocument {
            url: url.to_string(),
            raw_text: text,
            metadata: self.metadata.unwrap_or_default(),
        })
    }
}

pub trait ContentRetriever {
    fn retrieve(&self, url: &str) -> Result<SourceDocument, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsuccessful_response_maps_to_error() {
        let response: RetrievalResponse =
            serde_json::from_str(r#"{"success": false, "error": "403 forbidden"}"#)
                .expect("parse");
        let err = response
            .into_document("https://example.com/a")
            .expect_err("failure");
        assert!(err.to_string().contains("403 forbidden"));
    }

    #[test]
    fn successful_response_carries_metadata() {
        let response: RetrievalResponse = serde_json::from_str(
            r##"{"success": true, "text": "# Pie", "metadata": {"title": "Pie"}}"##,
        )
        .expect("parse");
        let document = response
            .into_document("https://example.com/pie")
            .expect("document");
        assert_eq!(document.metadata.title.as_deref(), Some("Pie"));
        assert_eq!(document.url, "https://example.com/pie");
    }
}
