//! Stored form of a document.
//!
//! ```json
//! {
//!   "format": "funnel-document/1",
//!   "savedAt": "2024-05-01T12:00:00Z",
//!   "document": { "steps": [...], "activeStepId": "...", ... }
//! }
//! ```
//!
//! Loading checks the envelope format and the document's structural
//! integrity; a document with no steps, or one that would break id
//! uniqueness or the active-step rule, never reaches a store.

use crate::document::Document;
use crate::errors::SerializeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope format tag written by this version
pub const FORMAT: &str = "funnel-document/1";

/// Document plus save metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedDocument {
    pub format: String,
    pub saved_at: DateTime<Utc>,
    pub document: Document,
}

impl SerializedDocument {
    /// Wrap a snapshot, stamped with the current time
    pub fn new(document: Document) -> Self {
        Self {
            format: FORMAT.to_string(),
            saved_at: Utc::now(),
            document,
        }
    }

    pub fn to_json(&self) -> Result<String, SerializeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse and validate stored text
    pub fn from_json(text: &str) -> Result<Self, SerializeError> {
        let envelope: SerializedDocument = serde_json::from_str(text)?;
        envelope.validate()?;
        Ok(envelope)
    }

    pub fn validate(&self) -> Result<(), SerializeError> {
        if self.format != FORMAT {
            return Err(SerializeError::UnsupportedFormat(self.format.clone()));
        }
        self.document.check_integrity()?;
        Ok(())
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Component, IntegrityError, Step};
    use crate::ids::{ComponentId, StepId};
    use serde_json::json;

    fn sample() -> Document {
        let mut step = Step::new(StepId::new("step-1"), "Intro");
        step.components.push(Component {
            id: ComponentId::new("cmp-1"),
            type_name: "heading".to_string(),
            props: [("text".to_string(), json!("Hello"))].into_iter().collect(),
        });
        Document {
            steps: vec![step],
            active_step_id: Some(StepId::new("step-1")),
            version: 4,
            ..Document::default()
        }
    }

    #[test]
    fn test_envelope_shape() {
        let text = SerializedDocument::new(sample()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["format"], json!(FORMAT));
        assert!(value["savedAt"].is_string());
        assert_eq!(value["document"]["activeStepId"], json!("step-1"));
        assert_eq!(value["document"]["steps"][0]["components"][0]["type"], json!("heading"));
        assert_eq!(value["document"]["steps"][0]["settings"]["showHeader"], json!(true));
    }

    #[test]
    fn test_load_keeps_document_intact() {
        let saved = SerializedDocument::new(sample());
        let loaded = SerializedDocument::from_json(&saved.to_json().unwrap()).unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let mut doc = sample();
        let mut copy = doc.steps[0].clone();
        copy.id = StepId::new("step-2");
        doc.steps.push(copy);

        let text = SerializedDocument::new(doc).to_json().unwrap();
        assert!(matches!(
            SerializedDocument::from_json(&text),
            Err(SerializeError::Integrity(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_format() {
        let text = json!({
            "format": "funnel-document/99",
            "savedAt": "2024-05-01T12:00:00Z",
            "document": { "steps": [], "activeStepId": null }
        })
        .to_string();
        assert!(matches!(
            SerializedDocument::from_json(&text),
            Err(SerializeError::UnsupportedFormat(f)) if f == "funnel-document/99"
        ));
    }

    #[test]
    fn test_rejects_document_without_steps() {
        let text = json!({
            "format": FORMAT,
            "savedAt": "2024-05-01T12:00:00Z",
            "document": { "steps": [], "activeStepId": null }
        })
        .to_string();
        assert!(matches!(
            SerializedDocument::from_json(&text),
            Err(SerializeError::Integrity(IntegrityError::NoSteps))
        ));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            SerializedDocument::from_json("{ not json"),
            Err(SerializeError::Json(_))
        ));
    }
}
