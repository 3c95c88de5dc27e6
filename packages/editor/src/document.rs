//! # Document Model
//!
//! The complete editable state of one funnel: ordered steps, each holding an
//! ordered list of typed components, plus the active step and selection.
//!
//! ```text
//! Document
//!   ├─ steps: [Step]            (page order)
//!   │    └─ components: [Component]   (render/tab order)
//!   ├─ active_step_id
//!   ├─ selection { step_id?, component_id? }
//!   └─ version
//! ```
//!
//! A `Document` is a plain value. The command layer produces new values from
//! old ones and the history keeps copies of them; nothing mutates a document
//! that someone else still holds.

use crate::ids::{ComponentId, StepId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Registry key of a component type (`"heading"`, `"button"`, ...)
pub type TypeName = String;

/// A single property value; any JSON value
pub type PropValue = serde_json::Value;

/// Property bag of a component, shaped by its registry entry
pub type Props = BTreeMap<String, PropValue>;

/// Editable funnel document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub steps: Vec<Step>,

    /// Empty only while `steps` is empty
    pub active_step_id: Option<StepId>,

    #[serde(default)]
    pub selection: Selection,

    /// Bumped by the store on every committed change
    #[serde(default)]
    pub version: u64,
}

/// One page of the funnel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub id: StepId,
    pub name: String,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub settings: StepSettings,
}

/// Per-step display flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSettings {
    pub show_header: bool,
    pub show_progress: bool,
    pub allow_return: bool,
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            show_header: true,
            show_progress: true,
            allow_return: false,
        }
    }
}

/// Partial update for [`StepSettings`]; `None` fields keep their value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_header: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_return: Option<bool>,
}

impl StepSettings {
    /// Apply a patch, returning the merged settings
    pub fn merged(self, patch: &StepSettingsPatch) -> Self {
        Self {
            show_header: patch.show_header.unwrap_or(self.show_header),
            show_progress: patch.show_progress.unwrap_or(self.show_progress),
            allow_return: patch.allow_return.unwrap_or(self.allow_return),
        }
    }
}

/// One content block placed on a step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: ComponentId,
    #[serde(rename = "type")]
    pub type_name: TypeName,
    #[serde(default)]
    pub props: Props,
}

impl Component {
    /// Read a string prop, if present and a string
    pub fn prop_str(&self, key: &str) -> Option<&str> {
        self.props.get(key).and_then(|v| v.as_str())
    }
}

/// At most one selected component, plus the step it lives on
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<ComponentId>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.step_id.is_none() && self.component_id.is_none()
    }

    pub fn is_component(&self, component_id: &ComponentId) -> bool {
        self.component_id.as_ref() == Some(component_id)
    }
}

/// Structural problems found when checking a document loaded from outside
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntegrityError {
    #[error("Duplicate step id: {0}")]
    DuplicateStepId(StepId),

    #[error("Duplicate component id: {0}")]
    DuplicateComponentId(ComponentId),

    #[error("Active step not found: {0}")]
    ActiveStepMissing(StepId),

    #[error("Document has steps but no active step")]
    NoActiveStep,

    #[error("Document has no steps")]
    NoSteps,
}

impl Document {
    /// Empty document with no steps
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self, step_id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == step_id)
    }

    pub fn step_mut(&mut self, step_id: &StepId) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| &s.id == step_id)
    }

    pub fn step_index(&self, step_id: &StepId) -> Option<usize> {
        self.steps.iter().position(|s| &s.id == step_id)
    }

    pub fn active_step(&self) -> Option<&Step> {
        self.active_step_id.as_ref().and_then(|id| self.step(id))
    }

    /// Look up a component within a specific step
    pub fn component(&self, step_id: &StepId, component_id: &ComponentId) -> Option<&Component> {
        self.step(step_id)?.component(component_id)
    }

    /// Find the step that owns a component
    pub fn owner_of(&self, component_id: &ComponentId) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.component_index(component_id).is_some())
    }

    /// Resolve the selection against the active step; stale ids yield `None`
    pub fn selected_component(&self) -> Option<&Component> {
        let component_id = self.selection.component_id.as_ref()?;
        let active = self.active_step()?;
        if let Some(selected_step) = &self.selection.step_id {
            if selected_step != &active.id {
                return None;
            }
        }
        active.component(component_id)
    }

    /// Total number of components across all steps
    pub fn component_count(&self) -> usize {
        self.steps.iter().map(|s| s.components.len()).sum()
    }

    /// Check id uniqueness, that at least one step exists, and the active-step invariant
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        let mut step_ids = HashSet::new();
        let mut component_ids = HashSet::new();

        for step in &self.steps {
            if !step_ids.insert(&step.id) {
                return Err(IntegrityError::DuplicateStepId(step.id.clone()));
            }
            for component in &step.components {
                if !component_ids.insert(&component.id) {
                    return Err(IntegrityError::DuplicateComponentId(component.id.clone()));
                }
            }
        }

        if self.steps.is_empty() {
            return Err(IntegrityError::NoSteps);
        }
        match &self.active_step_id {
            None => Err(IntegrityError::NoActiveStep),
            Some(id) if !step_ids.contains(id) => Err(IntegrityError::ActiveStepMissing(id.clone())),
            Some(_) => Ok(()),
        }
    }
}

impl Step {
    /// New step with no components and default settings
    pub fn new(id: StepId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            components: Vec::new(),
            settings: StepSettings::default(),
        }
    }

    pub fn component(&self, component_id: &ComponentId) -> Option<&Component> {
        self.components.iter().find(|c| &c.id == component_id)
    }

    pub fn component_index(&self, component_id: &ComponentId) -> Option<usize> {
        self.components.iter().position(|c| &c.id == component_id)
    }

    /// Component ids in render order
    pub fn component_ids(&self) -> Vec<ComponentId> {
        self.components.iter().map(|c| c.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Document {
        let mut step = Step::new(StepId::new("s1"), "Intro");
        step.components.push(Component {
            id: ComponentId::new("c1"),
            type_name: "heading".to_string(),
            props: Props::from([("text".to_string(), json!("Hi"))]),
        });
        Document {
            steps: vec![step, Step::new(StepId::new("s2"), "Offer")],
            active_step_id: Some(StepId::new("s1")),
            selection: Selection::default(),
            version: 0,
        }
    }

    #[test]
    fn test_selected_component_resolves_against_active_step() {
        let mut doc = sample();
        doc.selection = Selection {
            step_id: Some(StepId::new("s1")),
            component_id: Some(ComponentId::new("c1")),
        };
        assert_eq!(doc.selected_component().map(|c| c.id.as_str()), Some("c1"));

        doc.active_step_id = Some(StepId::new("s2"));
        assert!(doc.selected_component().is_none());
    }

    #[test]
    fn test_stale_selection_is_none() {
        let mut doc = sample();
        doc.selection.component_id = Some(ComponentId::new("gone"));
        assert!(doc.selected_component().is_none());
    }

    #[test]
    fn test_integrity_detects_duplicate_component_ids() {
        let mut doc = sample();
        let dup = doc.steps[0].components[0].clone();
        doc.steps[1].components.push(dup);
        assert_eq!(
            doc.check_integrity(),
            Err(IntegrityError::DuplicateComponentId(ComponentId::new("c1")))
        );
    }

    #[test]
    fn test_integrity_requires_active_step() {
        let mut doc = sample();
        doc.active_step_id = None;
        assert_eq!(doc.check_integrity(), Err(IntegrityError::NoActiveStep));

        doc.active_step_id = Some(StepId::new("nope"));
        assert!(matches!(
            doc.check_integrity(),
            Err(IntegrityError::ActiveStepMissing(_))
        ));
    }

    #[test]
    fn test_integrity_requires_at_least_one_step() {
        assert_eq!(Document::new().check_integrity(), Err(IntegrityError::NoSteps));

        let orphaned = Document {
            active_step_id: Some(StepId::new("s1")),
            ..Document::new()
        };
        assert_eq!(orphaned.check_integrity(), Err(IntegrityError::NoSteps));
    }

    #[test]
    fn test_settings_patch_merges_only_present_fields() {
        let settings = StepSettings::default().merged(&StepSettingsPatch {
            allow_return: Some(true),
            ..Default::default()
        });
        assert!(settings.show_header);
        assert!(settings.allow_return);
    }

    #[test]
    fn test_component_serializes_type_key() {
        let doc = sample();
        let value = serde_json::to_value(&doc.steps[0].components[0]).unwrap();
        assert_eq!(value["type"], "heading");
        assert_eq!(value["props"]["text"], "Hi");
    }
}
