//! # Commands
//!
//! The closed vocabulary of document edits. Every change to a funnel goes
//! through one of these.
//!
//! ## Design Principles
//!
//! 1. **Pure over snapshots**: `apply` reads the prior document and returns a
//!    new one; the input is never touched
//! 2. **Validated**: malformed arguments are rejected before anything is built
//! 3. **Rejection is a no-op**: a rejected command leaves the caller holding
//!    the unchanged document; [`CommandError`] only says why
//!
//! ## Command Semantics
//!
//! ### AddComponent
//! - Props come from the registry factory for `type_name`
//! - Index is clamped to the component count (default: append)
//!
//! ### UpdateComponent
//! - Shallow merge of `props` into the existing bag
//! - Values are not type-checked here
//!
//! ### ReorderComponents / ReorderSteps
//! - `ordered_ids` must be a permutation of the current ids or nothing moves
//!
//! ### DeleteStep
//! - The last remaining step cannot be deleted
//!
//! ### DuplicateStep / DuplicateComponent
//! - Copies get fresh ids; nothing is shared with the original

use crate::document::{Component, Document, Props, Selection, Step, StepSettingsPatch, TypeName};
use crate::ids::{ComponentId, IdSource, StepId};
use crate::registry::ComponentRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Document edit commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Insert a new component with registry defaults
    #[serde(rename_all = "camelCase")]
    AddComponent {
        step_id: StepId,
        type_name: TypeName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },

    /// Shallow-merge props into an existing component
    #[serde(rename_all = "camelCase")]
    UpdateComponent {
        step_id: StepId,
        component_id: ComponentId,
        props: Props,
    },

    #[serde(rename_all = "camelCase")]
    DeleteComponent {
        step_id: StepId,
        component_id: ComponentId,
    },

    /// Replace a step's component order
    #[serde(rename_all = "camelCase")]
    ReorderComponents {
        step_id: StepId,
        ordered_ids: Vec<ComponentId>,
    },

    /// Copy a component (fresh id) right after the original
    #[serde(rename_all = "camelCase")]
    DuplicateComponent {
        step_id: StepId,
        component_id: ComponentId,
    },

    /// Append an empty step and make it active
    #[serde(rename_all = "camelCase")]
    AddStep { name: String },

    /// Rename a step and/or patch its settings
    #[serde(rename_all = "camelCase")]
    UpdateStep {
        step_id: StepId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        settings: Option<StepSettingsPatch>,
    },

    #[serde(rename_all = "camelCase")]
    DeleteStep { step_id: StepId },

    /// Deep copy of a step with fresh ids, inserted after the original
    #[serde(rename_all = "camelCase")]
    DuplicateStep { step_id: StepId },

    /// Replace the step order
    #[serde(rename_all = "camelCase")]
    ReorderSteps { ordered_ids: Vec<StepId> },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("Step not found: {0}")]
    StepNotFound(StepId),

    #[error("Component {component_id} not found in step {step_id}")]
    ComponentNotFound {
        step_id: StepId,
        component_id: ComponentId,
    },

    #[error("Unknown component type: {0}")]
    UnknownComponentType(TypeName),

    #[error("Order is not a permutation of the current ids")]
    NotAPermutation,

    #[error("Cannot delete the last remaining step")]
    LastStep,
}

/// What a command needs besides the document
pub struct CommandContext<'a> {
    pub registry: &'a ComponentRegistry,
    pub ids: &'a mut dyn IdSource,
}

impl<'a> CommandContext<'a> {
    pub fn new(registry: &'a ComponentRegistry, ids: &'a mut dyn IdSource) -> Self {
        Self { registry, ids }
    }
}

/// Ids created by a command, for callers that act on them next
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandEffect {
    #[default]
    None,
    ComponentCreated {
        step_id: StepId,
        component_id: ComponentId,
    },
    StepCreated(StepId),
}

/// Result of applying a command
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    /// The next document
    pub document: Document,
    pub effect: CommandEffect,
}

impl Command {
    /// Human-readable label (used for undo/redo menu text)
    pub fn label(&self) -> &'static str {
        match self {
            Command::AddComponent { .. } => "Add component",
            Command::UpdateComponent { .. } => "Edit component",
            Command::DeleteComponent { .. } => "Delete component",
            Command::ReorderComponents { .. } => "Reorder components",
            Command::DuplicateComponent { .. } => "Duplicate component",
            Command::AddStep { .. } => "Add step",
            Command::UpdateStep { .. } => "Edit step",
            Command::DeleteStep { .. } => "Delete step",
            Command::DuplicateStep { .. } => "Duplicate step",
            Command::ReorderSteps { .. } => "Reorder steps",
        }
    }

    /// Validate, then build the next document
    pub fn apply(&self, doc: &Document, ctx: &mut CommandContext<'_>) -> Result<Applied, CommandError> {
        self.validate(doc, ctx.registry)?;

        let mut next = doc.clone();
        let effect = match self {
            Command::AddComponent { step_id, type_name, index } => {
                Self::apply_add_component(&mut next, ctx, step_id, type_name, *index)?
            }
            Command::UpdateComponent { step_id, component_id, props } => {
                Self::apply_update_component(&mut next, step_id, component_id, props)?
            }
            Command::DeleteComponent { step_id, component_id } => {
                Self::apply_delete_component(&mut next, step_id, component_id)?
            }
            Command::ReorderComponents { step_id, ordered_ids } => {
                Self::apply_reorder_components(&mut next, step_id, ordered_ids)?
            }
            Command::DuplicateComponent { step_id, component_id } => {
                Self::apply_duplicate_component(&mut next, ctx, step_id, component_id)?
            }
            Command::AddStep { name } => Self::apply_add_step(&mut next, ctx, name),
            Command::UpdateStep { step_id, name, settings } => {
                Self::apply_update_step(&mut next, step_id, name.as_deref(), settings.as_ref())?
            }
            Command::DeleteStep { step_id } => Self::apply_delete_step(&mut next, step_id)?,
            Command::DuplicateStep { step_id } => {
                Self::apply_duplicate_step(&mut next, ctx, step_id)?
            }
            Command::ReorderSteps { ordered_ids } => {
                Self::apply_reorder_steps(&mut next, ordered_ids)
            }
        };

        Ok(Applied {
            document: next,
            effect,
        })
    }

    fn apply_add_component(
        doc: &mut Document,
        ctx: &mut CommandContext<'_>,
        step_id: &StepId,
        type_name: &str,
        index: Option<usize>,
    ) -> Result<CommandEffect, CommandError> {
        let props = ctx
            .registry
            .create_default_props(type_name)
            .ok_or_else(|| CommandError::UnknownComponentType(type_name.to_string()))?;
        let component_id = ctx.ids.next_component_id();

        let step = find_step_mut(doc, step_id)?;
        let insert_index = index.unwrap_or(step.components.len()).min(step.components.len());
        step.components.insert(
            insert_index,
            Component {
                id: component_id.clone(),
                type_name: type_name.to_string(),
                props,
            },
        );

        Ok(CommandEffect::ComponentCreated {
            step_id: step_id.clone(),
            component_id,
        })
    }

    fn apply_update_component(
        doc: &mut Document,
        step_id: &StepId,
        component_id: &ComponentId,
        props: &Props,
    ) -> Result<CommandEffect, CommandError> {
        let component = find_component_mut(doc, step_id, component_id)?;
        for (key, value) in props {
            component.props.insert(key.clone(), value.clone());
        }
        Ok(CommandEffect::None)
    }

    fn apply_delete_component(
        doc: &mut Document,
        step_id: &StepId,
        component_id: &ComponentId,
    ) -> Result<CommandEffect, CommandError> {
        let step = find_step_mut(doc, step_id)?;
        let index = step
            .component_index(component_id)
            .ok_or_else(|| component_not_found(step_id, component_id))?;
        step.components.remove(index);

        if doc.selection.is_component(component_id) {
            doc.selection.component_id = None;
        }
        Ok(CommandEffect::None)
    }

    fn apply_reorder_components(
        doc: &mut Document,
        step_id: &StepId,
        ordered_ids: &[ComponentId],
    ) -> Result<CommandEffect, CommandError> {
        let step = find_step_mut(doc, step_id)?;
        let mut by_id: HashMap<ComponentId, Component> = step
            .components
            .drain(..)
            .map(|c| (c.id.clone(), c))
            .collect();
        // validate() guarantees every id is present exactly once
        step.components = ordered_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        Ok(CommandEffect::None)
    }

    fn apply_duplicate_component(
        doc: &mut Document,
        ctx: &mut CommandContext<'_>,
        step_id: &StepId,
        component_id: &ComponentId,
    ) -> Result<CommandEffect, CommandError> {
        let step = find_step_mut(doc, step_id)?;
        let index = step
            .component_index(component_id)
            .ok_or_else(|| component_not_found(step_id, component_id))?;

        let mut copy = step.components[index].clone();
        copy.id = ctx.ids.next_component_id();
        let new_id = copy.id.clone();
        step.components.insert(index + 1, copy);

        Ok(CommandEffect::ComponentCreated {
            step_id: step_id.clone(),
            component_id: new_id,
        })
    }

    fn apply_add_step(doc: &mut Document, ctx: &mut CommandContext<'_>, name: &str) -> CommandEffect {
        CommandEffect::StepCreated(push_step(doc, ctx.ids, name))
    }

    fn apply_update_step(
        doc: &mut Document,
        step_id: &StepId,
        name: Option<&str>,
        settings: Option<&StepSettingsPatch>,
    ) -> Result<CommandEffect, CommandError> {
        let step = find_step_mut(doc, step_id)?;
        if let Some(name) = name {
            step.name = name.to_string();
        }
        if let Some(patch) = settings {
            step.settings = step.settings.merged(patch);
        }
        Ok(CommandEffect::None)
    }

    fn apply_delete_step(doc: &mut Document, step_id: &StepId) -> Result<CommandEffect, CommandError> {
        let index = doc
            .step_index(step_id)
            .ok_or_else(|| CommandError::StepNotFound(step_id.clone()))?;
        let removed = doc.steps.remove(index);

        let selection_on_removed = doc.selection.step_id.as_ref() == Some(step_id)
            || doc
                .selection
                .component_id
                .as_ref()
                .is_some_and(|id| removed.component_index(id).is_some());
        if selection_on_removed {
            doc.selection = Selection::default();
        }

        if doc.active_step_id.as_ref() == Some(step_id) {
            // Prefer the step that slid into the removed slot, else the new last one
            let neighbour = doc.steps[index.min(doc.steps.len() - 1)].id.clone();
            activate(doc, &neighbour);
        }
        Ok(CommandEffect::None)
    }

    fn apply_duplicate_step(
        doc: &mut Document,
        ctx: &mut CommandContext<'_>,
        step_id: &StepId,
    ) -> Result<CommandEffect, CommandError> {
        let index = doc
            .step_index(step_id)
            .ok_or_else(|| CommandError::StepNotFound(step_id.clone()))?;

        let original = &doc.steps[index];
        let copy = Step {
            id: ctx.ids.next_step_id(),
            name: format!("{} (copy)", original.name),
            components: original
                .components
                .iter()
                .map(|c| Component {
                    id: ctx.ids.next_component_id(),
                    type_name: c.type_name.clone(),
                    props: c.props.clone(),
                })
                .collect(),
            settings: original.settings,
        };
        let new_id = copy.id.clone();
        doc.steps.insert(index + 1, copy);
        activate(doc, &new_id);

        Ok(CommandEffect::StepCreated(new_id))
    }

    fn apply_reorder_steps(doc: &mut Document, ordered_ids: &[StepId]) -> CommandEffect {
        let mut by_id: HashMap<StepId, Step> =
            doc.steps.drain(..).map(|s| (s.id.clone(), s)).collect();
        doc.steps = ordered_ids
            .iter()
            .filter_map(|id| by_id.remove(id))
            .collect();
        CommandEffect::None
    }

    /// Validate without applying
    pub fn validate(&self, doc: &Document, registry: &ComponentRegistry) -> Result<(), CommandError> {
        match self {
            Command::AddComponent { step_id, type_name, .. } => {
                find_step(doc, step_id)?;
                if !registry.contains(type_name) {
                    return Err(CommandError::UnknownComponentType(type_name.clone()));
                }
                Ok(())
            }

            Command::UpdateComponent { step_id, component_id, .. }
            | Command::DeleteComponent { step_id, component_id }
            | Command::DuplicateComponent { step_id, component_id } => {
                find_step(doc, step_id)?
                    .component(component_id)
                    .ok_or_else(|| component_not_found(step_id, component_id))?;
                Ok(())
            }

            Command::ReorderComponents { step_id, ordered_ids } => {
                let step = find_step(doc, step_id)?;
                let current: Vec<&ComponentId> = step.components.iter().map(|c| &c.id).collect();
                ensure_permutation(&current, ordered_ids)
            }

            Command::AddStep { .. } => Ok(()),

            Command::UpdateStep { step_id, .. } | Command::DuplicateStep { step_id } => {
                find_step(doc, step_id)?;
                Ok(())
            }

            Command::DeleteStep { step_id } => {
                find_step(doc, step_id)?;
                if doc.steps.len() <= 1 {
                    return Err(CommandError::LastStep);
                }
                Ok(())
            }

            Command::ReorderSteps { ordered_ids } => {
                let current: Vec<&StepId> = doc.steps.iter().map(|s| &s.id).collect();
                ensure_permutation(&current, ordered_ids)
            }
        }
    }
}

/// Make `step_id` active, dropping a selection that belongs elsewhere
/// Append a fresh empty step and make it active
pub(crate) fn push_step(doc: &mut Document, ids: &mut dyn IdSource, name: &str) -> StepId {
    let step_id = ids.next_step_id();
    doc.steps.push(Step::new(step_id.clone(), name));
    activate(doc, &step_id);
    step_id
}

fn activate(doc: &mut Document, step_id: &StepId) {
    doc.active_step_id = Some(step_id.clone());
    if doc.selection.step_id.as_ref() != Some(step_id) {
        doc.selection = Selection::default();
    }
}

fn ensure_permutation<T: Eq + std::hash::Hash>(current: &[&T], ordered: &[T]) -> Result<(), CommandError> {
    if current.len() != ordered.len() {
        return Err(CommandError::NotAPermutation);
    }
    let current: HashSet<&T> = current.iter().copied().collect();
    let mut seen = HashSet::with_capacity(ordered.len());
    for id in ordered {
        if !current.contains(id) || !seen.insert(id) {
            return Err(CommandError::NotAPermutation);
        }
    }
    Ok(())
}

fn find_step<'d>(doc: &'d Document, step_id: &StepId) -> Result<&'d Step, CommandError> {
    doc.step(step_id)
        .ok_or_else(|| CommandError::StepNotFound(step_id.clone()))
}

fn find_step_mut<'d>(doc: &'d mut Document, step_id: &StepId) -> Result<&'d mut Step, CommandError> {
    doc.step_mut(step_id)
        .ok_or_else(|| CommandError::StepNotFound(step_id.clone()))
}

fn find_component_mut<'d>(
    doc: &'d mut Document,
    step_id: &StepId,
    component_id: &ComponentId,
) -> Result<&'d mut Component, CommandError> {
    find_step_mut(doc, step_id)?
        .components
        .iter_mut()
        .find(|c| &c.id == component_id)
        .ok_or_else(|| component_not_found(step_id, component_id))
}

fn component_not_found(step_id: &StepId, component_id: &ComponentId) -> CommandError {
    CommandError::ComponentNotFound {
        step_id: step_id.clone(),
        component_id: component_id.clone(),
    }
}
