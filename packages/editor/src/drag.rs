//! # Drag-and-Drop Coordinator
//!
//! Turns one pointer gesture into at most one command.
//!
//! ```text
//!            start(source)            finish(target) / cancel()
//!   Idle ───────────────────▶ Dragging ─────────────────────────▶ Idle
//!                              │   ▲
//!                              └───┘ hover(target)
//! ```
//!
//! Nothing touches the document until `finish`. Hover updates only the
//! transient target used for visual feedback, and cancelling is always safe.
//!
//! | source               | target                  | command                          |
//! |----------------------|-------------------------|----------------------------------|
//! | palette `T`          | canvas of step S        | `AddComponent(S, T)` + select    |
//! | palette `T`          | component C2 in S       | `AddComponent(S, T, idx(C2))` + select |
//! | canvas (S, C1)       | component C2 in S       | `ReorderComponents` (C1 → idx(C2)) |
//! | canvas (S, C1)       | canvas of step S        | `ReorderComponents` (C1 → end)   |
//! | canvas (S1, _)       | anything in S2 ≠ S1     | ignored                          |

use crate::commands::{Command, CommandEffect, CommandError};
use crate::document::{Document, TypeName};
use crate::ids::{ComponentId, StepId};
use crate::registry::ComponentRegistry;
use crate::store::{CommandOutcome, EditorStore};

/// Where a drag started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A palette entry; not yet part of any step
    Palette { type_name: TypeName },
    /// A component already on the canvas
    Canvas {
        step_id: StepId,
        component_id: ComponentId,
    },
}

/// What the pointer is over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// The drop zone of a step's canvas
    StepCanvas { step_id: StepId },
    /// An existing component
    Component {
        step_id: StepId,
        component_id: ComponentId,
    },
}

impl DropTarget {
    pub fn step_id(&self) -> &StepId {
        match self {
            DropTarget::StepCanvas { step_id } | DropTarget::Component { step_id, .. } => step_id,
        }
    }
}

/// Gesture state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: DragSource,
        over: Option<DropTarget>,
    },
}

/// Why a finished gesture did not change the document
#[derive(Debug, Clone, PartialEq)]
pub enum IgnoreReason {
    NotDragging,
    NoTarget,
    /// Moving a component into another step is not supported
    CrossStep,
    /// Dropped where it already is
    SamePosition,
    /// The palette entry's type is not registered
    UnknownType(TypeName),
    /// The dragged component or target no longer exists
    Stale,
    /// The store rejected the command
    Rejected(CommandError),
}

/// Result of finishing a gesture
#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// A palette item became a new, selected component
    Added {
        step_id: StepId,
        component_id: ComponentId,
    },
    /// Components of a step were reordered
    Reordered { step_id: StepId },
    Ignored(IgnoreReason),
}

/// Single in-flight gesture tracker
#[derive(Debug, Default)]
pub struct DragCoordinator {
    state: DragState,
}

impl DragCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn source(&self) -> Option<&DragSource> {
        match &self.state {
            DragState::Dragging { source, .. } => Some(source),
            DragState::Idle => None,
        }
    }

    pub fn hovered(&self) -> Option<&DropTarget> {
        match &self.state {
            DragState::Dragging { over, .. } => over.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Begin a gesture; an unfinished one is discarded
    pub fn start(&mut self, source: DragSource) {
        if self.is_dragging() {
            tracing::debug!("Drag started while another was in flight; discarding the old one");
        }
        tracing::debug!(?source, "Drag started");
        self.state = DragState::Dragging { source, over: None };
    }

    /// Track the target under the pointer (visual only)
    pub fn hover(&mut self, target: Option<DropTarget>) {
        if let DragState::Dragging { over, .. } = &mut self.state {
            *over = target;
        }
    }

    /// Abort the gesture; safe to call at any time
    pub fn cancel(&mut self) -> bool {
        let was_dragging = self.is_dragging();
        if was_dragging {
            tracing::debug!("Drag cancelled");
        }
        self.state = DragState::Idle;
        was_dragging
    }

    /// Whether dropping the current source on `target` would do anything
    pub fn accepts(&self, target: &DropTarget, document: &Document, registry: &ComponentRegistry) -> bool {
        self.source()
            .is_some_and(|source| plan(source, target, document, registry).is_ok())
    }

    /// End the gesture over `target` and issue its command
    pub fn finish(&mut self, target: Option<DropTarget>, store: &mut EditorStore) -> DropOutcome {
        let source = match std::mem::take(&mut self.state) {
            DragState::Dragging { source, .. } => source,
            DragState::Idle => return DropOutcome::Ignored(IgnoreReason::NotDragging),
        };
        let Some(target) = target else {
            tracing::debug!("Drag ended outside any drop zone");
            return DropOutcome::Ignored(IgnoreReason::NoTarget);
        };

        let command = match plan(&source, &target, store.document(), store.registry()) {
            Ok(command) => command,
            Err(reason) => {
                if let IgnoreReason::UnknownType(type_name) = &reason {
                    tracing::warn!(%type_name, "Dropped palette item has no registered type");
                } else {
                    tracing::debug!(?reason, "Drop ignored");
                }
                return DropOutcome::Ignored(reason);
            }
        };

        match store.dispatch(command) {
            Ok(CommandOutcome {
                effect: CommandEffect::ComponentCreated { step_id, component_id },
                ..
            }) => {
                store.select_component(&step_id, &component_id);
                DropOutcome::Added {
                    step_id,
                    component_id,
                }
            }
            Ok(_) => DropOutcome::Reordered {
                step_id: target.step_id().clone(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "Drop command rejected");
                DropOutcome::Ignored(IgnoreReason::Rejected(e))
            }
        }
    }
}

/// Translate a source/target pair into the command a drop would issue
fn plan(
    source: &DragSource,
    target: &DropTarget,
    document: &Document,
    registry: &ComponentRegistry,
) -> Result<Command, IgnoreReason> {
    let target_step = document.step(target.step_id()).ok_or(IgnoreReason::Stale)?;

    match source {
        DragSource::Palette { type_name } => {
            if !registry.contains(type_name) {
                return Err(IgnoreReason::UnknownType(type_name.clone()));
            }
            let index = match target {
                DropTarget::StepCanvas { .. } => None,
                DropTarget::Component { component_id, .. } => Some(
                    target_step
                        .component_index(component_id)
                        .ok_or(IgnoreReason::Stale)?,
                ),
            };
            Ok(Command::AddComponent {
                step_id: target_step.id.clone(),
                type_name: type_name.clone(),
                index,
            })
        }

        DragSource::Canvas { step_id, component_id } => {
            if step_id != &target_step.id {
                return Err(IgnoreReason::CrossStep);
            }
            let from = target_step
                .component_index(component_id)
                .ok_or(IgnoreReason::Stale)?;
            let to = match target {
                DropTarget::StepCanvas { .. } => target_step.components.len() - 1,
                DropTarget::Component { component_id: over, .. } => {
                    target_step.component_index(over).ok_or(IgnoreReason::Stale)?
                }
            };
            if from == to {
                return Err(IgnoreReason::SamePosition);
            }

            Ok(Command::ReorderComponents {
                step_id: step_id.clone(),
                ordered_ids: array_move(&target_step.component_ids(), from, to),
            })
        }
    }
}

/// Move the item at `from` so it ends up at index `to`
fn array_move<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut moved = items.to_vec();
    let item = moved.remove(from);
    moved.insert(to.min(moved.len()), item);
    moved
}
