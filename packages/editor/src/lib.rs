//! # Funnel Editor
//!
//! Core editing engine for multi-step funnels.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ registry: type name → defaults + renderer   │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ store: owns the live Document               │
//! │  - Dispatch commands with validation        │
//! │  - Snapshot history (undo/redo, batches)    │
//! │  - Active step + selection                  │
//! │  - Change subscriptions                     │
//! └─────────────────────────────────────────────┘
//!          ↑                           ↓
//! ┌──────────────────────┐  ┌───────────────────┐
//! │ drag: gesture → one  │  │ serialize: stored │
//! │ command on drop      │  │ JSON envelope     │
//! └──────────────────────┘  └───────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Documents are values**: commands map an old snapshot to a new one
//! 2. **One write path**: every edit goes through [`EditorStore::dispatch`]
//! 3. **Rejections are no-ops**: invalid commands leave document and history alone
//! 4. **Types are data**: block behavior lives in the [`ComponentRegistry`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use funnel_editor::{Command, ComponentRegistry, EditorStore};
//! use std::sync::Arc;
//!
//! let mut store = EditorStore::new(Arc::new(ComponentRegistry::with_builtins()));
//! let intro = store.create_step("Intro");
//!
//! store.dispatch(Command::AddComponent {
//!     step_id: intro.clone(),
//!     type_name: "heading".to_string(),
//!     index: None,
//! })?;
//!
//! store.undo();
//! store.redo();
//! ```

mod commands;
mod document;
mod drag;
mod errors;
mod history;
mod ids;
pub mod keymap;
mod registry;
mod serialize;
mod store;

pub use commands::{Applied, Command, CommandContext, CommandEffect, CommandError};
pub use document::{
    Component, Document, IntegrityError, PropValue, Props, Selection, Step, StepSettings,
    StepSettingsPatch, TypeName,
};
pub use drag::{DragCoordinator, DragSource, DragState, DropOutcome, DropTarget, IgnoreReason};
pub use errors::SerializeError;
pub use history::{History, HistoryEntry};
pub use ids::{ComponentId, IdSource, SequentialIds, StepId, UuidIds};
pub use keymap::{KeyEvent, Modifiers, ShortcutAction};
pub use registry::{
    ComponentRegistry, ComponentTypeDefinition, PropsFactory, RenderFn, RenderedOutput,
};
pub use serialize::{SerializedDocument, FORMAT};
pub use store::{ChangeEvent, ChangeKind, CommandOutcome, EditorStore, Subscription};
