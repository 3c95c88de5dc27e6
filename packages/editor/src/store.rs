//! # Document Store
//!
//! Single owner of the live funnel document. Every view (steps sidebar,
//! canvas, properties panel) reads through the store and writes through
//! [`EditorStore::dispatch`], so all edits pass the command layer and land in
//! history.
//!
//! Each committed change bumps the document `version` and the store
//! `revision`, then notifies subscribers once. Undo and redo restore the
//! snapshot's own `version`; `revision` only ever grows and is what dirty
//! tracking should compare.

use crate::commands::{self, Command, CommandContext, CommandEffect, CommandError};
use crate::document::{Component, Document, Selection, Step};
use crate::history::History;
use crate::ids::{ComponentId, IdSource, StepId, UuidIds};
use crate::registry::ComponentRegistry;
use std::sync::{Arc, Mutex, PoisonError, Weak};

/// What caused a change notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A command committed (carries its label)
    Command(&'static str),
    Undo,
    Redo,
    ActiveStep,
    Selection,
    /// The whole document was swapped (e.g. after a load)
    Replaced,
}

/// Notification delivered to subscribers after a committed change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub version: u64,
    pub revision: u64,
    pub kind: ChangeKind,
}

/// Result of a committed command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub version: u64,
    pub revision: u64,
    pub effect: CommandEffect,
}

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Handle returned by [`EditorStore::subscribe`]; dropping it unsubscribes
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Stop receiving notifications
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            let mut listeners = listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners.entries.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Owner of the live document, its history and its subscribers
pub struct EditorStore {
    document: Document,
    registry: Arc<ComponentRegistry>,
    history: History,
    ids: Box<dyn IdSource>,
    listeners: Arc<Mutex<Listeners>>,
    revision: u64,
}

impl EditorStore {
    /// Empty store (no steps) with random ids and unlimited history
    pub fn new(registry: Arc<ComponentRegistry>) -> Self {
        Self {
            document: Document::new(),
            registry,
            history: History::new(),
            ids: Box::new(UuidIds),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            revision: 0,
        }
    }

    /// Start from an existing document
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = document;
        self
    }

    /// Use a different id source (e.g. [`crate::SequentialIds`] in tests)
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Use a pre-configured history (e.g. with an undo limit)
    pub fn with_history(mut self, history: History) -> Self {
        self.history = history;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Owned copy of the current document
    pub fn snapshot(&self) -> Document {
        self.document.clone()
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn version(&self) -> u64 {
        self.document.version
    }

    /// Monotonic change counter; never decreases, not even on undo
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Apply a command; rejected commands leave document and history alone
    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        let label = command.label();
        let mut ctx = CommandContext::new(&self.registry, self.ids.as_mut());
        let applied = match command.apply(&self.document, &mut ctx) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::debug!(command = label, error = %e, "Command rejected");
                return Err(e);
            }
        };

        self.record(label, applied.document);

        Ok(CommandOutcome {
            version: self.document.version,
            revision: self.revision,
            effect: applied.effect,
        })
    }

    /// Append a step and make it active
    ///
    /// Same history entry and change event as dispatching `AddStep`, which
    /// has no rejection path.
    pub fn create_step(&mut self, name: impl Into<String>) -> StepId {
        let mut next = self.document.clone();
        let step_id = commands::push_step(&mut next, self.ids.as_mut(), &name.into());
        self.record("Add step", next);
        step_id
    }

    /// Commit a command's result as one undoable change
    fn record(&mut self, label: &'static str, next: Document) {
        self.history.record_before_mutation(&self.document, Some(label));
        self.document = next;
        self.document.version += 1;
        self.commit(ChangeKind::Command(label));
    }

    /// Make a step active; unknown ids are ignored
    pub fn set_active_step(&mut self, step_id: &StepId) -> bool {
        if self.document.step(step_id).is_none()
            || self.document.active_step_id.as_ref() == Some(step_id)
        {
            return false;
        }

        self.document.active_step_id = Some(step_id.clone());
        if self.document.selection.step_id.as_ref() != Some(step_id) {
            self.document.selection = Selection::default();
        }
        self.document.version += 1;
        self.commit(ChangeKind::ActiveStep);
        true
    }

    pub fn active_step(&self) -> Option<&Step> {
        self.document.active_step()
    }

    /// Select a component; its step becomes active. Unknown ids are ignored.
    pub fn select_component(&mut self, step_id: &StepId, component_id: &ComponentId) -> bool {
        if self.document.component(step_id, component_id).is_none() {
            return false;
        }
        let selection = Selection {
            step_id: Some(step_id.clone()),
            component_id: Some(component_id.clone()),
        };
        if self.document.selection == selection
            && self.document.active_step_id.as_ref() == Some(step_id)
        {
            return false;
        }

        self.document.active_step_id = Some(step_id.clone());
        self.document.selection = selection;
        self.document.version += 1;
        self.commit(ChangeKind::Selection);
        true
    }

    pub fn clear_selection(&mut self) -> bool {
        if self.document.selection.is_empty() {
            return false;
        }
        self.document.selection = Selection::default();
        self.document.version += 1;
        self.commit(ChangeKind::Selection);
        true
    }

    /// Selected component on the active step; `None` when stale
    pub fn selected_component(&self) -> Option<&Component> {
        self.document.selected_component()
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.document) {
            Some(previous) => {
                self.document = previous;
                self.commit(ChangeKind::Undo);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(&self.document) {
            Some(next) => {
                self.document = next;
                self.commit(ChangeKind::Redo);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run several dispatches as one undo step
    pub fn batch<R>(&mut self, label: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.history.begin_batch(Some(label));
        let result = f(self);
        self.history.end_batch();
        result
    }

    /// Swap in a document from outside (e.g. storage); history is dropped
    pub fn replace_document(&mut self, document: Document) {
        self.document = document;
        self.history.clear();
        self.commit(ChangeKind::Replaced);
    }

    /// Register a listener, fired once per committed change
    pub fn subscribe(&self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) -> Subscription {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.next_id += 1;
        let id = listeners.next_id;
        listeners.entries.push((id, Arc::new(listener)));
        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    fn commit(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let event = ChangeEvent {
            version: self.document.version,
            revision: self.revision,
            kind,
        };

        // Listeners run outside the lock so they may subscribe/unsubscribe
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn store() -> EditorStore {
        EditorStore::new(Arc::new(ComponentRegistry::with_builtins())).with_ids(SequentialIds::new())
    }

    fn add(store: &mut EditorStore, step_id: &StepId, type_name: &str) -> ComponentId {
        match store.dispatch(Command::AddComponent {
            step_id: step_id.clone(),
            type_name: type_name.to_string(),
            index: None,
        }) {
            Ok(CommandOutcome {
                effect: CommandEffect::ComponentCreated { component_id, .. },
                ..
            }) => component_id,
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_create_step_becomes_active() {
        let mut store = store();
        let first = store.create_step("Intro");
        assert_eq!(store.active_step().map(|s| &s.id), Some(&first));
        let second = store.create_step("Offer");
        assert_eq!(store.active_step().map(|s| &s.id), Some(&second));
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn test_create_step_matches_add_step_command() {
        let mut created = store();
        created.create_step("Intro");
        let offer = created.create_step("Offer");

        let mut dispatched = store();
        for name in ["Intro", "Offer"] {
            dispatched
                .dispatch(Command::AddStep { name: name.to_string() })
                .unwrap();
        }

        assert_eq!(created.document(), dispatched.document());
        assert_eq!(created.revision(), dispatched.revision());
        assert_eq!(created.history().undo_levels(), 2);
        assert_eq!(created.document().steps.last().map(|s| &s.id), Some(&offer));

        assert!(created.undo());
        assert_eq!(created.document().steps.len(), 1);
        assert!(created.document().step(&offer).is_none());
    }

    #[test]
    fn test_set_active_step_ignores_unknown_ids() {
        let mut store = store();
        let intro = store.create_step("Intro");
        store.create_step("Offer");
        let version = store.version();

        assert!(!store.set_active_step(&StepId::new("ghost")));
        assert_eq!(store.version(), version);

        assert!(store.set_active_step(&intro));
        assert_eq!(store.version(), version + 1);
        assert_eq!(store.active_step().map(|s| &s.id), Some(&intro));
    }

    #[test]
    fn test_select_component_activates_owner_step() {
        let mut store = store();
        let intro = store.create_step("Intro");
        let heading = add(&mut store, &intro, "heading");
        store.create_step("Offer");

        assert!(store.select_component(&intro, &heading));
        assert_eq!(store.active_step().map(|s| &s.id), Some(&intro));
        assert_eq!(store.selected_component().map(|c| &c.id), Some(&heading));
        assert!(!store.select_component(&intro, &ComponentId::new("ghost")));
    }

    #[test]
    fn test_rejected_command_changes_nothing() {
        let mut store = store();
        let intro = store.create_step("Intro");
        let before = store.snapshot();
        let revision = store.revision();
        let undo_levels = store.history().undo_levels();

        let result = store.dispatch(Command::DeleteStep { step_id: intro });
        assert_eq!(result, Err(CommandError::LastStep));
        assert_eq!(store.document(), &before);
        assert_eq!(store.revision(), revision);
        assert_eq!(store.history().undo_levels(), undo_levels);
    }

    #[test]
    fn test_subscribers_fire_once_per_commit() {
        let mut store = store();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let subscription = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let intro = store.create_step("Intro");
        add(&mut store, &intro, "heading");
        let _ = store.dispatch(Command::DeleteStep { step_id: intro });
        store.undo();
        assert_eq!(count.load(Ordering::SeqCst), 3);

        subscription.unsubscribe();
        assert_eq!(store.subscriber_count(), 0);
        store.redo();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_change_event_carries_version() {
        let mut store = store();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _subscription = store.subscribe(move |event| {
            sink.lock().unwrap().push(*event);
        });

        store.create_step("Intro");
        store.undo();

        let events = events.lock().unwrap();
        assert_eq!(events[0].version, 1);
        assert_eq!(events[0].kind, ChangeKind::Command("Add step"));
        assert_eq!(events[1].version, 0);
        assert_eq!(events[1].kind, ChangeKind::Undo);
        assert!(events[1].revision > events[0].revision);
    }

    #[test]
    fn test_batch_is_one_undo_step() {
        let mut store = store();
        let intro = store.create_step("Intro");
        let levels = store.history().undo_levels();

        store.batch("Add hero", |store| {
            add(store, &intro, "heading");
            add(store, &intro, "image");
            add(store, &intro, "button");
        });
        assert_eq!(store.history().undo_levels(), levels + 1);
        assert_eq!(store.history().undo_label(), Some("Add hero"));

        store.undo();
        assert!(store.document().step(&intro).unwrap().components.is_empty());
    }

    #[test]
    fn test_replace_document_clears_history() {
        let mut store = store();
        store.create_step("Intro");
        let other = store.snapshot();
        store.create_step("Offer");

        store.replace_document(other.clone());
        assert_eq!(store.document(), &other);
        assert!(!store.can_undo());
        assert!(!store.can_redo());
    }
}
