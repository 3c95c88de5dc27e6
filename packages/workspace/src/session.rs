//! Editing session: one store bound to one document key.
//!
//! The session owns the [`EditorStore`] and forwards every edit to it, then
//! publishes the resulting snapshot for the autosave worker. Saving, loading
//! and keyboard shortcuts live here because they need the gateway.

use crate::autosave::{spawn_autosave, AutosaveHandle, AutosaveOptions, AutosaveSnapshot};
use crate::config::WorkspaceConfig;
use crate::gateway::{LoadError, PersistError, PersistenceGateway};
use funnel_editor::keymap::{self, KeyEvent, ShortcutAction};
use funnel_editor::{Command, CommandError, CommandOutcome, Document, EditorStore, SerializedDocument};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load document: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to save document: {0}")]
    Persist(#[from] PersistError),
}

pub struct EditorSession {
    key: String,
    store: EditorStore,
    gateway: Arc<dyn PersistenceGateway>,
    snapshots: watch::Sender<AutosaveSnapshot>,
    saved_revision: Arc<AtomicU64>,
    autosave: Option<AutosaveHandle>,
}

impl EditorSession {
    /// Load `key`, or start a new document with the configured steps
    ///
    /// `store` supplies the registry, id source and history policy; its
    /// current document is replaced.
    pub async fn open(
        key: impl Into<String>,
        gateway: Arc<dyn PersistenceGateway>,
        mut store: EditorStore,
        config: &WorkspaceConfig,
    ) -> Result<Self, SessionError> {
        let key = key.into();
        let saved_revision = match gateway.load(&key).await {
            Ok(envelope) => {
                store.replace_document(envelope.into_document());
                store.revision()
            }
            Err(LoadError::NotFound(_)) => {
                tracing::info!(%key, "Starting new document");
                store.replace_document(Document::new());
                for name in &config.default_steps {
                    store.create_step(name.as_str());
                }
                if let Some(first) = store.document().steps.first().map(|s| s.id.clone()) {
                    store.set_active_step(&first);
                }
                let fresh = store.snapshot();
                store.replace_document(fresh);
                // Never saved, so dirty from the start
                0
            }
            Err(e) => return Err(e.into()),
        };

        let (snapshots, _) = watch::channel(AutosaveSnapshot {
            revision: store.revision(),
            document: store.snapshot(),
        });

        Ok(Self {
            key,
            store,
            gateway,
            snapshots,
            saved_revision: Arc::new(AtomicU64::new(saved_revision)),
            autosave: None,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &EditorStore {
        &self.store
    }

    pub fn document(&self) -> &Document {
        self.store.document()
    }

    /// Changes exist that no save has captured yet
    pub fn is_dirty(&self) -> bool {
        self.store.revision() > self.saved_revision.load(Ordering::Acquire)
    }

    pub fn dispatch(&mut self, command: Command) -> Result<CommandOutcome, CommandError> {
        let outcome = self.store.dispatch(command);
        self.publish();
        outcome
    }

    pub fn undo(&mut self) -> bool {
        let undone = self.store.undo();
        self.publish();
        undone
    }

    pub fn redo(&mut self) -> bool {
        let redone = self.store.redo();
        self.publish();
        redone
    }

    /// Run anything else against the store (selection, drag gestures, batches)
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut EditorStore) -> R) -> R {
        let result = f(&mut self.store);
        self.publish();
        result
    }

    /// Save the current document right away
    pub async fn save(&self) -> Result<(), SessionError> {
        let revision = self.store.revision();
        let envelope = SerializedDocument::new(self.store.snapshot());
        self.gateway.save(&self.key, &envelope).await?;
        self.saved_revision.fetch_max(revision, Ordering::AcqRel);
        Ok(())
    }

    /// Execute a bound shortcut; unbound keys return `Ok(None)`
    pub async fn handle_key(&mut self, event: &KeyEvent) -> Result<Option<ShortcutAction>, SessionError> {
        let Some(action) = keymap::resolve(event) else {
            return Ok(None);
        };
        tracing::debug!(?action, "Shortcut");
        match action {
            ShortcutAction::Undo => {
                self.undo();
            }
            ShortcutAction::Redo => {
                self.redo();
            }
            ShortcutAction::Save => self.save().await?,
        }
        Ok(Some(action))
    }

    /// Start (or restart) background saving
    pub fn start_autosave(&mut self, options: AutosaveOptions) {
        self.autosave = Some(spawn_autosave(
            self.gateway.clone(),
            self.key.clone(),
            self.snapshots.subscribe(),
            self.saved_revision.clone(),
            options,
        ));
    }

    pub async fn stop_autosave(&mut self) {
        if let Some(handle) = self.autosave.take() {
            handle.stop().await;
        }
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave.as_ref().is_some_and(AutosaveHandle::is_running)
    }

    fn publish(&self) {
        let revision = self.store.revision();
        if self.snapshots.borrow().revision == revision {
            return;
        }
        self.snapshots.send_replace(AutosaveSnapshot {
            revision,
            document: self.store.snapshot(),
        });
    }
}

impl AutosaveOptions {
    pub fn from_config(config: &WorkspaceConfig) -> Self {
        Self {
            interval: config.autosave_interval(),
            dirty_only: config.autosave_dirty_only,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use funnel_editor::{ComponentRegistry, IntegrityError, Modifiers, SequentialIds, SerializeError};
    use std::time::Duration;

    fn store() -> EditorStore {
        EditorStore::new(Arc::new(ComponentRegistry::with_builtins())).with_ids(SequentialIds::new())
    }

    async fn open(gateway: Arc<MemoryGateway>, config: &WorkspaceConfig) -> EditorSession {
        EditorSession::open("quiz", gateway, store(), config).await.unwrap()
    }

    #[tokio::test]
    async fn test_new_document_gets_default_steps() {
        let config = WorkspaceConfig {
            default_steps: vec!["Welcome".to_string(), "Offer".to_string()],
            ..WorkspaceConfig::default()
        };
        let session = open(Arc::new(MemoryGateway::new()), &config).await;

        let names: Vec<_> = session.document().steps.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Welcome", "Offer"]);
        assert_eq!(session.store().active_step().map(|s| s.name.as_str()), Some("Welcome"));
        assert!(!session.store().can_undo());
        assert!(session.is_dirty());
    }

    #[tokio::test]
    async fn test_save_then_reopen() {
        let gateway = Arc::new(MemoryGateway::new());
        let config = WorkspaceConfig::default();
        let mut session = open(gateway.clone(), &config).await;
        let step_id = session.document().steps[0].id.clone();

        session
            .dispatch(Command::AddComponent {
                step_id,
                type_name: "heading".to_string(),
                index: None,
            })
            .unwrap();
        session.save().await.unwrap();
        assert!(!session.is_dirty());

        let reopened = open(gateway, &config).await;
        assert_eq!(reopened.document(), session.document());
        assert!(!reopened.is_dirty());
    }

    #[tokio::test]
    async fn test_corrupt_document_fails_to_open() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_raw("quiz", "{}");
        let result = EditorSession::open("quiz", gateway, store(), &WorkspaceConfig::default()).await;
        assert!(matches!(result, Err(SessionError::Load(LoadError::Serialize(_)))));
    }

    #[tokio::test]
    async fn test_document_without_steps_fails_to_open() {
        let gateway = Arc::new(MemoryGateway::new());
        gateway.insert_raw(
            "quiz",
            r#"{
                "format": "funnel-document/1",
                "savedAt": "2024-05-01T12:00:00Z",
                "document": { "steps": [], "activeStepId": null }
            }"#,
        );
        let result = EditorSession::open("quiz", gateway, store(), &WorkspaceConfig::default()).await;
        assert!(matches!(
            result,
            Err(SessionError::Load(LoadError::Serialize(SerializeError::Integrity(
                IntegrityError::NoSteps
            ))))
        ));
    }

    #[tokio::test]
    async fn test_shortcuts() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut session = open(gateway.clone(), &WorkspaceConfig::default()).await;
        let step_id = session.document().steps[0].id.clone();
        session
            .dispatch(Command::AddComponent {
                step_id: step_id.clone(),
                type_name: "text".to_string(),
                index: None,
            })
            .unwrap();

        let undo = KeyEvent::new("z", Modifiers::COMMAND);
        assert_eq!(session.handle_key(&undo).await.unwrap(), Some(ShortcutAction::Undo));
        assert!(session.document().steps[0].components.is_empty());

        let redo = KeyEvent::new("y", Modifiers::COMMAND);
        assert_eq!(session.handle_key(&redo).await.unwrap(), Some(ShortcutAction::Redo));
        assert_eq!(session.document().steps[0].components.len(), 1);

        let save = KeyEvent::new("s", Modifiers::COMMAND);
        assert_eq!(session.handle_key(&save).await.unwrap(), Some(ShortcutAction::Save));
        assert_eq!(gateway.save_count(), 1);

        let plain = KeyEvent::new("s", Modifiers::NONE);
        assert_eq!(session.handle_key(&plain).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_manual_save_keeps_dirty() {
        let gateway = Arc::new(MemoryGateway::new());
        let session = open(gateway.clone(), &WorkspaceConfig::default()).await;
        gateway.fail_next_saves(1);

        assert!(matches!(
            session.save().await,
            Err(SessionError::Persist(PersistError::Unavailable(_)))
        ));
        assert!(session.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_follows_edits() {
        let gateway = Arc::new(MemoryGateway::new());
        let config = WorkspaceConfig {
            autosave_interval_secs: 10,
            ..WorkspaceConfig::default()
        };
        let mut session = open(gateway.clone(), &config).await;
        session.start_autosave(AutosaveOptions::from_config(&config));
        assert!(session.autosave_running());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(gateway.save_count(), 1);
        assert!(!session.is_dirty());

        let step_id = session.document().steps[0].id.clone();
        session
            .dispatch(Command::UpdateStep {
                step_id,
                name: Some("Hello".to_string()),
                settings: None,
            })
            .unwrap();
        assert!(session.is_dirty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(gateway.save_count(), 2);
        let stored = gateway.load("quiz").await.unwrap();
        assert_eq!(stored.document.steps[0].name, "Hello");

        session.stop_autosave().await;
        assert!(!session.autosave_running());
    }
}
