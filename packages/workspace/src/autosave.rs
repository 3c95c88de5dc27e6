//! Background autosave.
//!
//! The session publishes `(revision, document)` snapshots on a `watch`
//! channel. The worker wakes every `interval`, takes the latest snapshot and
//! saves it through the gateway. With `dirty_only` set, a tick is skipped
//! unless the revision moved past the last successful save (manual saves
//! included, they share the same counter).
//!
//! A failed save is logged and retried on the next tick; editing never waits
//! on it.

use crate::gateway::PersistenceGateway;
use funnel_editor::{Document, SerializedDocument};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Latest state handed to the worker
#[derive(Debug, Clone, Default)]
pub struct AutosaveSnapshot {
    pub revision: u64,
    pub document: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveOptions {
    pub interval: Duration,
    pub dirty_only: bool,
}

impl Default for AutosaveOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            dirty_only: true,
        }
    }
}

/// Running autosave worker; dropping it aborts the task
pub struct AutosaveHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    /// Stop the worker and wait for an in-flight save to finish
    pub async fn stop(mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Autosave task ended abnormally");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawn the worker on the current tokio runtime
pub fn spawn_autosave(
    gateway: Arc<dyn PersistenceGateway>,
    key: String,
    snapshots: watch::Receiver<AutosaveSnapshot>,
    saved_revision: Arc<AtomicU64>,
    options: AutosaveOptions,
) -> AutosaveHandle {
    let (stop_tx, stop_rx) = oneshot::channel();
    let task = tokio::spawn(run(gateway, key, snapshots, saved_revision, options, stop_rx));
    AutosaveHandle {
        stop_tx: Some(stop_tx),
        task: Some(task),
    }
}

async fn run(
    gateway: Arc<dyn PersistenceGateway>,
    key: String,
    snapshots: watch::Receiver<AutosaveSnapshot>,
    saved_revision: Arc<AtomicU64>,
    options: AutosaveOptions,
    mut stop_rx: oneshot::Receiver<()>,
) {
    tracing::debug!(%key, interval = ?options.interval, dirty_only = options.dirty_only, "Autosave started");

    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + options.interval,
        options.interval,
    );
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        // Session gone
        if snapshots.has_changed().is_err() {
            break;
        }

        let snapshot = snapshots.borrow().clone();
        if options.dirty_only && snapshot.revision <= saved_revision.load(Ordering::Acquire) {
            continue;
        }

        let envelope = SerializedDocument::new(snapshot.document);
        match gateway.save(&key, &envelope).await {
            Ok(()) => {
                saved_revision.fetch_max(snapshot.revision, Ordering::AcqRel);
                tracing::info!(%key, revision = snapshot.revision, "Autosaved");
            }
            Err(e) => {
                tracing::warn!(%key, error = %e, "Autosave failed; retrying next tick");
            }
        }
    }

    tracing::debug!(%key, "Autosave stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;

    const TICK: Duration = Duration::from_secs(30);

    fn setup(
        dirty_only: bool,
    ) -> (
        Arc<MemoryGateway>,
        watch::Sender<AutosaveSnapshot>,
        Arc<AtomicU64>,
        AutosaveHandle,
    ) {
        let gateway = Arc::new(MemoryGateway::new());
        let (tx, rx) = watch::channel(AutosaveSnapshot {
            revision: 1,
            document: Document::default(),
        });
        let saved = Arc::new(AtomicU64::new(0));
        let handle = spawn_autosave(
            gateway.clone(),
            "quiz".to_string(),
            rx,
            saved.clone(),
            AutosaveOptions {
                interval: TICK,
                dirty_only,
            },
        );
        (gateway, tx, saved, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_only_when_dirty() {
        let (gateway, tx, saved, handle) = setup(true);

        tokio::time::sleep(TICK + Duration::from_secs(1)).await;
        assert_eq!(gateway.save_count(), 1);
        assert_eq!(saved.load(Ordering::SeqCst), 1);

        tokio::time::sleep(TICK * 3).await;
        assert_eq!(gateway.save_count(), 1);

        tx.send_replace(AutosaveSnapshot {
            revision: 2,
            document: Document::default(),
        });
        tokio::time::sleep(TICK).await;
        assert_eq!(gateway.save_count(), 2);
        assert_eq!(saved.load(Ordering::SeqCst), 2);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_save_mode() {
        let (gateway, _tx, _saved, handle) = setup(false);

        tokio::time::sleep(TICK * 3 + Duration::from_secs(1)).await;
        assert_eq!(gateway.save_count(), 3);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_retried_next_tick() {
        let (gateway, _tx, saved, handle) = setup(true);
        gateway.fail_next_saves(1);

        tokio::time::sleep(TICK + Duration::from_secs(1)).await;
        assert_eq!(gateway.save_count(), 0);
        assert_eq!(saved.load(Ordering::SeqCst), 0);

        tokio::time::sleep(TICK).await;
        assert_eq!(gateway.save_count(), 1);
        assert_eq!(saved.load(Ordering::SeqCst), 1);

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_closed_channel() {
        let (gateway, tx, _saved, handle) = setup(true);
        assert!(handle.is_running());
        handle.stop().await;

        tokio::time::sleep(TICK * 2).await;
        assert_eq!(gateway.save_count(), 0);

        let (gateway, tx2, _saved, handle) = setup(true);
        drop(tx);
        drop(tx2);
        tokio::time::sleep(TICK + Duration::from_secs(1)).await;
        assert!(!handle.is_running());
        assert_eq!(gateway.save_count(), 0);
    }
}
