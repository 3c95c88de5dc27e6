pub mod apply;
pub mod init;
pub mod show;
pub mod types;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use show::{show, ShowArgs};
pub use types::{types, TypesArgs};

use anyhow::{bail, Result};
use funnel_editor::{ComponentRegistry, EditorStore};
use funnel_workspace::{is_valid_key, FileGateway, WorkspaceConfig};
use std::path::Path;
use std::sync::Arc;

/// Config, gateway and a fresh store for commands working on one document
pub(crate) struct Workspace {
    pub config: WorkspaceConfig,
    pub gateway: Arc<FileGateway>,
    pub registry: Arc<ComponentRegistry>,
}

impl Workspace {
    pub fn load(cwd: &Path) -> Result<Self> {
        let config = WorkspaceConfig::load(cwd)?;
        let gateway = Arc::new(FileGateway::new(config.data_dir_in(cwd)));
        Ok(Self {
            config,
            gateway,
            registry: Arc::new(ComponentRegistry::with_builtins()),
        })
    }

    pub fn new_store(&self) -> EditorStore {
        EditorStore::new(self.registry.clone()).with_history(self.config.history())
    }
}

pub(crate) fn check_key(key: &str) -> Result<()> {
    if !is_valid_key(key) {
        bail!(
            "Invalid document key {:?}: use letters, digits, '-' and '_'",
            key
        );
    }
    Ok(())
}
