pub mod autosave;
pub mod config;
pub mod gateway;
pub mod session;

pub use autosave::{spawn_autosave, AutosaveHandle, AutosaveOptions, AutosaveSnapshot};
pub use config::{ConfigError, WorkspaceConfig, DEFAULT_CONFIG_NAME};
pub use gateway::{is_valid_key, FileGateway, LoadError, MemoryGateway, PersistError, PersistenceGateway};
pub use session::{EditorSession, SessionError};
