//! Keyboard shortcuts.
//!
//! Handles:
//! - Cmd/Ctrl+Z (Undo)
//! - Cmd/Ctrl+Shift+Z, Cmd/Ctrl+Y (Redo)
//! - Cmd/Ctrl+S (Save)
//!
//! "Command" means Ctrl on Windows/Linux and Cmd on macOS; hosts report
//! whichever they saw and both are accepted.

/// Modifier keys held during a key press
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub const COMMAND: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const COMMAND_SHIFT: Self = Self {
        ctrl: true,
        shift: true,
        ..Self::NONE
    };

    /// Ctrl or Cmd
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Character produced by the key, e.g. `"z"`
    pub key: String,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            modifiers,
        }
    }
}

/// Editor action bound to a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    Undo,
    Redo,
    Save,
}

/// Map a key press to its action, if any
pub fn resolve(event: &KeyEvent) -> Option<ShortcutAction> {
    let modifiers = event.modifiers;
    if !modifiers.command() || modifiers.alt {
        return None;
    }

    // Shift may turn the reported character uppercase
    match event.key.to_ascii_lowercase().as_str() {
        "z" if modifiers.shift => Some(ShortcutAction::Redo),
        "z" => Some(ShortcutAction::Undo),
        "y" if !modifiers.shift => Some(ShortcutAction::Redo),
        "s" if !modifiers.shift => Some(ShortcutAction::Save),
        _ => None,
    }
}
