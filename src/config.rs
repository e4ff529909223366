//! Hotkey binding file.
//!
//! The file is plain text with one `Action=Key` pair per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! Spam LMB=F2
//! Hold W=F3
//! ```
//!
//! Lines that do not parse, name an unknown action, or name a key that cannot
//! be bound are skipped and the previous binding stays in place. The HUD key
//! (F11) is fixed and never written.

use crate::action::{Action, Key, HUD_TOGGLE_KEY};
use crate::error::{FoxError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, info, warn};

/// Default location of the binding file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "foxtool_hotkeys.cfg";

/// Action → key mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyBindings {
    keys: [Key; 7],
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            keys: [
                Key::F2,
                Key::F3,
                Key::F4,
                Key::F6,
                Key::F7,
                Key::F9,
                Key::F10,
            ],
        }
    }
}

impl HotkeyBindings {
    pub fn key_for(&self, action: Action) -> Key {
        self.keys[action.index()]
    }

    /// Bind `action` to `key`. Returns `false` for the reserved HUD key.
    pub fn bind(&mut self, action: Action, key: Key) -> bool {
        if !key.is_bindable() {
            return false;
        }
        self.keys[action.index()] = key;
        true
    }

    /// Action bound to `key`; the first action in file order wins a tie.
    pub fn action_for(&self, key: Key) -> Option<Action> {
        Action::ALL.into_iter().find(|a| self.key_for(*a) == key)
    }

    /// Distinct keys to register, always including the HUD key.
    pub fn registered_keys(&self) -> Vec<Key> {
        let mut keys: Vec<Key> = Vec::with_capacity(self.keys.len() + 1);
        for key in self.keys.iter().copied().chain(std::iter::once(HUD_TOGGLE_KEY)) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    /// Pairs of actions sharing a key. Only the first of each pair is reachable.
    pub fn conflicts(&self) -> Vec<(Action, Action)> {
        let mut out = Vec::new();
        for (i, a) in Action::ALL.iter().enumerate() {
            for b in &Action::ALL[i + 1..] {
                if self.key_for(*a) == self.key_for(*b) {
                    out.push((*a, *b));
                }
            }
        }
        out
    }

    /// Apply every valid line of `text` on top of the current bindings.
    pub fn apply_str(&mut self, text: &str) {
        for (lineno, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let Some((name, value)) = trimmed.split_once('=') else {
                debug!(line = lineno + 1, "skipping line without '='");
                continue;
            };
            let Some(action) = Action::from_label(name.trim()) else {
                debug!(line = lineno + 1, name = name.trim(), "unknown action");
                continue;
            };
            let value = value.split_whitespace().next().unwrap_or("");
            match Key::from_name(value) {
                Some(key) if self.bind(action, key) => {}
                _ => debug!(line = lineno + 1, value, "unusable key name"),
            }
        }
    }

    /// Defaults with `text` applied on top.
    pub fn parse(text: &str) -> Self {
        let mut bindings = Self::default();
        bindings.apply_str(text);
        bindings
    }

    /// Load bindings from an existing file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| FoxError::config_load(path.display().to_string(), e.to_string()))?;
        Ok(Self::parse(&content))
    }

    /// Load bindings, writing the defaults when the file does not exist yet.
    pub fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bindings = match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let defaults = Self::default();
                match defaults.save_to_file(path) {
                    Ok(()) => info!(path = %path.display(), "wrote default hotkey bindings"),
                    Err(e) => warn!("{e}"),
                }
                defaults
            }
            Err(e) => {
                return Err(FoxError::config_load(
                    path.display().to_string(),
                    e.to_string(),
                ))
            }
        };

        for (kept, shadowed) in bindings.conflicts() {
            warn!(
                key = %bindings.key_for(kept),
                "'{kept}' and '{shadowed}' share a key; '{shadowed}' is unreachable"
            );
        }
        Ok(bindings)
    }

    /// File representation: the seven `Action=Key` lines.
    pub fn to_config_string(&self) -> String {
        Action::ALL
            .iter()
            .map(|a| format!("{}={}\n", a.label(), self.key_for(*a)))
            .collect()
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_config_string())
            .map_err(|e| FoxError::config_save(path.display().to_string(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let b = HotkeyBindings::default();
        assert_eq!(b.key_for(Action::SpamClick), Key::F2);
        assert_eq!(b.key_for(Action::HoldForward), Key::F3);
        assert_eq!(b.key_for(Action::HoldBackward), Key::F4);
        assert_eq!(b.key_for(Action::HoldSecondary), Key::F6);
        assert_eq!(b.key_for(Action::HoldPrimary), Key::F7);
        assert_eq!(b.key_for(Action::Suspend), Key::F9);
        assert_eq!(b.key_for(Action::Exit), Key::F10);
        assert!(b.conflicts().is_empty());
    }

    #[test]
    fn test_default_file_contents() {
        assert_eq!(
            HotkeyBindings::default().to_config_string(),
            "Spam LMB=F2\nHold W=F3\nHold S=F4\nHold RMB=F6\nHold LMB=F7\nSuspend=F9\nExit=F10\n"
        );
    }

    #[test]
    fn test_parse_skips_comments_and_garbage() {
        let text = "# my bindings\n\
                    \n\
                    Hold W=f8\n\
                    Jump=F3\n\
                    Hold S=F12\n\
                    Suspend\n\
                    Exit = F4 trailing\n";
        let b = HotkeyBindings::parse(text);
        assert_eq!(b.key_for(Action::HoldForward), Key::F8);
        assert_eq!(b.key_for(Action::HoldBackward), Key::F4);
        assert_eq!(b.key_for(Action::Suspend), Key::F9);
        assert_eq!(b.key_for(Action::Exit), Key::F4);
    }

    #[test]
    fn test_hud_key_cannot_be_bound() {
        let b = HotkeyBindings::parse("Spam LMB=F11\n");
        assert_eq!(b.key_for(Action::SpamClick), Key::F2);
        assert_eq!(b.action_for(Key::F11), None);
    }

    #[test]
    fn test_lookup_and_registered_keys() {
        let b = HotkeyBindings::default();
        assert_eq!(b.action_for(Key::F9), Some(Action::Suspend));
        assert_eq!(b.action_for(Key::F8), None);
        let keys = b.registered_keys();
        assert_eq!(keys.len(), 8);
        assert!(keys.contains(&Key::F11));
    }

    #[test]
    fn test_duplicate_key_prefers_first_action() {
        let b = HotkeyBindings::parse("Exit=F2\n");
        assert_eq!(b.action_for(Key::F2), Some(Action::SpamClick));
        assert_eq!(b.conflicts(), vec![(Action::SpamClick, Action::Exit)]);
        assert_eq!(b.registered_keys().len(), 7);
    }
}
