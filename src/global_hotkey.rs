use crate::action::Key;
use crate::config::HotkeyBindings;
use crate::error::{FoxError, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use global_hotkey::hotkey::{Code, HotKey};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of waiting for the next hotkey.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyWait {
    Key(Key),
    Timeout,
    /// An event arrived that is not a press of a registered key.
    Ignored,
    /// The event source is gone; no more keys will arrive.
    Closed,
}

/// Blocking-with-timeout source of hotkey presses.
pub trait HotkeySource {
    fn wait(&self, timeout: Duration) -> HotkeyWait;
}

/// Registers the bound keys system-wide and unregisters them on drop.
pub struct HotkeyManager {
    manager: GlobalHotKeyManager,
    registered: Vec<HotKey>,
    by_id: HashMap<u32, Key>,
}

impl HotkeyManager {
    /// Register every distinct bound key plus the HUD key, without modifiers.
    pub fn register(bindings: &HotkeyBindings) -> Result<Self> {
        let manager = GlobalHotKeyManager::new()
            .map_err(|e| FoxError::hotkey(format!("failed to create hotkey manager: {e}")))?;

        let mut this = Self {
            manager,
            registered: Vec::new(),
            by_id: HashMap::new(),
        };

        for key in bindings.registered_keys() {
            let hotkey = HotKey::new(None, key_code(key));
            this.manager
                .register(hotkey)
                .map_err(|e| FoxError::hotkey(format!("failed to register {key}: {e}")))?;
            debug!(%key, id = hotkey.id(), "hotkey registered");
            this.registered.push(hotkey);
            this.by_id.insert(hotkey.id(), key);
        }

        info!(count = this.registered.len(), "global hotkeys registered");
        Ok(this)
    }
}

impl HotkeySource for HotkeyManager {
    fn wait(&self, timeout: Duration) -> HotkeyWait {
        match GlobalHotKeyEvent::receiver().recv_timeout(timeout) {
            Ok(event) if event.state == HotKeyState::Pressed => match self.by_id.get(&event.id) {
                Some(key) => HotkeyWait::Key(*key),
                None => HotkeyWait::Ignored,
            },
            Ok(_) => HotkeyWait::Ignored,
            Err(RecvTimeoutError::Timeout) => HotkeyWait::Timeout,
            Err(RecvTimeoutError::Disconnected) => HotkeyWait::Closed,
        }
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        for hotkey in self.registered.drain(..) {
            if let Err(e) = self.manager.unregister(hotkey) {
                warn!(id = hotkey.id(), "failed to unregister hotkey: {e}");
            }
        }
        debug!("global hotkeys unregistered");
    }
}

fn key_code(key: Key) -> Code {
    match key {
        Key::F2 => Code::F2,
        Key::F3 => Code::F3,
        Key::F4 => Code::F4,
        Key::F6 => Code::F6,
        Key::F7 => Code::F7,
        Key::F8 => Code::F8,
        Key::F9 => Code::F9,
        Key::F10 => Code::F10,
        Key::F11 => Code::F11,
    }
}

/// Hotkey source fed from a channel, for tests and scripted runs.
pub struct ChannelHotkeySource {
    receiver: Receiver<Key>,
}

impl ChannelHotkeySource {
    pub fn new() -> (Sender<Key>, Self) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (sender, Self { receiver })
    }
}

impl HotkeySource for ChannelHotkeySource {
    fn wait(&self, timeout: Duration) -> HotkeyWait {
        match self.receiver.recv_timeout(timeout) {
            Ok(key) => HotkeyWait::Key(key),
            Err(RecvTimeoutError::Timeout) => HotkeyWait::Timeout,
            Err(RecvTimeoutError::Disconnected) => HotkeyWait::Closed,
        }
    }
}
