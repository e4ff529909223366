//! Synthetic input boundary.
//!
//! The worker and the dispatcher only talk to [`InputInjector`]. The real
//! implementation drives the OS through `enigo`; [`RecordingInjector`] keeps
//! every call in memory so tests can check exactly what would have been sent.

use crate::action::{HoldTarget, MouseButton, ScreenPoint};
use crate::error::{FoxError, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Keyboard, Mouse, Settings};
use std::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::debug;

/// Platform primitives for simulated input.
pub trait InputInjector: Send + Sync {
    /// Press (`down == true`) or release a keyboard key.
    fn set_key(&self, key: char, down: bool) -> Result<()>;

    /// Press or release a mouse button.
    fn set_button(&self, button: MouseButton, down: bool) -> Result<()>;

    /// Move the pointer to an absolute screen position.
    fn move_pointer(&self, point: ScreenPoint) -> Result<()>;

    /// Current pointer position.
    fn pointer_position(&self) -> Result<ScreenPoint>;

    /// Press or release whatever a hold action targets.
    fn set_hold(&self, target: HoldTarget, down: bool) -> Result<()> {
        match target {
            HoldTarget::Key(key) => self.set_key(key, down),
            HoldTarget::Button(button) => self.set_button(button, down),
        }
    }
}

/// Real input injector using the `enigo` crate.
pub struct EnigoInjector {
    enigo: Mutex<Enigo>,
}

impl EnigoInjector {
    /// Connect to the input system. Fails when no display/session is available.
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| {
            FoxError::display_unavailable(format!("failed to create input connection: {e}"))
        })?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Enigo> {
        // A panic while holding the lock leaves nothing half-written in Enigo.
        self.enigo.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn direction(down: bool) -> Direction {
    if down {
        Direction::Press
    } else {
        Direction::Release
    }
}

fn enigo_button(button: MouseButton) -> Button {
    match button {
        MouseButton::Left => Button::Left,
        MouseButton::Right => Button::Right,
    }
}

impl InputInjector for EnigoInjector {
    fn set_key(&self, key: char, down: bool) -> Result<()> {
        debug!(%key, down, "injecting key");
        self.lock()
            .key(enigo::Key::Unicode(key), direction(down))
            .map_err(|e| FoxError::injection(e.to_string()))
    }

    fn set_button(&self, button: MouseButton, down: bool) -> Result<()> {
        debug!(?button, down, "injecting mouse button");
        self.lock()
            .button(enigo_button(button), direction(down))
            .map_err(|e| FoxError::injection(e.to_string()))
    }

    fn move_pointer(&self, point: ScreenPoint) -> Result<()> {
        self.lock()
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(|e| FoxError::injection(e.to_string()))
    }

    fn pointer_position(&self) -> Result<ScreenPoint> {
        let (x, y) = self
            .lock()
            .location()
            .map_err(|e| FoxError::injection(e.to_string()))?;
        Ok(ScreenPoint::new(x, y))
    }
}

/// One recorded injector call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectedInput {
    Key { key: char, down: bool },
    Button { button: MouseButton, down: bool },
    Move(ScreenPoint),
}

/// In-memory injector for tests and dry runs.
///
/// Every call is stored with the tokio instant it happened at, so tests on a
/// paused clock can check click spacing after the fact.
#[derive(Debug, Default)]
pub struct RecordingInjector {
    calls: Mutex<Vec<(Instant, InjectedInput)>>,
    pointer: Mutex<ScreenPoint>,
}

impl RecordingInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what [`pointer_position`](InputInjector::pointer_position) reports.
    pub fn set_pointer(&self, point: ScreenPoint) {
        *lock(&self.pointer) = point;
    }

    pub fn calls(&self) -> Vec<InjectedInput> {
        lock(&self.calls).iter().map(|(_, call)| *call).collect()
    }

    /// Forget every recorded call.
    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    /// Number of press (`down == true`) or release calls for a hold target.
    pub fn count(&self, target: HoldTarget, down: bool) -> usize {
        self.calls()
            .into_iter()
            .filter(|call| match (call, target) {
                (InjectedInput::Key { key, down: d }, HoldTarget::Key(k)) => *key == k && *d == down,
                (InjectedInput::Button { button, down: d }, HoldTarget::Button(b)) => {
                    *button == b && *d == down
                }
                _ => false,
            })
            .count()
    }

    /// Timestamps of every left-button press.
    pub fn click_times(&self) -> Vec<Instant> {
        lock(&self.calls)
            .iter()
            .filter(|(_, call)| {
                matches!(
                    call,
                    InjectedInput::Button {
                        button: MouseButton::Left,
                        down: true
                    }
                )
            })
            .map(|(at, _)| *at)
            .collect()
    }

    fn record(&self, call: InjectedInput) {
        lock(&self.calls).push((Instant::now(), call));
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl InputInjector for RecordingInjector {
    fn set_key(&self, key: char, down: bool) -> Result<()> {
        self.record(InjectedInput::Key { key, down });
        Ok(())
    }

    fn set_button(&self, button: MouseButton, down: bool) -> Result<()> {
        self.record(InjectedInput::Button { button, down });
        Ok(())
    }

    fn move_pointer(&self, point: ScreenPoint) -> Result<()> {
        self.record(InjectedInput::Move(point));
        Ok(())
    }

    fn pointer_position(&self) -> Result<ScreenPoint> {
        Ok(*lock(&self.pointer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_injector_routes_hold_targets() {
        let injector = RecordingInjector::new();
        injector.set_hold(HoldTarget::Key('w'), true).unwrap();
        injector
            .set_hold(HoldTarget::Button(MouseButton::Right), false)
            .unwrap();
        assert_eq!(
            injector.calls(),
            vec![
                InjectedInput::Key { key: 'w', down: true },
                InjectedInput::Button {
                    button: MouseButton::Right,
                    down: false
                },
            ]
        );
        assert_eq!(injector.count(HoldTarget::Key('w'), true), 1);
        assert_eq!(injector.count(HoldTarget::Key('w'), false), 0);
    }

    #[test]
    fn test_recording_injector_pointer() {
        let injector = RecordingInjector::new();
        assert_eq!(injector.pointer_position().unwrap(), ScreenPoint::default());
        injector.set_pointer(ScreenPoint::new(500, 300));
        assert_eq!(injector.pointer_position().unwrap(), ScreenPoint::new(500, 300));
        assert!(injector.calls().is_empty());
    }
}
