//! Maps captured hotkey presses onto the shared state.

use crate::action::{Action, Key, ScreenPoint, HUD_TOGGLE_KEY};
use crate::config::HotkeyBindings;
use crate::injector::InputInjector;
use crate::state::SharedState;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a single key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The key is not bound to anything.
    Ignored,
    /// A hold or spam flag was flipped. `captured` is set when enabling spam
    /// stored a new click point.
    Toggled {
        action: Action,
        enabled: bool,
        captured: Option<ScreenPoint>,
    },
    SuspendToggled(bool),
    OverlayToggled { hidden: bool },
    Exit,
}

impl DispatchOutcome {
    /// Whether the HUD should be redrawn right away.
    pub fn needs_repaint(&self) -> bool {
        !matches!(self, DispatchOutcome::Ignored | DispatchOutcome::Exit)
    }
}

pub struct HotkeyDispatcher<I: ?Sized> {
    state: Arc<SharedState>,
    bindings: HotkeyBindings,
    injector: Arc<I>,
}

impl<I: InputInjector + ?Sized> HotkeyDispatcher<I> {
    pub fn new(state: Arc<SharedState>, bindings: HotkeyBindings, injector: Arc<I>) -> Self {
        Self {
            state,
            bindings,
            injector,
        }
    }

    /// Apply one key press.
    pub fn handle_key(&self, key: Key) -> DispatchOutcome {
        // The HUD key sits outside the action table and ignores Suspend.
        if key == HUD_TOGGLE_KEY {
            let hidden = self.state.flags.toggle_overlay_hidden();
            debug!(hidden, "overlay visibility toggled");
            return DispatchOutcome::OverlayToggled { hidden };
        }

        let Some(action) = self.bindings.action_for(key) else {
            debug!(%key, "unbound key");
            return DispatchOutcome::Ignored;
        };

        let outcome = match action {
            Action::Exit => {
                info!("exit requested");
                self.state.request_exit();
                return DispatchOutcome::Exit;
            }
            Action::Suspend => {
                let suspended = self.state.flags.toggle_suspended();
                info!(suspended, "suspend toggled");
                DispatchOutcome::SuspendToggled(suspended)
            }
            action => self.toggle(action),
        };

        self.state.notify_changed();
        outcome
    }

    fn toggle(&self, action: Action) -> DispatchOutcome {
        let enabling = !self.state.actions.is_desired(action);
        let mut captured = None;

        if action == Action::SpamClick && enabling && !self.state.flags.is_suspended() {
            match self.injector.pointer_position() {
                Ok(point) => {
                    self.state.actions.save_point(point);
                    captured = Some(point);
                }
                Err(e) => warn!(error = %e, "could not read pointer; keeping previous click point"),
            }
        }

        let enabled = self.state.actions.toggle(action).unwrap_or(false);
        info!(%action, enabled, "action toggled");
        DispatchOutcome::Toggled {
            action,
            enabled,
            captured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injector::RecordingInjector;

    fn setup() -> (Arc<SharedState>, Arc<RecordingInjector>, HotkeyDispatcher<RecordingInjector>) {
        let state = Arc::new(SharedState::new());
        let injector = Arc::new(RecordingInjector::new());
        let dispatcher = HotkeyDispatcher::new(
            Arc::clone(&state),
            HotkeyBindings::default(),
            Arc::clone(&injector),
        );
        (state, injector, dispatcher)
    }

    #[test]
    fn test_spam_captures_pointer_on_enable_only() {
        let (state, injector, dispatcher) = setup();
        injector.set_pointer(ScreenPoint::new(500, 300));

        let outcome = dispatcher.handle_key(Key::F2);
        assert_eq!(
            outcome,
            DispatchOutcome::Toggled {
                action: Action::SpamClick,
                enabled: true,
                captured: Some(ScreenPoint::new(500, 300)),
            }
        );
        assert_eq!(state.actions.saved_point(), Some(ScreenPoint::new(500, 300)));

        injector.set_pointer(ScreenPoint::new(1, 1));
        let outcome = dispatcher.handle_key(Key::F2);
        assert!(matches!(
            outcome,
            DispatchOutcome::Toggled {
                enabled: false,
                captured: None,
                ..
            }
        ));
        assert_eq!(state.actions.saved_point(), Some(ScreenPoint::new(500, 300)));

        // A fresh enable re-captures.
        dispatcher.handle_key(Key::F2);
        assert_eq!(state.actions.saved_point(), Some(ScreenPoint::new(1, 1)));
        // The dispatcher only reads the pointer; it never injects.
        assert!(injector.calls().is_empty());
    }

    #[test]
    fn test_spam_enabled_while_suspended_keeps_old_point() {
        let (state, injector, dispatcher) = setup();
        injector.set_pointer(ScreenPoint::new(10, 20));
        dispatcher.handle_key(Key::F2);
        dispatcher.handle_key(Key::F2);

        dispatcher.handle_key(Key::F9);
        injector.set_pointer(ScreenPoint::new(99, 99));
        let outcome = dispatcher.handle_key(Key::F2);

        assert!(matches!(
            outcome,
            DispatchOutcome::Toggled {
                enabled: true,
                captured: None,
                ..
            }
        ));
        assert!(state.actions.is_desired(Action::SpamClick));
        assert_eq!(state.actions.saved_point(), Some(ScreenPoint::new(10, 20)));
    }

    #[test]
    fn test_suspend_leaves_desired_flags() {
        let (state, _injector, dispatcher) = setup();
        dispatcher.handle_key(Key::F3);
        assert_eq!(dispatcher.handle_key(Key::F9), DispatchOutcome::SuspendToggled(true));
        assert!(state.flags.is_suspended());
        assert!(state.actions.is_desired(Action::HoldForward));

        // Toggling off still works while suspended.
        dispatcher.handle_key(Key::F3);
        assert!(!state.actions.is_desired(Action::HoldForward));
        assert_eq!(dispatcher.handle_key(Key::F9), DispatchOutcome::SuspendToggled(false));
    }

    #[test]
    fn test_hud_key_bypasses_suspend_and_table() {
        let (state, _injector, dispatcher) = setup();
        dispatcher.handle_key(Key::F9);
        let outcome = dispatcher.handle_key(Key::F11);
        assert_eq!(outcome, DispatchOutcome::OverlayToggled { hidden: true });
        assert!(state.flags.is_overlay_hidden());
        assert!(!state.actions.any_desired());
        assert!(outcome.needs_repaint());
    }

    #[test]
    fn test_unbound_key_and_exit() {
        let (state, _injector, dispatcher) = setup();
        let outcome = dispatcher.handle_key(Key::F8);
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(!outcome.needs_repaint());
        assert!(state.flags.is_running());

        assert_eq!(dispatcher.handle_key(Key::F10), DispatchOutcome::Exit);
        assert!(!state.flags.is_running());
    }

    #[test]
    fn test_each_hold_key_flips_its_own_flag() {
        let (state, _injector, dispatcher) = setup();
        let pairs = [
            (Key::F3, Action::HoldForward),
            (Key::F4, Action::HoldBackward),
            (Key::F6, Action::HoldSecondary),
            (Key::F7, Action::HoldPrimary),
        ];
        for (key, action) in pairs {
            dispatcher.handle_key(key);
            assert_eq!(state.actions.active(), vec![action]);
            dispatcher.handle_key(key);
            assert!(!state.actions.any_desired());
        }
    }
}
