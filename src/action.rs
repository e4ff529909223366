//! Logical actions, the keys they can be bound to, and what each hold presses.

use std::fmt;

/// One of the fixed set of things a hotkey can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Click the primary button repeatedly at the saved pointer position.
    SpamClick,
    /// Hold the move-forward key (`w`).
    HoldForward,
    /// Hold the move-backward key (`s`).
    HoldBackward,
    /// Hold the secondary (right) mouse button.
    HoldSecondary,
    /// Hold the primary (left) mouse button.
    HoldPrimary,
    /// Release everything and keep it released until toggled again.
    Suspend,
    /// Stop the program.
    Exit,
}

impl Action {
    /// Every action in binding-file order. Lookup ties resolve to the earlier entry.
    pub const ALL: [Action; 7] = [
        Action::SpamClick,
        Action::HoldForward,
        Action::HoldBackward,
        Action::HoldSecondary,
        Action::HoldPrimary,
        Action::Suspend,
        Action::Exit,
    ];

    /// Label used in the binding file and in console output.
    pub fn label(self) -> &'static str {
        match self {
            Action::SpamClick => "Spam LMB",
            Action::HoldForward => "Hold W",
            Action::HoldBackward => "Hold S",
            Action::HoldSecondary => "Hold RMB",
            Action::HoldPrimary => "Hold LMB",
            Action::Suspend => "Suspend",
            Action::Exit => "Exit",
        }
    }

    /// Exact (case-sensitive) label match.
    pub fn from_label(label: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.label() == label)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Slot of the action's desired flag; control actions have none.
    pub fn flag_slot(self) -> Option<usize> {
        match self {
            Action::Suspend | Action::Exit => None,
            other => Some(other as usize),
        }
    }

    /// The hold this action drives, if it is one.
    pub fn hold(self) -> Option<HoldAction> {
        match self {
            Action::HoldForward => Some(HoldAction::Forward),
            Action::HoldBackward => Some(HoldAction::Backward),
            Action::HoldSecondary => Some(HoldAction::Secondary),
            Action::HoldPrimary => Some(HoldAction::Primary),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Number of actions carrying a desired flag.
pub const FLAG_COUNT: usize = 5;

/// An action that keeps a key or button physically down while desired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldAction {
    Forward,
    Backward,
    Primary,
    Secondary,
}

impl HoldAction {
    /// Reconciliation order used by the worker.
    pub const ALL: [HoldAction; 4] = [
        HoldAction::Forward,
        HoldAction::Backward,
        HoldAction::Primary,
        HoldAction::Secondary,
    ];

    pub fn action(self) -> Action {
        match self {
            HoldAction::Forward => Action::HoldForward,
            HoldAction::Backward => Action::HoldBackward,
            HoldAction::Primary => Action::HoldPrimary,
            HoldAction::Secondary => Action::HoldSecondary,
        }
    }

    pub fn target(self) -> HoldTarget {
        match self {
            HoldAction::Forward => HoldTarget::Key('w'),
            HoldAction::Backward => HoldTarget::Key('s'),
            HoldAction::Primary => HoldTarget::Button(MouseButton::Left),
            HoldAction::Secondary => HoldTarget::Button(MouseButton::Right),
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// What a hold physically presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldTarget {
    Key(char),
    Button(MouseButton),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
}

/// Absolute screen coordinate in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Physical keys that can trigger actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    F2,
    F3,
    F4,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
}

/// The fixed HUD show/hide key. Never persisted, never rebindable.
pub const HUD_TOGGLE_KEY: Key = Key::F11;

impl Key {
    pub const ALL: [Key; 9] = [
        Key::F2,
        Key::F3,
        Key::F4,
        Key::F6,
        Key::F7,
        Key::F8,
        Key::F9,
        Key::F10,
        Key::F11,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Key::F2 => "F2",
            Key::F3 => "F3",
            Key::F4 => "F4",
            Key::F6 => "F6",
            Key::F7 => "F7",
            Key::F8 => "F8",
            Key::F9 => "F9",
            Key::F10 => "F10",
            Key::F11 => "F11",
        }
    }

    /// Case-insensitive name lookup.
    pub fn from_name(name: &str) -> Option<Key> {
        let upper = name.trim().to_ascii_uppercase();
        Key::ALL.into_iter().find(|k| k.name() == upper)
    }

    /// Whether the key may appear in the binding file.
    pub fn is_bindable(self) -> bool {
        self != HUD_TOGGLE_KEY
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
