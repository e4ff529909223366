//! # foxtool
//!
//! Hotkey-driven input automation for a running game, with a one-line
//! heads-up overlay showing what is currently active.
//!
//! ## Features
//!
//! - Toggle a rate-limited autoclicker at a saved pointer position
//! - Toggle held keys (`w`, `s`) and held mouse buttons
//! - Suspend everything with one key and resume where you left off
//! - Click-through HUD placed over the game window (X11 and Windows)
//! - Plain-text, hand-editable hotkey bindings
//!
//! ## Example
//!
//! ```no_run
//! use foxtool::{HotkeyBindings, RecordingInjector, Session};
//! use std::sync::Arc;
//!
//! let bindings = HotkeyBindings::load_or_create("foxtool_hotkeys.cfg").unwrap();
//! let session = Session::start(bindings, Arc::new(RecordingInjector::new())).unwrap();
//! session.state().request_exit();
//! session.finish();
//! ```
//!
//! ## Binding file
//!
//! ```text
//! Spam LMB=F2
//! Hold W=F3
//! Hold S=F4
//! Hold RMB=F6
//! Hold LMB=F7
//! Suspend=F9
//! Exit=F10
//! ```
//!
//! F11 always shows or hides the overlay and cannot be rebound.

pub mod action;
pub mod app;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod global_hotkey;
pub mod injector;
pub mod overlay;
pub mod platform;
pub mod process_finder;
pub mod state;
pub mod window_locator;
pub mod worker;

pub use action::{Action, Key, ScreenPoint};
pub use app::{AppOptions, Session};
pub use config::HotkeyBindings;
pub use error::{FoxError, Result};
pub use crate::global_hotkey::HotkeyManager;
pub use injector::{EnigoInjector, InputInjector, RecordingInjector};
pub use process_finder::ProcessFinder;
pub use state::SharedState;
