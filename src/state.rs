//! Shared action state and runtime flags.
//!
//! One [`SharedState`] is created at startup and handed (behind an `Arc`) to
//! the worker, the dispatcher and the overlay renderer. Every field is an
//! independent atomic: a toggle flips exactly one flag, readers never wait on
//! writers, and a reader that sees one field a tick late is fine.

use crate::action::{Action, ScreenPoint, FLAG_COUNT};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// Desired flags for every non-control action plus the saved click point.
#[derive(Debug, Default)]
pub struct ActionState {
    desired: [AtomicBool; FLAG_COUNT],
    saved_point: AtomicU64,
    has_point: AtomicBool,
}

impl ActionState {
    /// Desired flag of `action`. Always `false` for Suspend and Exit.
    pub fn is_desired(&self, action: Action) -> bool {
        action
            .flag_slot()
            .is_some_and(|slot| self.desired[slot].load(Ordering::Acquire))
    }

    /// Flip the desired flag and return the new value.
    pub fn toggle(&self, action: Action) -> Option<bool> {
        let slot = action.flag_slot()?;
        Some(!self.desired[slot].fetch_xor(true, Ordering::AcqRel))
    }

    pub fn clear_all(&self) {
        for flag in &self.desired {
            flag.store(false, Ordering::Release);
        }
    }

    pub fn any_desired(&self) -> bool {
        self.desired.iter().any(|f| f.load(Ordering::Acquire))
    }

    /// Actions whose desired flag is currently set, in overlay order.
    pub fn active(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|a| self.is_desired(*a))
            .collect()
    }

    /// Last captured pointer position, or `None` if nothing was captured yet.
    pub fn saved_point(&self) -> Option<ScreenPoint> {
        if !self.has_point.load(Ordering::Acquire) {
            return None;
        }
        Some(unpack_point(self.saved_point.load(Ordering::Acquire)))
    }

    pub fn save_point(&self, point: ScreenPoint) {
        self.saved_point.store(pack_point(point), Ordering::Release);
        self.has_point.store(true, Ordering::Release);
    }
}

// x and y share one word so a reader never sees a half-updated point.
fn pack_point(point: ScreenPoint) -> u64 {
    ((point.x as u32 as u64) << 32) | point.y as u32 as u64
}

fn unpack_point(packed: u64) -> ScreenPoint {
    ScreenPoint::new((packed >> 32) as u32 as i32, packed as u32 as i32)
}

/// Process-wide lifecycle flags.
#[derive(Debug)]
pub struct RuntimeFlags {
    running: AtomicBool,
    suspended: AtomicBool,
    overlay_hidden: AtomicBool,
}

impl Default for RuntimeFlags {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            suspended: AtomicBool::new(false),
            overlay_hidden: AtomicBool::new(false),
        }
    }
}

impl RuntimeFlags {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    pub fn is_overlay_hidden(&self) -> bool {
        self.overlay_hidden.load(Ordering::Acquire)
    }

    /// Flip the suspend flag and return the new value.
    pub fn toggle_suspended(&self) -> bool {
        !self.suspended.fetch_xor(true, Ordering::AcqRel)
    }

    /// Flip HUD visibility and return whether it is now hidden.
    pub fn toggle_overlay_hidden(&self) -> bool {
        !self.overlay_hidden.fetch_xor(true, Ordering::AcqRel)
    }
}

/// Everything the worker, dispatcher and renderer share.
#[derive(Debug, Default)]
pub struct SharedState {
    pub actions: ActionState,
    pub flags: RuntimeFlags,
    changed: Notify,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop every loop. The worker releases all holds before it returns.
    pub fn request_exit(&self) {
        self.flags.running.store(false, Ordering::Release);
        self.notify_changed();
    }

    /// Wake the worker early so it sees a state change before its next tick.
    pub fn notify_changed(&self) {
        self.changed.notify_one();
    }

    /// Resolves after the next [`notify_changed`](Self::notify_changed).
    pub async fn changed(&self) {
        self.changed.notified().await;
    }
}
