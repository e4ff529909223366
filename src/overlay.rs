//! HUD text and the renderer that paints it.
//!
//! The status line is a pure function of the shared state and the bindings.
//! [`OverlayRenderer`] owns a platform [`OverlaySurface`] and only clears the
//! part of it that text occupies, so a transparent overlay stays cheap to
//! repaint at the fast cadence.

use crate::action::{Action, HUD_TOGGLE_KEY};
use crate::config::HotkeyBindings;
use crate::state::SharedState;
use crate::window_locator::{TargetWindow, WindowId, WindowRect, WindowSystem};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const OVERLAY_WIDTH: u32 = 800;
pub const OVERLAY_HEIGHT: u32 = 32;

/// Baseline origin of the status text inside the overlay.
pub const TEXT_X: i32 = 4;
pub const TEXT_Y: i32 = 18;

/// Redraw cadence while the HUD is visible or anything is active.
pub const FAST_REDRAW: Duration = Duration::from_millis(30);
/// Redraw cadence while hidden and idle.
pub const SLOW_REDRAW: Duration = Duration::from_millis(100);

/// Build the one-line HUD text.
pub fn status_line(state: &SharedState, bindings: &HotkeyBindings) -> String {
    let key = |action: Action| bindings.key_for(action);
    let mut line = format!(
        "{} spam LMB saved position | {} hold W | {} hold S | {} hold RMB | {} hold LMB | {} stop | {} exit | {} hide HUD",
        key(Action::SpamClick),
        key(Action::HoldForward),
        key(Action::HoldBackward),
        key(Action::HoldSecondary),
        key(Action::HoldPrimary),
        key(Action::Suspend),
        key(Action::Exit),
        HUD_TOGGLE_KEY,
    );

    let mut active = String::new();
    for action in state.actions.active() {
        active.push(' ');
        active.push_str(short_name(action));
    }
    if state.flags.is_suspended() {
        active.push_str(" [SUSP]");
    }
    if !active.is_empty() {
        line.push_str(" | Active:");
        line.push_str(&active);
    }
    line
}

fn short_name(action: Action) -> &'static str {
    match action {
        Action::SpamClick => "Spam",
        Action::HoldForward => "W",
        Action::HoldBackward => "S",
        Action::HoldSecondary => "RMB",
        Action::HoldPrimary => "LMB",
        Action::Suspend => "[SUSP]",
        Action::Exit => "",
    }
}

/// How long the event loop may wait before the next periodic redraw.
pub fn redraw_interval(state: &SharedState) -> Duration {
    if !state.flags.is_overlay_hidden() || state.actions.any_desired() {
        FAST_REDRAW
    } else {
        SLOW_REDRAW
    }
}

/// Area to clear for text of the given pixel extent.
///
/// Without a measurable font the whole surface is cleared.
pub fn clear_region(extent: Option<(u32, u32)>, surface: (u32, u32)) -> (u32, u32) {
    let (width, height) = extent.unwrap_or((surface.0, OVERLAY_HEIGHT));
    (
        width.saturating_add(8).min(surface.0),
        height.saturating_add(4).min(surface.1),
    )
}

/// Overlay placement: along the top edge of the target, or the screen origin.
pub fn overlay_rect(target: Option<WindowRect>) -> WindowRect {
    WindowRect {
        x: target.map_or(0, |t| t.x),
        y: 0,
        width: OVERLAY_WIDTH,
        height: OVERLAY_HEIGHT,
    }
}

/// Platform drawing surface for the HUD.
pub trait OverlaySurface {
    /// Pixel width and height of `text`, when a font is available to measure it.
    fn text_extent(&self, text: &str) -> Option<(u32, u32)>;

    /// Current surface size.
    fn size(&self) -> (u32, u32);

    /// Make the top-left `width` x `height` area blank (transparent if possible).
    fn clear(&mut self, width: u32, height: u32);

    fn draw_text(&mut self, x: i32, y: i32, text: &str);

    fn place(&mut self, rect: WindowRect);

    fn set_visible(&mut self, visible: bool);

    /// Handle pending window-system events. Returns `true` when the surface
    /// lost its contents and needs a repaint.
    fn pump(&mut self) -> bool;
}

/// Surface that draws nothing; used with `--no-overlay` and on platforms
/// without an overlay backend.
#[derive(Debug, Default)]
pub struct HeadlessSurface;

impl OverlaySurface for HeadlessSurface {
    fn text_extent(&self, _text: &str) -> Option<(u32, u32)> {
        None
    }

    fn size(&self) -> (u32, u32) {
        (OVERLAY_WIDTH, OVERLAY_HEIGHT)
    }

    fn clear(&mut self, _width: u32, _height: u32) {}

    fn draw_text(&mut self, _x: i32, _y: i32, _text: &str) {}

    fn place(&mut self, _rect: WindowRect) {}

    fn set_visible(&mut self, _visible: bool) {}

    fn pump(&mut self) -> bool {
        false
    }
}

pub struct OverlayRenderer {
    state: Arc<SharedState>,
    bindings: HotkeyBindings,
    surface: Box<dyn OverlaySurface>,
    windows: Box<dyn WindowSystem>,
    target: Option<WindowId>,
    placement: WindowRect,
    visible: bool,
    last_clear: (u32, u32),
}

impl OverlayRenderer {
    /// Place the surface over `target` and show it unless the HUD is hidden.
    ///
    /// `windows` is asked for the target's current geometry every time the
    /// HUD is shown, so the overlay follows a game window that has moved.
    pub fn new(
        state: Arc<SharedState>,
        bindings: HotkeyBindings,
        surface: Box<dyn OverlaySurface>,
        windows: Box<dyn WindowSystem>,
        target: Option<&TargetWindow>,
    ) -> Self {
        let mut renderer = Self {
            state,
            bindings,
            surface,
            windows,
            target: target.map(|t| t.id),
            placement: overlay_rect(target.map(|t| t.rect)),
            visible: false,
            last_clear: (0, 0),
        };
        renderer.redraw();
        renderer
    }

    /// Bring visibility in line with the HUD flag and repaint if shown.
    pub fn redraw(&mut self) {
        let hidden = self.state.flags.is_overlay_hidden();
        if hidden {
            if self.visible {
                debug!("hiding overlay");
                self.surface.set_visible(false);
                self.visible = false;
            }
            return;
        }
        if !self.visible {
            debug!("showing overlay");
            self.follow_target();
            self.surface.place(self.placement);
            self.surface.set_visible(true);
            self.visible = true;
            self.last_clear = self.surface.size();
        }

        let text = status_line(&self.state, &self.bindings);
        let region = clear_region(self.surface.text_extent(&text), self.surface.size());
        // Cover whatever the previous, possibly longer, line left behind.
        let width = region.0.max(self.last_clear.0);
        let height = region.1.max(self.last_clear.1);
        self.surface.clear(width, height);
        self.surface.draw_text(TEXT_X, TEXT_Y, &text);
        self.last_clear = region;
    }

    /// Service window-system events, repainting when the surface asks for it.
    pub fn pump(&mut self) {
        if self.surface.pump() {
            self.last_clear = self.surface.size();
            self.redraw();
        }
    }

    // A target that has gone away keeps the last known placement.
    fn follow_target(&mut self) {
        let Some(id) = self.target else {
            return;
        };
        match self.windows.geometry(id) {
            Some(rect) => self.placement = overlay_rect(Some(rect)),
            None => debug!(window = id.0, "target window gone; keeping last placement"),
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        if self.visible {
            self.surface.set_visible(false);
        }
    }
}
