//! Window-system backends.
//!
//! One backend is compiled per target: Xlib on Linux, Win32 on Windows, and
//! a headless fallback elsewhere.

use crate::error::Result;
use crate::overlay::{HeadlessSurface, OverlaySurface};
use crate::window_locator::{NullWindowSystem, WindowSystem};

#[cfg(target_os = "linux")]
mod x11;

#[cfg(windows)]
mod win32;

/// Window enumeration plus the surface the HUD is painted on.
pub struct Desktop {
    pub windows: Box<dyn WindowSystem>,
    pub surface: Box<dyn OverlaySurface>,
}

impl Desktop {
    pub fn headless() -> Self {
        Self {
            windows: Box::new(NullWindowSystem),
            surface: Box::new(HeadlessSurface),
        }
    }
}

/// Connect to the native window system and create the overlay surface.
pub fn open_desktop() -> Result<Desktop> {
    #[cfg(target_os = "linux")]
    {
        x11::open()
    }
    #[cfg(windows)]
    {
        win32::open()
    }
    #[cfg(not(any(target_os = "linux", windows)))]
    {
        Err(crate::error::FoxError::unsupported_platform(
            std::env::consts::OS,
        ))
    }
}

/// Service the calling thread's window message queue.
///
/// Win32 delivers hotkey and paint messages only while the thread that owns
/// the windows pumps them; the event loop calls this on every iteration.
pub fn pump_messages() {
    #[cfg(windows)]
    win32::pump_messages();
}
