//! Win32 window enumeration and the layered, click-through overlay.

use super::Desktop;
use crate::error::{FoxError, Result};
use crate::overlay::{OverlaySurface, OVERLAY_HEIGHT, OVERLAY_WIDTH};
use crate::window_locator::{WindowId, WindowRect, WindowSystem};
use std::cell::Cell;
use std::ptr;
use tracing::{debug, info, warn};
use winapi::shared::minwindef::{BOOL, LPARAM, LRESULT, TRUE, UINT, WPARAM};
use winapi::shared::windef::{HFONT, HWND, RECT, SIZE};
use winapi::um::libloaderapi::GetModuleHandleW;
use winapi::um::wingdi::{
    CreateFontW, DeleteObject, GetStockObject, GetTextExtentPoint32W, SelectObject, SetBkMode,
    SetTextAlign, SetTextColor, TextOutW, BLACK_BRUSH, CLEARTYPE_QUALITY, CLIP_DEFAULT_PRECIS,
    DEFAULT_CHARSET, DEFAULT_PITCH, FF_DONTCARE, FW_NORMAL, OUT_DEFAULT_PRECIS, RGB, TA_BASELINE,
    TRANSPARENT,
};
use winapi::um::winuser::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, EnumWindows, FillRect,
    GetDC, GetWindowRect, GetWindowTextW, GetWindowThreadProcessId, IsWindowVisible,
    PeekMessageW, RegisterClassExW, ReleaseDC, SetLayeredWindowAttributes, SetWindowPos,
    ShowWindow, TranslateMessage, HWND_TOPMOST, LWA_ALPHA, LWA_COLORKEY, MSG, PM_REMOVE,
    SWP_NOACTIVATE, SW_HIDE, SW_SHOWNOACTIVATE, WM_PAINT, WNDCLASSEXW, WS_EX_LAYERED,
    WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP,
};

const CLASS_NAME: &str = "FoxtoolOverlay";

thread_local! {
    static REPAINT_REQUESTED: Cell<bool> = const { Cell::new(false) };
}

pub(super) fn open() -> Result<Desktop> {
    let surface = Win32Overlay::create()?;
    Ok(Desktop {
        windows: Box::new(Win32WindowSystem),
        surface: Box::new(surface),
    })
}

pub(super) fn pump_messages() {
    // SAFETY: standard non-blocking message loop on the calling thread.
    unsafe {
        let mut msg: MSG = std::mem::zeroed();
        while PeekMessageW(&mut msg, ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

fn wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

fn hwnd(id: WindowId) -> HWND {
    id.0 as usize as HWND
}

unsafe extern "system" fn collect_window(window: HWND, lparam: LPARAM) -> BOOL {
    // SAFETY: `lparam` is the Vec passed by `roots` and outlives EnumWindows.
    let out = unsafe { &mut *(lparam as *mut Vec<WindowId>) };
    if unsafe { IsWindowVisible(window) } != 0 {
        out.push(WindowId(window as usize as u64));
    }
    TRUE
}

/// Top-level windows only; Win32 has no useful deeper ownership for our purposes.
struct Win32WindowSystem;

impl WindowSystem for Win32WindowSystem {
    fn roots(&self) -> Vec<WindowId> {
        let mut windows: Vec<WindowId> = Vec::new();
        // SAFETY: the callback only touches `windows` during the call.
        unsafe { EnumWindows(Some(collect_window), &mut windows as *mut Vec<WindowId> as LPARAM) };
        windows
    }

    fn children(&self, _window: WindowId) -> Vec<WindowId> {
        Vec::new()
    }

    fn owning_pid(&self, window: WindowId) -> Option<u32> {
        let mut pid = 0;
        // SAFETY: a stale handle just yields pid 0.
        unsafe { GetWindowThreadProcessId(hwnd(window), &mut pid) };
        (pid != 0).then_some(pid)
    }

    fn title(&self, window: WindowId) -> Option<String> {
        let mut buf = [0u16; 256];
        // SAFETY: the buffer length is passed alongside the buffer.
        let len = unsafe { GetWindowTextW(hwnd(window), buf.as_mut_ptr(), buf.len() as i32) };
        (len > 0).then(|| String::from_utf16_lossy(&buf[..len as usize]))
    }

    fn geometry(&self, window: WindowId) -> Option<WindowRect> {
        // SAFETY: zeroed RECT filled in by the call.
        let mut rect: RECT = unsafe { std::mem::zeroed() };
        if unsafe { GetWindowRect(hwnd(window), &mut rect) } == 0 {
            return None;
        }
        Some(WindowRect {
            x: rect.left,
            y: rect.top,
            width: (rect.right - rect.left).max(0) as u32,
            height: (rect.bottom - rect.top).max(0) as u32,
        })
    }
}

unsafe extern "system" fn overlay_proc(window: HWND, msg: UINT, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_PAINT {
        REPAINT_REQUESTED.with(|flag| flag.set(true));
    }
    // SAFETY: forwarding the arguments we were given.
    unsafe { DefWindowProcW(window, msg, wparam, lparam) }
}

struct Win32Overlay {
    window: HWND,
    font: HFONT,
    size: (u32, u32),
}

impl Win32Overlay {
    fn create() -> Result<Self> {
        let class_name = wide(CLASS_NAME);
        // SAFETY: all pointers passed below outlive the calls that use them.
        unsafe {
            let instance = GetModuleHandleW(ptr::null());
            let mut class: WNDCLASSEXW = std::mem::zeroed();
            class.cbSize = std::mem::size_of::<WNDCLASSEXW>() as UINT;
            class.lpfnWndProc = Some(overlay_proc);
            class.hInstance = instance;
            class.lpszClassName = class_name.as_ptr();
            // Black is the colour key, so the erased background is see-through.
            class.hbrBackground = GetStockObject(BLACK_BRUSH as i32) as _;
            if RegisterClassExW(&class) == 0 {
                debug!("overlay window class already registered");
            }

            let window = CreateWindowExW(
                WS_EX_TOPMOST | WS_EX_LAYERED | WS_EX_TRANSPARENT | WS_EX_TOOLWINDOW,
                class_name.as_ptr(),
                wide("").as_ptr(),
                WS_POPUP,
                0,
                0,
                OVERLAY_WIDTH as i32,
                OVERLAY_HEIGHT as i32,
                ptr::null_mut(),
                ptr::null_mut(),
                instance,
                ptr::null_mut(),
            );
            if window.is_null() {
                return Err(FoxError::window("CreateWindowExW failed for the overlay"));
            }
            SetLayeredWindowAttributes(window, RGB(0, 0, 0), 255, LWA_COLORKEY | LWA_ALPHA);

            let face = wide("Renner");
            let font = CreateFontW(
                -16,
                0,
                0,
                0,
                FW_NORMAL as i32,
                0,
                0,
                0,
                DEFAULT_CHARSET as u32,
                OUT_DEFAULT_PRECIS as u32,
                CLIP_DEFAULT_PRECIS as u32,
                CLEARTYPE_QUALITY as u32,
                (DEFAULT_PITCH | FF_DONTCARE) as u32,
                face.as_ptr(),
            );
            if font.is_null() {
                warn!("could not create overlay font; GDI default is used");
            }

            info!("overlay window created");
            Ok(Self {
                window,
                font,
                size: (OVERLAY_WIDTH, OVERLAY_HEIGHT),
            })
        }
    }

    /// Run `paint` with a device context set up for overlay text.
    fn with_dc<T>(&self, paint: impl FnOnce(winapi::shared::windef::HDC) -> T) -> T {
        // SAFETY: the DC is released before returning.
        unsafe {
            let dc = GetDC(self.window);
            if !self.font.is_null() {
                SelectObject(dc, self.font as _);
            }
            let result = paint(dc);
            ReleaseDC(self.window, dc);
            result
        }
    }
}

impl OverlaySurface for Win32Overlay {
    fn text_extent(&self, text: &str) -> Option<(u32, u32)> {
        let text: Vec<u16> = text.encode_utf16().collect();
        self.with_dc(|dc| {
            // SAFETY: `text` outlives the call; length is in UTF-16 units.
            let mut size: SIZE = unsafe { std::mem::zeroed() };
            let ok = unsafe { GetTextExtentPoint32W(dc, text.as_ptr(), text.len() as i32, &mut size) };
            (ok != 0).then(|| (size.cx.max(0) as u32, size.cy.max(0) as u32))
        })
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, width: u32, height: u32) {
        let rect = RECT {
            left: 0,
            top: 0,
            right: width as i32,
            bottom: height as i32,
        };
        self.with_dc(|dc| unsafe {
            // SAFETY: stock objects need no cleanup.
            FillRect(dc, &rect, GetStockObject(BLACK_BRUSH as i32) as _);
        });
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let text: Vec<u16> = text.encode_utf16().collect();
        self.with_dc(|dc| unsafe {
            // SAFETY: `text` outlives the call.
            SetBkMode(dc, TRANSPARENT as i32);
            SetTextColor(dc, RGB(255, 255, 255));
            SetTextAlign(dc, TA_BASELINE);
            TextOutW(dc, x, y, text.as_ptr(), text.len() as i32);
        });
    }

    fn place(&mut self, rect: WindowRect) {
        debug!(?rect, "placing overlay");
        // SAFETY: our own window handle.
        unsafe {
            SetWindowPos(
                self.window,
                HWND_TOPMOST,
                rect.x,
                rect.y,
                rect.width as i32,
                rect.height as i32,
                SWP_NOACTIVATE,
            );
        }
        self.size = (rect.width, rect.height);
    }

    fn set_visible(&mut self, visible: bool) {
        let command = if visible { SW_SHOWNOACTIVATE } else { SW_HIDE };
        // SAFETY: our own window handle.
        unsafe { ShowWindow(self.window, command) };
    }

    fn pump(&mut self) -> bool {
        // Messages are dispatched by `pump_messages`; this only collects the result.
        REPAINT_REQUESTED.with(|flag| flag.replace(false))
    }
}

impl Drop for Win32Overlay {
    fn drop(&mut self) {
        // SAFETY: handles created in `create`, released once.
        unsafe {
            DestroyWindow(self.window);
            if !self.font.is_null() {
                DeleteObject(self.font as _);
            }
        }
        debug!("overlay window destroyed");
    }
}
