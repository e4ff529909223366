//! Xlib window enumeration and the ARGB overlay window.

use super::Desktop;
use crate::error::{FoxError, Result};
use crate::overlay::{OverlaySurface, OVERLAY_HEIGHT, OVERLAY_WIDTH};
use crate::window_locator::{WindowId, WindowRect, WindowSystem};
use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar, c_uint, c_ulong};
use std::ptr;
use std::rc::Rc;
use tracing::{debug, info, trace, warn};
use ::x11::{xfixes, xlib};

// From X11/extensions/shape.h; the x11 crate does not export it.
const SHAPE_INPUT: c_int = 2;

pub(super) fn open() -> Result<Desktop> {
    let conn = X11Connection::open()?;
    let windows = X11WindowSystem::new(Rc::clone(&conn));
    let surface = X11Overlay::create(conn)?;
    Ok(Desktop {
        windows: Box::new(windows),
        surface: Box::new(surface),
    })
}

unsafe extern "C" fn log_x_error(_display: *mut xlib::Display, event: *mut xlib::XErrorEvent) -> c_int {
    // Windows can vanish mid-walk; BadWindow is expected and must not abort.
    if !event.is_null() {
        // SAFETY: Xlib passes a valid event pointer for the duration of the call.
        let event = unsafe { &*event };
        trace!(
            code = event.error_code,
            request = event.request_code,
            "ignored X error"
        );
    }
    0
}

struct X11Connection {
    display: *mut xlib::Display,
}

impl X11Connection {
    fn open() -> Result<Rc<Self>> {
        // SAFETY: a null name selects $DISPLAY.
        let display = unsafe { xlib::XOpenDisplay(ptr::null()) };
        if display.is_null() {
            let env = std::env::var("DISPLAY").unwrap_or_else(|_| "<unset>".to_string());
            return Err(FoxError::display_unavailable(format!(
                "XOpenDisplay failed; DISPLAY={env}"
            )));
        }
        // SAFETY: installing a process-wide handler with the expected signature.
        unsafe { xlib::XSetErrorHandler(Some(log_x_error)) };
        debug!("connected to X display");
        Ok(Rc::new(Self { display }))
    }

    fn raw(&self) -> *mut xlib::Display {
        self.display
    }
}

impl Drop for X11Connection {
    fn drop(&mut self) {
        // SAFETY: opened in `open`, closed exactly once here.
        unsafe { xlib::XCloseDisplay(self.display) };
    }
}

struct X11WindowSystem {
    conn: Rc<X11Connection>,
    pid_atom: xlib::Atom,
}

impl X11WindowSystem {
    fn new(conn: Rc<X11Connection>) -> Self {
        // SAFETY: valid display and a NUL-terminated atom name; only_if_exists = True.
        let pid_atom =
            unsafe { xlib::XInternAtom(conn.raw(), c"_NET_WM_PID".as_ptr(), xlib::True) };
        if pid_atom == 0 {
            warn!("window manager does not publish _NET_WM_PID; only titles can match");
        }
        Self { conn, pid_atom }
    }
}

impl WindowSystem for X11WindowSystem {
    fn roots(&self) -> Vec<WindowId> {
        let dpy = self.conn.raw();
        // SAFETY: valid display; screen indexes come from XScreenCount.
        unsafe {
            (0..xlib::XScreenCount(dpy))
                .map(|screen| WindowId(xlib::XRootWindow(dpy, screen) as u64))
                .collect()
        }
    }

    fn children(&self, window: WindowId) -> Vec<WindowId> {
        let mut root: xlib::Window = 0;
        let mut parent: xlib::Window = 0;
        let mut children: *mut xlib::Window = ptr::null_mut();
        let mut count: c_uint = 0;

        // SAFETY: every out pointer is valid; `children` is freed below.
        let ok = unsafe {
            xlib::XQueryTree(
                self.conn.raw(),
                window.0 as xlib::Window,
                &mut root,
                &mut parent,
                &mut children,
                &mut count,
            )
        };
        if ok == 0 || children.is_null() {
            return Vec::new();
        }

        // SAFETY: XQueryTree returned `count` windows at `children`.
        let list = unsafe { std::slice::from_raw_parts(children, count as usize) }
            .iter()
            .map(|w| WindowId(*w as u64))
            .collect();
        // SAFETY: `children` came from XQueryTree and is not used afterwards.
        unsafe { xlib::XFree(children.cast()) };
        list
    }

    fn owning_pid(&self, window: WindowId) -> Option<u32> {
        if self.pid_atom == 0 {
            return None;
        }
        let mut actual_type: xlib::Atom = 0;
        let mut format: c_int = 0;
        let mut items: c_ulong = 0;
        let mut remaining: c_ulong = 0;
        let mut data: *mut c_uchar = ptr::null_mut();

        // SAFETY: out pointers are valid; `data` is freed below when set.
        let status = unsafe {
            xlib::XGetWindowProperty(
                self.conn.raw(),
                window.0 as xlib::Window,
                self.pid_atom,
                0,
                1,
                xlib::False,
                xlib::XA_CARDINAL,
                &mut actual_type,
                &mut format,
                &mut items,
                &mut remaining,
                &mut data,
            )
        };
        if data.is_null() {
            return None;
        }
        let pid = if status == xlib::Success as c_int && items >= 1 && format == 32 {
            // Format-32 properties are handed back as C longs.
            // SAFETY: at least one item of format 32 is present.
            Some(unsafe { *(data as *const c_ulong) } as u32)
        } else {
            None
        };
        // SAFETY: `data` was allocated by XGetWindowProperty and is freed once.
        unsafe { xlib::XFree(data.cast()) };
        pid
    }

    fn title(&self, window: WindowId) -> Option<String> {
        let mut name: *mut c_char = ptr::null_mut();
        // SAFETY: `name` is freed below when set.
        let ok = unsafe { xlib::XFetchName(self.conn.raw(), window.0 as xlib::Window, &mut name) };
        if ok == 0 || name.is_null() {
            return None;
        }
        // SAFETY: XFetchName returns a NUL-terminated string.
        let title = unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned();
        // SAFETY: the title was copied out above; `name` is freed once.
        unsafe { xlib::XFree(name.cast()) };
        Some(title)
    }

    fn geometry(&self, window: WindowId) -> Option<WindowRect> {
        let dpy = self.conn.raw();
        let window = window.0 as xlib::Window;
        // SAFETY: zeroed plain-old-data filled in by Xlib.
        let mut attrs: xlib::XWindowAttributes = unsafe { std::mem::zeroed() };
        // SAFETY: valid display and out pointer; a stale window only returns 0.
        if unsafe { xlib::XGetWindowAttributes(dpy, window, &mut attrs) } == 0 {
            return None;
        }

        let mut x: c_int = 0;
        let mut y: c_int = 0;
        let mut child: xlib::Window = 0;
        // SAFETY: `attrs.root` was just reported by the server for this window.
        let ok = unsafe {
            xlib::XTranslateCoordinates(dpy, window, attrs.root, 0, 0, &mut x, &mut y, &mut child)
        };
        if ok == 0 {
            return None;
        }
        Some(WindowRect {
            x,
            y,
            width: attrs.width.max(0) as u32,
            height: attrs.height.max(0) as u32,
        })
    }
}

struct X11Overlay {
    conn: Rc<X11Connection>,
    window: xlib::Window,
    gc: xlib::GC,
    font: *mut xlib::XFontStruct,
    colormap: Option<xlib::Colormap>,
    text_pixel: c_ulong,
    clear_pixel: c_ulong,
    size: (u32, u32),
}

impl X11Overlay {
    fn create(conn: Rc<X11Connection>) -> Result<Self> {
        let dpy = conn.raw();
        // SAFETY: every call below receives the open display and handles
        // created in this function.
        unsafe {
            let screen = xlib::XDefaultScreen(dpy);
            let root = xlib::XRootWindow(dpy, screen);

            let mut vinfo: xlib::XVisualInfo = std::mem::zeroed();
            let argb = xlib::XMatchVisualInfo(dpy, screen, 32, xlib::TrueColor, &mut vinfo) != 0;

            let mut attrs: xlib::XSetWindowAttributes = std::mem::zeroed();
            attrs.override_redirect = xlib::True;
            let (window, colormap) = if argb {
                let colormap = xlib::XCreateColormap(dpy, root, vinfo.visual, xlib::AllocNone);
                attrs.colormap = colormap;
                attrs.border_pixel = 0;
                attrs.background_pixel = 0;
                let window = xlib::XCreateWindow(
                    dpy,
                    root,
                    0,
                    0,
                    OVERLAY_WIDTH,
                    OVERLAY_HEIGHT,
                    0,
                    vinfo.depth,
                    xlib::InputOutput as c_uint,
                    vinfo.visual,
                    xlib::CWColormap | xlib::CWBorderPixel | xlib::CWBackPixel | xlib::CWOverrideRedirect,
                    &mut attrs,
                );
                (window, Some(colormap))
            } else {
                warn!("no 32-bit ARGB visual; overlay text gets an opaque black band");
                let window = xlib::XCreateWindow(
                    dpy,
                    root,
                    0,
                    0,
                    OVERLAY_WIDTH,
                    OVERLAY_HEIGHT,
                    0,
                    xlib::CopyFromParent as c_int,
                    xlib::InputOutput as c_uint,
                    ptr::null_mut(),
                    xlib::CWOverrideRedirect,
                    &mut attrs,
                );
                (window, None)
            };

            if window == 0 {
                if let Some(colormap) = colormap {
                    xlib::XFreeColormap(dpy, colormap);
                }
                return Err(FoxError::window("XCreateWindow failed for the overlay"));
            }

            // No backing pixmap, so a compositor never shows a stale frame.
            xlib::XSetWindowBackgroundPixmap(dpy, window, 0);

            let region = xfixes::XFixesCreateRegion(dpy, ptr::null_mut(), 0);
            xfixes::XFixesSetWindowShapeRegion(dpy, window, SHAPE_INPUT, 0, 0, region);
            xfixes::XFixesDestroyRegion(dpy, region);

            let gc = xlib::XCreateGC(dpy, window, 0, ptr::null_mut());
            let font = load_font(dpy);
            if !font.is_null() {
                xlib::XSetFont(dpy, gc, (*font).fid);
            }

            let white = xlib::XWhitePixel(dpy, screen);
            let (text_pixel, clear_pixel) = match colormap {
                Some(colormap) => {
                    let mut color: xlib::XColor = std::mem::zeroed();
                    let mut exact: xlib::XColor = std::mem::zeroed();
                    let ok = xlib::XAllocNamedColor(
                        dpy,
                        colormap,
                        c"white".as_ptr(),
                        &mut color,
                        &mut exact,
                    );
                    // Allocated pixels carry no alpha on a 32-bit visual.
                    let pixel = if ok != 0 { color.pixel } else { white };
                    (pixel | 0xff00_0000, 0)
                }
                None => (white, xlib::XBlackPixel(dpy, screen)),
            };

            xlib::XSelectInput(dpy, window, xlib::ExposureMask);
            xlib::XFlush(dpy);
            info!(argb = colormap.is_some(), font = !font.is_null(), "overlay window created");

            Ok(Self {
                conn,
                window,
                gc,
                font,
                colormap,
                text_pixel,
                clear_pixel,
                size: (OVERLAY_WIDTH, OVERLAY_HEIGHT),
            })
        }
    }
}

/// The game's own font when installed, otherwise the server's `fixed`.
unsafe fn load_font(dpy: *mut xlib::Display) -> *mut xlib::XFontStruct {
    for name in [c"Renner-12", c"Renner", c"fixed"] {
        // SAFETY: caller passes an open display; names are NUL-terminated.
        let font = unsafe { xlib::XLoadQueryFont(dpy, name.as_ptr()) };
        if !font.is_null() {
            debug!(font = ?name, "overlay font loaded");
            return font;
        }
    }
    warn!("no overlay font could be loaded; using the GC default");
    ptr::null_mut()
}

impl OverlaySurface for X11Overlay {
    fn text_extent(&self, text: &str) -> Option<(u32, u32)> {
        if self.font.is_null() || text.is_empty() {
            return None;
        }
        // SAFETY: `font` is a live font struct owned by this overlay.
        unsafe {
            let width = xlib::XTextWidth(self.font, text.as_ptr() as *const c_char, text.len() as c_int);
            let font = &*self.font;
            Some((width.max(0) as u32, (font.ascent + font.descent).max(0) as u32))
        }
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn clear(&mut self, width: u32, height: u32) {
        let dpy = self.conn.raw();
        // SAFETY: window and GC belong to this display.
        unsafe {
            xlib::XSetForeground(dpy, self.gc, self.clear_pixel);
            xlib::XFillRectangle(dpy, self.window, self.gc, 0, 0, width, height);
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str) {
        let dpy = self.conn.raw();
        // SAFETY: Xlib reads exactly `len` bytes; no NUL terminator is needed.
        unsafe {
            xlib::XSetForeground(dpy, self.gc, self.text_pixel);
            xlib::XDrawString(
                dpy,
                self.window,
                self.gc,
                x,
                y,
                text.as_ptr() as *const c_char,
                text.len() as c_int,
            );
            xlib::XFlush(dpy);
        }
    }

    fn place(&mut self, rect: WindowRect) {
        debug!(?rect, "placing overlay");
        // SAFETY: window belongs to this display.
        unsafe {
            xlib::XMoveResizeWindow(self.conn.raw(), self.window, rect.x, rect.y, rect.width, rect.height);
            xlib::XFlush(self.conn.raw());
        }
        self.size = (rect.width, rect.height);
    }

    fn set_visible(&mut self, visible: bool) {
        // SAFETY: window belongs to this display.
        unsafe {
            if visible {
                xlib::XMapRaised(self.conn.raw(), self.window);
            } else {
                xlib::XUnmapWindow(self.conn.raw(), self.window);
            }
            xlib::XFlush(self.conn.raw());
        }
    }

    fn pump(&mut self) -> bool {
        let dpy = self.conn.raw();
        let mut exposed = false;
        // SAFETY: XNextEvent only runs when XPending reports a queued event.
        unsafe {
            while xlib::XPending(dpy) > 0 {
                let mut event: xlib::XEvent = std::mem::zeroed();
                xlib::XNextEvent(dpy, &mut event);
                if event.get_type() == xlib::Expose && event.expose.window == self.window {
                    exposed = true;
                }
            }
        }
        exposed
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        let dpy = self.conn.raw();
        // SAFETY: every handle was created in `create` and is released once.
        unsafe {
            if !self.font.is_null() {
                xlib::XFreeFont(dpy, self.font);
            }
            xlib::XFreeGC(dpy, self.gc);
            xlib::XDestroyWindow(dpy, self.window);
            if let Some(colormap) = self.colormap {
                xlib::XFreeColormap(dpy, colormap);
            }
            xlib::XFlush(dpy);
        }
        debug!("overlay window destroyed");
    }
}
