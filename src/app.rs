//! Startup, the dispatch loop and shutdown.
//!
//! Startup order matters: every fatal failure (no display, hotkeys taken,
//! no worker runtime) happens before the worker exists, so nothing is ever
//! pressed by a run that then aborts. The desktop is opened before the
//! worker for the same reason.

use crate::config::HotkeyBindings;
use crate::dispatcher::{DispatchOutcome, HotkeyDispatcher};
use crate::error::{FoxError, Result};
use crate::global_hotkey::{HotkeySource, HotkeyManager, HotkeyWait};
use crate::injector::{EnigoInjector, InputInjector};
use crate::overlay::{redraw_interval, status_line, OverlayRenderer};
use crate::platform::{self, Desktop};
use crate::process_finder::ProcessFinder;
use crate::state::SharedState;
use crate::window_locator::TargetWindowLocator;
use crate::worker::WorkerLoop;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Process substring used to recognise the game.
pub const DEFAULT_TARGET: &str = "foxhole";
/// Exact window title the game uses.
pub const DEFAULT_WINDOW_TITLE: &str = "War";

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub config_path: PathBuf,
    pub target: String,
    pub window_titles: Vec<String>,
    pub overlay: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(crate::config::DEFAULT_CONFIG_FILE),
            target: DEFAULT_TARGET.to_string(),
            window_titles: vec![DEFAULT_WINDOW_TITLE.to_string()],
            overlay: true,
        }
    }
}

/// Run the tool until Exit is pressed or Ctrl-C arrives.
pub fn run(options: &AppOptions) -> Result<()> {
    let bindings = match HotkeyBindings::load_or_create(&options.config_path) {
        Ok(bindings) => bindings,
        Err(e) => {
            warn!("{e}; using default bindings");
            HotkeyBindings::default()
        }
    };

    let injector: Arc<dyn InputInjector> = Arc::new(EnigoInjector::new()?);
    let hotkeys = HotkeyManager::register(&bindings)?;

    let desktop = open_desktop(options)?;
    let target = TargetWindowLocator::new(&options.target, &options.window_titles)
        .locate(desktop.windows.as_ref(), &mut ProcessFinder::new(&options.target));
    if target.is_none() && options.overlay {
        println!(
            "{}",
            "Game window not found; HUD stays at the top-left corner.".yellow()
        );
    }

    let mut session = Session::start(bindings, injector)?;
    session.exit_on_ctrl_c();

    let mut renderer = OverlayRenderer::new(
        Arc::clone(session.state()),
        bindings,
        desktop.surface,
        desktop.windows,
        target.as_ref(),
    );

    print_banner(session.state(), &bindings);
    session.run(&hotkeys, &mut renderer);
    session.finish();

    drop(hotkeys);
    drop(renderer);
    Ok(())
}

/// No display at all is fatal; a display without a usable overlay is not.
fn open_desktop(options: &AppOptions) -> Result<Desktop> {
    if !options.overlay {
        return Ok(Desktop::headless());
    }
    match platform::open_desktop() {
        Ok(desktop) => Ok(desktop),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            warn!("overlay unavailable, continuing without it: {e}");
            Ok(Desktop::headless())
        }
    }
}

fn print_banner(state: &SharedState, bindings: &HotkeyBindings) {
    println!("{}", "foxtool autoclicker".bold());
    println!("{}", status_line(state, bindings));
    println!("{}", "(F11: hide/show overlay)".dimmed());
}

/// The running worker plus everything the dispatch loop needs.
pub struct Session {
    state: Arc<SharedState>,
    dispatcher: HotkeyDispatcher<dyn InputInjector>,
    runtime: Runtime,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Build the worker runtime and start the worker.
    pub fn start(bindings: HotkeyBindings, injector: Arc<dyn InputInjector>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("foxtool-worker")
            .enable_time()
            .enable_io()
            .build()
            .map_err(|e| FoxError::worker_spawn(e.to_string()))?;

        let state = Arc::new(SharedState::new());
        let worker = WorkerLoop::new(Arc::clone(&state), Arc::clone(&injector));
        let handle = runtime.spawn(worker.run());

        Ok(Self {
            dispatcher: HotkeyDispatcher::new(Arc::clone(&state), bindings, injector),
            state,
            runtime,
            worker: Some(handle),
        })
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    /// Route Ctrl-C through the same path as the Exit hotkey.
    pub fn exit_on_ctrl_c(&self) {
        let state = Arc::clone(&self.state);
        self.runtime.spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("interrupted");
                    state.request_exit();
                }
                Err(e) => warn!("cannot listen for Ctrl-C: {e}"),
            }
        });
    }

    /// Dispatch hotkeys and redraw the HUD until `running` goes false.
    pub fn run<S: HotkeySource + ?Sized>(&mut self, source: &S, renderer: &mut OverlayRenderer) {
        while self.state.flags.is_running() {
            platform::pump_messages();
            renderer.pump();

            match source.wait(redraw_interval(&self.state)) {
                HotkeyWait::Key(key) => {
                    let outcome = self.dispatcher.handle_key(key);
                    report(&outcome);
                    if outcome.needs_repaint() {
                        renderer.redraw();
                    }
                }
                HotkeyWait::Timeout => renderer.redraw(),
                HotkeyWait::Ignored => {}
                HotkeyWait::Closed => {
                    warn!("hotkey source closed; exiting");
                    self.state.request_exit();
                }
            }
        }
        debug!("dispatch loop finished");
    }

    /// Stop the worker, wait for it to release everything, and tear down the runtime.
    pub fn finish(mut self) {
        self.state.request_exit();
        if let Some(handle) = self.worker.take() {
            if let Err(e) = self.runtime.block_on(handle) {
                warn!("worker task ended abnormally: {e}");
            }
        }
        self.runtime.shutdown_timeout(Duration::from_millis(100));
        info!("worker joined");
    }
}

fn on_off(enabled: bool) -> colored::ColoredString {
    if enabled {
        "ON".green()
    } else {
        "OFF".red()
    }
}

fn report(outcome: &DispatchOutcome) {
    match *outcome {
        DispatchOutcome::Toggled {
            action,
            enabled,
            captured,
        } => {
            if let Some(point) = captured {
                println!("Saved cursor position: {point}");
            }
            println!("{action}: {}", on_off(enabled));
        }
        DispatchOutcome::SuspendToggled(suspended) => {
            let text = if suspended { "YES".yellow() } else { "NO".green() };
            println!("Suspended: {text}");
        }
        DispatchOutcome::OverlayToggled { hidden } => {
            println!("Overlay: {}", if hidden { "hidden" } else { "shown" });
        }
        DispatchOutcome::Exit | DispatchOutcome::Ignored => {}
    }
}
