//! Best-effort discovery of the game window.
//!
//! The locator walks the window hierarchy depth-first with an explicit stack,
//! asking a [`ProcessMatcher`] about each window's owning process. A window
//! whose title matches one of the configured fallback titles also counts.
//! Nothing found is a normal outcome; the overlay then sits at the screen
//! origin.

use crate::process_finder::{contains_ignore_case, ProcessMatcher};
use std::collections::HashSet;
use tracing::{debug, info};

/// Opaque handle of a window. Never owned, may be stale at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

/// Absolute screen rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Read-only view of a window system.
pub trait WindowSystem {
    /// Top-level roots of the hierarchy (X11 screens' root windows, the
    /// desktop's top-level windows, ...).
    fn roots(&self) -> Vec<WindowId>;
    fn children(&self, window: WindowId) -> Vec<WindowId>;
    fn owning_pid(&self, window: WindowId) -> Option<u32>;
    fn title(&self, window: WindowId) -> Option<String>;
    fn geometry(&self, window: WindowId) -> Option<WindowRect>;
}

/// A window system with no windows.
#[derive(Debug, Default)]
pub struct NullWindowSystem;

impl WindowSystem for NullWindowSystem {
    fn roots(&self) -> Vec<WindowId> {
        Vec::new()
    }

    fn children(&self, _window: WindowId) -> Vec<WindowId> {
        Vec::new()
    }

    fn owning_pid(&self, _window: WindowId) -> Option<u32> {
        None
    }

    fn title(&self, _window: WindowId) -> Option<String> {
        None
    }

    fn geometry(&self, _window: WindowId) -> Option<WindowRect> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetWindow {
    pub id: WindowId,
    pub rect: WindowRect,
    pub reason: MatchReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchReason {
    Process(u32),
    Title(String),
}

pub struct TargetWindowLocator {
    needle: String,
    exact_titles: Vec<String>,
}

impl TargetWindowLocator {
    pub fn new(needle: &str, exact_titles: &[String]) -> Self {
        Self {
            needle: needle.to_lowercase(),
            exact_titles: exact_titles.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// First matching window in depth-first order, if any.
    pub fn locate(
        &self,
        windows: &dyn WindowSystem,
        processes: &mut dyn ProcessMatcher,
    ) -> Option<TargetWindow> {
        let mut stack: Vec<WindowId> = windows.roots();
        stack.reverse();
        let mut seen: HashSet<WindowId> = HashSet::new();
        let mut checked_pids: HashSet<u32> = HashSet::new();

        while let Some(window) = stack.pop() {
            if !seen.insert(window) {
                continue;
            }

            if let Some(reason) = self.check(windows, processes, &mut checked_pids, window) {
                // A window that vanished between the check and here is skipped.
                if let Some(rect) = windows.geometry(window) {
                    info!(window = window.0, ?reason, ?rect, "target window found");
                    return Some(TargetWindow {
                        id: window,
                        rect,
                        reason,
                    });
                }
                debug!(window = window.0, "matching window has no geometry");
            }

            let mut children = windows.children(window);
            children.reverse();
            stack.extend(children);
        }

        info!(visited = seen.len(), "target window not found");
        None
    }

    fn check(
        &self,
        windows: &dyn WindowSystem,
        processes: &mut dyn ProcessMatcher,
        checked_pids: &mut HashSet<u32>,
        window: WindowId,
    ) -> Option<MatchReason> {
        if let Some(pid) = windows.owning_pid(window) {
            // A PID seen before was a miss; a hit would have ended the search.
            if checked_pids.insert(pid) && processes.matches(pid) {
                return Some(MatchReason::Process(pid));
            }
        }

        let title = windows.title(window)?;
        if self.title_matches(&title) {
            return Some(MatchReason::Title(title));
        }
        None
    }

    fn title_matches(&self, title: &str) -> bool {
        let lower = title.to_lowercase();
        self.exact_titles.iter().any(|t| *t == lower) || contains_ignore_case(title, &self.needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeWindows {
        roots: Vec<u64>,
        children: HashMap<u64, Vec<u64>>,
        pids: HashMap<u64, u32>,
        titles: HashMap<u64, String>,
        rects: HashMap<u64, WindowRect>,
    }

    impl FakeWindows {
        fn window(&mut self, parent: Option<u64>, id: u64, pid: Option<u32>, title: &str) {
            match parent {
                Some(p) => self.children.entry(p).or_default().push(id),
                None => self.roots.push(id),
            }
            if let Some(pid) = pid {
                self.pids.insert(id, pid);
            }
            if !title.is_empty() {
                self.titles.insert(id, title.to_string());
            }
            self.rects.insert(
                id,
                WindowRect {
                    x: id as i32 * 10,
                    y: 0,
                    width: 640,
                    height: 480,
                },
            );
        }
    }

    impl WindowSystem for FakeWindows {
        fn roots(&self) -> Vec<WindowId> {
            self.roots.iter().map(|w| WindowId(*w)).collect()
        }

        fn children(&self, window: WindowId) -> Vec<WindowId> {
            self.children
                .get(&window.0)
                .map(|c| c.iter().map(|w| WindowId(*w)).collect())
                .unwrap_or_default()
        }

        fn owning_pid(&self, window: WindowId) -> Option<u32> {
            self.pids.get(&window.0).copied()
        }

        fn title(&self, window: WindowId) -> Option<String> {
            self.titles.get(&window.0).cloned()
        }

        fn geometry(&self, window: WindowId) -> Option<WindowRect> {
            self.rects.get(&window.0).copied()
        }
    }

    struct FakeProcesses {
        game_pid: u32,
        lookups: Vec<u32>,
    }

    impl ProcessMatcher for FakeProcesses {
        fn matches(&mut self, pid: u32) -> bool {
            self.lookups.push(pid);
            pid == self.game_pid
        }
    }

    fn processes(game_pid: u32) -> FakeProcesses {
        FakeProcesses {
            game_pid,
            lookups: Vec::new(),
        }
    }

    fn locator() -> TargetWindowLocator {
        TargetWindowLocator::new("foxhole", &["War".to_string()])
    }

    #[test]
    fn test_finds_deep_window_by_process() {
        let mut tree = FakeWindows::default();
        tree.window(None, 1, None, "");
        tree.window(Some(1), 2, Some(100), "terminal");
        tree.window(Some(2), 3, Some(100), "");
        tree.window(Some(1), 4, None, "");
        tree.window(Some(4), 5, None, "");
        tree.window(Some(5), 6, Some(42), "Unreal");

        let mut procs = processes(42);
        let found = locator().locate(&tree, &mut procs).unwrap();
        assert_eq!(found.id, WindowId(6));
        assert_eq!(found.rect.x, 60);
        assert_eq!(found.reason, MatchReason::Process(42));
        // pid 100 is only resolved once.
        assert_eq!(procs.lookups, vec![100, 42]);
    }

    #[test]
    fn test_depth_first_order() {
        let mut tree = FakeWindows::default();
        tree.window(None, 1, None, "");
        tree.window(Some(1), 2, None, "");
        tree.window(Some(2), 3, Some(7), "");
        tree.window(Some(1), 4, Some(7), "");

        let found = locator().locate(&tree, &mut processes(7)).unwrap();
        assert_eq!(found.id, WindowId(3));
    }

    #[test]
    fn test_title_fallback() {
        let mut tree = FakeWindows::default();
        tree.window(None, 1, None, "");
        tree.window(Some(1), 2, Some(5), "Firefox");
        tree.window(Some(1), 3, None, "war");

        let found = locator().locate(&tree, &mut processes(0)).unwrap();
        assert_eq!(found.id, WindowId(3));
        assert_eq!(found.reason, MatchReason::Title("war".to_string()));

        let mut tree = FakeWindows::default();
        tree.window(None, 9, None, "Foxhole launcher");
        let found = locator().locate(&tree, &mut processes(0)).unwrap();
        assert_eq!(found.id, WindowId(9));
    }

    #[test]
    fn test_no_match_and_empty_tree() {
        let mut tree = FakeWindows::default();
        tree.window(None, 1, Some(3), "Warcraft");
        assert_eq!(locator().locate(&tree, &mut processes(0)), None);
        assert_eq!(locator().locate(&NullWindowSystem, &mut processes(0)), None);
    }

    #[test]
    fn test_cycles_terminate() {
        let mut tree = FakeWindows::default();
        tree.window(None, 1, None, "");
        tree.window(Some(1), 2, None, "");
        tree.children.entry(2).or_default().push(1);
        assert_eq!(locator().locate(&tree, &mut processes(0)), None);
    }
}
