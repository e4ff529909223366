//! Process identity lookups.
//!
//! The window locator only knows PIDs. This module answers whether a PID
//! belongs to the target game by checking its executable path and command
//! line for a case-insensitive substring.

use std::collections::HashMap;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind};
use tracing::debug;

/// Decides whether a process is the one we are looking for.
pub trait ProcessMatcher {
    fn matches(&mut self, pid: u32) -> bool;
}

/// Resolves PIDs through `sysinfo`, caching each answer.
///
/// # Example
///
/// ```no_run
/// use foxtool::process_finder::{ProcessFinder, ProcessMatcher};
///
/// let mut finder = ProcessFinder::new("foxhole");
/// if finder.matches(std::process::id()) {
///     println!("we are the game?");
/// }
/// ```
pub struct ProcessFinder {
    system: System,
    needle: String,
    cache: HashMap<u32, bool>,
}

impl ProcessFinder {
    pub fn new(needle: &str) -> Self {
        Self {
            system: System::new(),
            needle: needle.to_lowercase(),
            cache: HashMap::new(),
        }
    }

    /// Executable path and joined command line of `pid`, if it still exists.
    pub fn describe(&mut self, pid: u32) -> Option<(String, String)> {
        let pid = Pid::from_u32(pid);
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_exe(UpdateKind::OnlyIfNotSet)
                .with_cmd(UpdateKind::OnlyIfNotSet),
        );

        let process = self.system.process(pid)?;
        let exe = process
            .exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        let cmd = process
            .cmd()
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        Some((exe, cmd))
    }
}

impl ProcessMatcher for ProcessFinder {
    fn matches(&mut self, pid: u32) -> bool {
        if let Some(hit) = self.cache.get(&pid) {
            return *hit;
        }
        let hit = match self.describe(pid) {
            Some((exe, cmd)) => contains_ignore_case(&exe, &self.needle)
                || contains_ignore_case(&cmd, &self.needle),
            None => false,
        };
        debug!(pid, hit, "process checked");
        self.cache.insert(pid, hit);
        hit
    }
}

/// `needle` must already be lowercase.
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(needle)
}
