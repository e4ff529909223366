//! Custom error types for foxtool.
//!
//! Startup failures are fatal and end the process with exit code 1. Everything
//! that can go wrong after the worker is running (window discovery, fonts,
//! individual injector calls) is logged and absorbed instead.

use thiserror::Error;

/// Main error type for foxtool operations.
#[derive(Error, Debug)]
pub enum FoxError {
    /// No display or desktop session to talk to.
    #[error("display unavailable: {0}")]
    DisplayUnavailable(String),

    /// Registering a global hotkey failed, usually because another
    /// application already owns it.
    #[error("hotkey error: {0}")]
    Hotkey(String),

    /// The background worker could not be started.
    #[error("failed to start worker: {0}")]
    WorkerSpawn(String),

    /// Error reading the hotkey binding file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing the hotkey binding file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// A synthetic input call was rejected by the platform.
    #[error("input injection failed: {0}")]
    Injection(String),

    /// Querying or manipulating a native window failed.
    #[error("window error: {0}")]
    Window(String),

    /// No backend exists for the running OS.
    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),
}

/// Result type alias for foxtool operations.
pub type Result<T> = std::result::Result<T, FoxError>;

impl FoxError {
    pub fn display_unavailable(message: impl Into<String>) -> Self {
        Self::DisplayUnavailable(message.into())
    }

    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    pub fn worker_spawn(message: impl Into<String>) -> Self {
        Self::WorkerSpawn(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn injection(message: impl Into<String>) -> Self {
        Self::Injection(message.into())
    }

    pub fn window(message: impl Into<String>) -> Self {
        Self::Window(message.into())
    }

    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }

    /// Whether this error aborts startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DisplayUnavailable(_) | Self::Hotkey(_) | Self::WorkerSpawn(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FoxError::hotkey("F9 is already registered");
        assert_eq!(err.to_string(), "hotkey error: F9 is already registered");

        let err = FoxError::config_load("foxtool_hotkeys.cfg", "permission denied");
        assert_eq!(
            err.to_string(),
            "failed to load config from 'foxtool_hotkeys.cfg': permission denied"
        );

        let err = FoxError::display_unavailable("DISPLAY is not set");
        assert_eq!(err.to_string(), "display unavailable: DISPLAY is not set");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(FoxError::display_unavailable("x").is_fatal());
        assert!(FoxError::hotkey("x").is_fatal());
        assert!(FoxError::worker_spawn("x").is_fatal());
        assert!(!FoxError::window("x").is_fatal());
        assert!(!FoxError::config_save("a", "b").is_fatal());
    }
}
