//! The boundary to the native browser engine.
//!
//! A [`BrowserEngine`] wraps one engine instance for one window. It keeps
//! whatever native handles the handshake produces and reports asynchronous
//! completions through the callbacks it is given. Completions and events are
//! delivered on the thread running the window's message loop.

use std::fmt;
use std::path::Path;

use crate::handle::{Rect, WindowHandle};
use crate::permission::{PermissionKind, PermissionState};

/// Native status code (HRESULT) plus a description.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({code:#010x})")]
pub struct EngineError {
    pub code: i32,
    pub message: String,
}

impl EngineError {
    /// `HRESULT_FROM_WIN32(ERROR_TIMEOUT)`.
    pub const TIMEOUT: i32 = 0x8007_05B4_u32 as i32;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Callback for one asynchronous engine operation.
pub type Completion = Box<dyn FnOnce(Result<(), EngineError>)>;

/// Settings applied to the engine once it is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    pub dev_tools: bool,
    pub context_menus: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            dev_tools: false,
            context_menus: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    KeyDown,
    KeyUp,
    SystemKeyDown,
    SystemKeyUp,
}

/// A key event offered to the host before the engine handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceleratorKey {
    pub kind: KeyEventKind,
    pub virtual_key: u32,
    /// The key was already down, i.e. this is an auto-repeat.
    pub was_key_down: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRequest {
    pub uri: String,
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResult {
    pub success: bool,
    /// Source URL after the navigation.
    pub url: String,
    pub title: String,
}

impl fmt::Display for NavigationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.success { "ok" } else { "failed" };
        write!(f, "{} ({})", self.url, status)
    }
}

/// Event sinks registered once the controller exists.
pub struct EngineEvents {
    /// Page script posted a string message.
    pub message: Box<dyn Fn(&str)>,
    pub permission: Box<dyn Fn(PermissionKind) -> PermissionState>,
    pub resource: Box<dyn Fn(&ResourceRequest)>,
    /// Returns whether the host handled the key.
    pub accelerator: Box<dyn Fn(&AcceleratorKey) -> bool>,
    pub navigation_starting: Box<dyn Fn(&str)>,
    pub navigation_completed: Box<dyn Fn(&NavigationResult)>,
}

/// One native engine instance. UI thread only.
pub trait BrowserEngine {
    /// Start creating the engine environment.
    ///
    /// An `Err` means creation could not even start; otherwise `done` runs
    /// later with the outcome.
    fn create_environment(&self, data_dir: &Path, done: Completion) -> Result<(), EngineError>;

    /// Start creating the controller hosted in `window`. Requires a created
    /// environment.
    fn create_controller(&self, window: WindowHandle, done: Completion) -> Result<(), EngineError>;

    fn subscribe(&self, events: EngineEvents) -> Result<(), EngineError>;

    fn navigate(&self, url: &str) -> Result<(), EngineError>;

    fn navigate_to_string(&self, html: &str) -> Result<(), EngineError>;

    /// Add a script run on every future document creation.
    fn add_init_script(&self, script: &str) -> Result<(), EngineError>;

    /// Run a script once in the current document.
    fn execute_script(&self, script: &str) -> Result<(), EngineError>;

    fn set_bounds(&self, bounds: Rect) -> Result<(), EngineError>;

    fn notify_parent_moved(&self) -> Result<(), EngineError>;

    fn move_focus(&self) -> Result<(), EngineError>;

    fn apply_settings(&self, settings: &EngineSettings) -> Result<(), EngineError>;

    fn open_devtools(&self) -> Result<(), EngineError>;

    /// Route requests matching `pattern` to the resource event.
    fn add_resource_filter(&self, pattern: &str) -> Result<(), EngineError>;

    fn print_to_pdf(&self, path: &Path, done: Completion) -> Result<(), EngineError>;

    /// Release the controller and environment.
    fn close(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_code() {
        let err = EngineError::new(EngineError::TIMEOUT, "timed out");
        assert_eq!(err.to_string(), "timed out (0x800705b4)");
    }
}
