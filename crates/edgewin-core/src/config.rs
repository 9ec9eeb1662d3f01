//! Window and engine options, loadable from TOML.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::handle::Size;
use crate::native::WindowStyle;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Size used when a configured dimension is zero.
pub const FALLBACK_SIZE: Size = Size {
    width: 640,
    height: 480,
};

/// Appearance and behaviour of the top-level window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowOptions {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Center on the primary screen at creation.
    pub center: bool,
    /// No caption or frame; the page is dragged and resized through
    /// custom hit-testing.
    pub frameless: bool,
    pub fullscreen: bool,
    pub always_on_top: bool,
    pub resizable: bool,
    pub minimizable: bool,
    pub maximizable: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub disable_context_menu: bool,
    /// Hide the window instead of destroying it when the user closes it.
    pub hide_on_close: bool,
    /// CSS color painted behind the page until it draws.
    pub default_background: Option<String>,
    /// Initial opacity in `0.0..=1.0`.
    pub opacity: f64,
    pub icon_path: Option<PathBuf>,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            title: "WebView2".to_string(),
            width: 800,
            height: 600,
            center: true,
            frameless: false,
            fullscreen: false,
            always_on_top: false,
            resizable: true,
            minimizable: true,
            maximizable: true,
            minimized: false,
            maximized: false,
            disable_context_menu: false,
            hide_on_close: false,
            default_background: None,
            opacity: 1.0,
            icon_path: None,
        }
    }
}

impl WindowOptions {
    /// Initial outer size, substituting the fallback for zero dimensions.
    pub fn initial_size(&self) -> Size {
        let clamp = |v: u32, fallback: i32| match v {
            0 => fallback,
            v => i32::try_from(v).unwrap_or(i32::MAX),
        };
        Size::new(
            clamp(self.width, FALLBACK_SIZE.width),
            clamp(self.height, FALLBACK_SIZE.height),
        )
    }

    /// Style bits for the window at creation.
    pub fn style(&self) -> WindowStyle {
        if self.frameless {
            return WindowStyle::POPUP | WindowStyle::VISIBLE;
        }
        let mut style = WindowStyle::OVERLAPPED_WINDOW;
        if !self.maximizable {
            style.remove(WindowStyle::MAXIMIZE_BOX);
        }
        if !self.minimizable {
            style.remove(WindowStyle::MINIMIZE_BOX);
        }
        if !self.resizable {
            style.remove(WindowStyle::THICK_FRAME);
        }
        style
    }
}

/// Everything needed to open a window with an embedded engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebViewOptions {
    /// Enable developer tools and the default context menu.
    pub debug: bool,
    /// Engine user-data directory; see [`default_data_dir`].
    pub data_path: Option<PathBuf>,
    /// Focus the page whenever the window is activated.
    pub auto_focus: bool,
    /// Engine initialization deadline in milliseconds; `0` waits forever.
    pub init_timeout_ms: u64,
    pub window: WindowOptions,
}

impl Default for WebViewOptions {
    fn default() -> Self {
        Self {
            debug: false,
            data_path: None,
            auto_focus: false,
            init_timeout_ms: 30_000,
            window: WindowOptions::default(),
        }
    }
}

impl WebViewOptions {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn init_timeout(&self) -> Option<Duration> {
        match self.init_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Configured data directory, or the per-executable default.
    pub fn data_dir(&self) -> PathBuf {
        self.data_path.clone().unwrap_or_else(default_data_dir)
    }
}

/// `<app data>/<executable name>`, e.g. `%AppData%\myapp.exe` on Windows.
pub fn default_data_dir() -> PathBuf {
    let exe_name = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_os_string()));
    let root = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
    match exe_name {
        Some(name) => root.join(name),
        None => root,
    }
}
