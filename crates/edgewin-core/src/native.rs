//! Native handle layer.
//!
//! Thin typed operations over the OS window manager. Implementations do no
//! logic beyond marshaling parameters; every decision lives in the window
//! facade and the event dispatcher.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::WindowOptions;
use crate::engine::BrowserEngine;
use crate::error::Result;
use crate::handle::{Point, Rect, Size, WindowHandle};
use crate::hotkey::{HotKey, HotKeyError};

bitflags::bitflags! {
    /// Window style bits, using the Win32 `WS_*` values.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowStyle: u32 {
        const MAXIMIZE_BOX = 0x0001_0000;
        const MINIMIZE_BOX = 0x0002_0000;
        const THICK_FRAME = 0x0004_0000;
        const SYS_MENU = 0x0008_0000;
        const CAPTION = 0x00C0_0000;
        const VISIBLE = 0x1000_0000;
        const POPUP = 0x8000_0000;
        const OVERLAPPED_WINDOW = Self::CAPTION.bits()
            | Self::SYS_MENU.bits()
            | Self::THICK_FRAME.bits()
            | Self::MINIMIZE_BOX.bits()
            | Self::MAXIMIZE_BOX.bits();
    }
}

impl fmt::Display for WindowStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.bits())
    }
}

/// Show-state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Show,
    Hide,
    Minimize,
    Maximize,
    Restore,
}

/// Z-order change requested alongside a placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZOrder {
    #[default]
    Unchanged,
    Top,
    TopMost,
    NoTopMost,
}

/// A combined move/resize/reorder request. `None` fields are left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Placement {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub z_order: ZOrder,
    /// Ask the OS to recompute the non-client frame after a style change.
    pub frame_changed: bool,
}

impl Placement {
    pub fn move_to(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn resize(size: Size) -> Self {
        Self {
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn bounds(rect: Rect) -> Self {
        Self {
            position: Some(rect.origin()),
            size: Some(rect.size()),
            ..Self::default()
        }
    }

    pub fn reorder(z_order: ZOrder) -> Self {
        Self {
            z_order,
            ..Self::default()
        }
    }

    pub fn with_z_order(mut self, z_order: ZOrder) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_frame_changed(mut self) -> Self {
        self.frame_changed = true;
        self
    }
}

/// Operations on one native top-level window. UI thread only.
pub trait NativeWindow {
    fn handle(&self) -> WindowHandle;

    fn show(&self, command: ShowCommand);

    /// Give the window keyboard focus.
    fn focus(&self);

    fn set_title(&self, title: &str);

    /// Outer bounds in screen coordinates.
    fn window_rect(&self) -> Rect;

    /// Client area in client coordinates.
    fn client_rect(&self) -> Rect;

    /// Size of the primary screen.
    fn screen_size(&self) -> Size;

    fn style(&self) -> WindowStyle;

    fn set_style(&self, style: WindowStyle);

    /// Outer window size needed for a client area of `client`.
    fn frame_size_for_client(&self, client: Size) -> Size;

    fn set_placement(&self, placement: Placement);

    /// Mark the window layered and apply a constant alpha.
    fn set_layered_alpha(&self, alpha: u8);

    /// Register a system-wide hotkey under `id`.
    fn register_hotkey(&self, id: i32, hotkey: HotKey) -> Result<(), HotKeyError>;

    fn unregister_hotkey(&self, id: i32);

    fn destroy(&self);
}

/// Cross-thread signals into the UI thread's message loop.
pub trait Waker: Send + Sync {
    /// Post the custom wake message that drains the dispatch queue.
    fn wake(&self);

    /// Post a quit message, ending `run`.
    fn quit(&self);
}

/// What one pump iteration observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    /// The custom wake message arrived.
    Wake,
    /// Some other message was translated and dispatched.
    Dispatched,
    /// The wait elapsed with nothing to do.
    Idle,
    /// The loop received its quit message.
    Quit,
}

/// The UI thread's message source.
pub trait MessagePump {
    /// Retrieve and dispatch one message, waiting at most `wait`
    /// (`None` blocks indefinitely).
    fn pump(&self, wait: Option<Duration>) -> PumpStatus;
}

/// Everything a platform hands back when it creates a window.
pub struct NativeParts {
    pub window: Box<dyn NativeWindow>,
    pub pump: Box<dyn MessagePump>,
    pub waker: Arc<dyn Waker>,
    pub engine: Rc<dyn BrowserEngine>,
}

/// A windowing backend able to create top-level windows with an engine.
pub trait Platform {
    fn create_window(&self, options: &WindowOptions) -> Result<NativeParts>;
}
