//! Window event dispatcher.
//!
//! The native window procedure decodes each OS message into a
//! [`WindowMessage`] and hands it here together with the window handle. The
//! dispatcher resolves the owning window through the registry and returns an
//! [`Outcome`] telling the native layer how to answer the OS.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::trace;

use crate::handle::{Point, Rect, WindowHandle};
use crate::message::{HitRegion, Outcome, SizeConstraints, WindowMessage};
use crate::registry::WindowRegistry;

/// Width in pixels of the resize band around a custom hit-tested window.
pub const BORDER_WIDTH: i32 = 5;

/// Window-side reactions to OS messages.
///
/// Every method has a no-op default so owners only implement what they use.
/// All calls arrive on the thread running the window's message loop.
pub trait WindowOwner: Send + Sync {
    /// The window moved; the browser overlay should follow.
    fn on_move(&self) {}

    /// The client area changed size.
    fn on_size(&self) {}

    fn on_activate(&self) {}

    /// The user asked to close the window.
    fn on_close(&self) {}

    /// The window is being destroyed.
    fn on_destroy(&self) {}

    /// Left button pressed on the frame outside the caption.
    fn on_frame_button_down(&self, _hit: HitRegion) {}

    fn size_constraints(&self) -> SizeConstraints {
        SizeConstraints::default()
    }

    /// Window bounds to hit-test against, or `None` to let the OS decide.
    fn hit_test_frame(&self) -> Option<Rect> {
        None
    }

    /// The dispatch queue was signalled.
    fn on_wake(&self) {}

    /// A registered hotkey fired. Returns whether the id was known.
    fn on_hotkey(&self, _id: i32) -> bool {
        false
    }
}

/// Classify a cursor position against a window's bounds.
///
/// Points within `border` pixels of an edge resize, corners take priority
/// over edges, and everything else acts as the caption so the window body
/// can be dragged.
pub fn hit_test(frame: Rect, cursor: Point, border: i32) -> HitRegion {
    let Point { x, y } = cursor;
    let near_left = x >= frame.left && x <= frame.left + border;
    let near_right = x >= frame.right - border && x <= frame.right;

    if y >= frame.top && y <= frame.top + border {
        if near_left {
            return HitRegion::TopLeft;
        }
        if near_right {
            return HitRegion::TopRight;
        }
        return HitRegion::Top;
    }
    if y >= frame.bottom - border && y <= frame.bottom {
        if near_left {
            return HitRegion::BottomLeft;
        }
        if near_right {
            return HitRegion::BottomRight;
        }
        return HitRegion::Bottom;
    }
    if near_left {
        return HitRegion::Left;
    }
    if near_right {
        return HitRegion::Right;
    }
    HitRegion::Caption
}

static GLOBAL: Lazy<WindowEventDispatcher> =
    Lazy::new(|| WindowEventDispatcher::new(WindowRegistry::global()));

/// Routes decoded window messages to their owning windows.
pub struct WindowEventDispatcher {
    registry: Arc<WindowRegistry>,
}

impl WindowEventDispatcher {
    pub fn new(registry: Arc<WindowRegistry>) -> Self {
        Self { registry }
    }

    /// The dispatcher bound to the process-wide registry, used by the
    /// native window procedure.
    pub fn global() -> &'static WindowEventDispatcher {
        &GLOBAL
    }

    pub fn registry(&self) -> &Arc<WindowRegistry> {
        &self.registry
    }

    pub fn dispatch(&self, handle: WindowHandle, message: WindowMessage) -> Outcome {
        let Some(owner) = self.registry.lookup(handle) else {
            return Outcome::Forward;
        };
        trace!("{} <- {:?}", handle, message);

        match message {
            WindowMessage::Move | WindowMessage::Moving => {
                owner.on_move();
                Outcome::Handled
            }
            WindowMessage::NcLeftButtonDown { hit } => {
                if hit != HitRegion::Caption {
                    owner.on_frame_button_down(hit);
                }
                // Default handling starts the native drag or resize loop.
                Outcome::Forward
            }
            WindowMessage::Size => {
                owner.on_size();
                Outcome::Handled
            }
            WindowMessage::Activate { active } => {
                if active {
                    owner.on_activate();
                }
                Outcome::Handled
            }
            WindowMessage::Close => {
                owner.on_close();
                Outcome::Handled
            }
            WindowMessage::Destroy => {
                owner.on_destroy();
                Outcome::Handled
            }
            WindowMessage::GetMinMaxInfo => Outcome::ApplyMinMax(owner.size_constraints()),
            WindowMessage::NcHitTest { cursor } => match owner.hit_test_frame() {
                Some(frame) => Outcome::HitTest(hit_test(frame, cursor, BORDER_WIDTH)),
                None => Outcome::Forward,
            },
            WindowMessage::App => {
                owner.on_wake();
                Outcome::Handled
            }
            WindowMessage::HotKey { id } => {
                if !owner.on_hotkey(id) {
                    trace!("No handler for hotkey {}", id);
                }
                Outcome::Handled
            }
            WindowMessage::Other(_) => Outcome::Forward,
        }
    }
}
