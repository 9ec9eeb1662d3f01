//! Handle and geometry types passed between the native layer and window logic.

use std::fmt;

/// Opaque OS identifier for a top-level window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    /// Create a handle from a raw OS value.
    pub fn new(raw: isize) -> Self {
        Self(raw)
    }

    /// Get the raw OS value.
    pub fn raw(self) -> isize {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Window({:#x})", self.0)
    }
}

/// A point in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A width/height pair in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// A size constraint counts as set only when both axes are positive.
    pub fn is_set(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// An edge-inclusive rectangle, as the OS reports window bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Build a rectangle from its origin and size.
    pub fn from_origin_size(origin: Point, size: Size) -> Self {
        Self {
            left: origin.x,
            top: origin.y,
            right: origin.x + size.width,
            bottom: origin.y + size.height,
        }
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    /// Origin that centers a rectangle of this size on a screen.
    pub fn centered_on(&self, screen: Size) -> Point {
        Point::new(
            (screen.width - self.width()) / 2,
            (screen.height - self.height()) / 2,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_geometry() {
        let rect = Rect::from_origin_size(Point::new(10, 20), Size::new(300, 200));
        assert_eq!(rect.right, 310);
        assert_eq!(rect.bottom, 220);
        assert_eq!(rect.size(), Size::new(300, 200));
        assert_eq!(rect.origin(), Point::new(10, 20));
    }

    #[test]
    fn test_centered_on_screen() {
        let rect = Rect::from_origin_size(Point::new(0, 0), Size::new(800, 600));
        assert_eq!(rect.centered_on(Size::new(1920, 1080)), Point::new(560, 240));
    }

    #[test]
    fn test_size_constraint_requires_both_axes() {
        assert!(Size::new(100, 100).is_set());
        assert!(!Size::new(100, 0).is_set());
        assert!(!Size::default().is_set());
    }
}
