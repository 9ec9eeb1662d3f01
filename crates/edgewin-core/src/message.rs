//! Decoded window messages and the dispatcher's verdicts.

use crate::handle::{Point, Size};

/// OS hit-test regions, carrying the Win32 `HT*` codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HitRegion {
    Nowhere,
    Client,
    Caption,
    Left,
    Right,
    Top,
    TopLeft,
    TopRight,
    Bottom,
    BottomLeft,
    BottomRight,
}

impl HitRegion {
    pub fn code(self) -> i32 {
        match self {
            Self::Nowhere => 0,
            Self::Client => 1,
            Self::Caption => 2,
            Self::Left => 10,
            Self::Right => 11,
            Self::Top => 12,
            Self::TopLeft => 13,
            Self::TopRight => 14,
            Self::Bottom => 15,
            Self::BottomLeft => 16,
            Self::BottomRight => 17,
        }
    }

    /// Decode a hit-test code; anything unrecognised is `Nowhere`.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Client,
            2 => Self::Caption,
            10 => Self::Left,
            11 => Self::Right,
            12 => Self::Top,
            13 => Self::TopLeft,
            14 => Self::TopRight,
            15 => Self::Bottom,
            16 => Self::BottomLeft,
            17 => Self::BottomRight,
            _ => Self::Nowhere,
        }
    }
}

/// A window message after the native layer has unpacked its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMessage {
    Move,
    Moving,
    /// Left button pressed in the non-client area.
    NcLeftButtonDown { hit: HitRegion },
    Size,
    Activate { active: bool },
    Close,
    Destroy,
    GetMinMaxInfo,
    /// Which region is under the cursor (screen coordinates).
    NcHitTest { cursor: Point },
    /// The custom wake message for the dispatch queue.
    App,
    HotKey { id: i32 },
    /// Anything the dispatcher does not interpret; carries the raw id.
    Other(u32),
}

/// Stored min/max tracking sizes. Unset axes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizeConstraints {
    pub min: Size,
    pub max: Size,
}

impl SizeConstraints {
    pub fn is_empty(&self) -> bool {
        !self.min.is_set() && !self.max.is_set()
    }
}

/// How the native window procedure should answer a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Hand the message to the OS default procedure.
    Forward,
    /// The message was consumed; answer zero.
    Handled,
    /// Answer a hit-test query with this region.
    HitTest(HitRegion),
    /// Write these constraints into the min/max info and answer zero.
    ApplyMinMax(SizeConstraints),
}
