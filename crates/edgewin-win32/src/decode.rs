//! Unpacking of raw window message parameters.

use edgewin_core::{HitRegion, Point, WindowMessage};

pub const WM_MOVE: u32 = 0x0003;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_GETMINMAXINFO: u32 = 0x0024;
pub const WM_NCHITTEST: u32 = 0x0084;
pub const WM_NCLBUTTONDOWN: u32 = 0x00A1;
pub const WM_MOVING: u32 = 0x0216;
pub const WM_HOTKEY: u32 = 0x0312;
pub const WM_APP: u32 = 0x8000;

/// `WA_INACTIVE` in the low word of `WM_ACTIVATE`'s wparam.
const WA_INACTIVE: usize = 0;

/// Low 16 bits as an unsigned word.
pub fn low_word(value: usize) -> usize {
    value & 0xFFFF
}

/// Screen point packed into an lparam as two signed 16-bit words.
pub fn point_from_lparam(lparam: isize) -> Point {
    let x = (lparam & 0xFFFF) as u16 as i16;
    let y = ((lparam >> 16) & 0xFFFF) as u16 as i16;
    Point::new(i32::from(x), i32::from(y))
}

/// Decode the messages the dispatcher understands. Everything else is
/// `None` and goes straight to the default procedure.
pub fn decode(message: u32, wparam: usize, lparam: isize) -> Option<WindowMessage> {
    let decoded = match message {
        WM_MOVE => WindowMessage::Move,
        WM_MOVING => WindowMessage::Moving,
        WM_NCLBUTTONDOWN => WindowMessage::NcLeftButtonDown {
            hit: HitRegion::from_code(wparam as i32),
        },
        WM_SIZE => WindowMessage::Size,
        WM_ACTIVATE => WindowMessage::Activate {
            active: low_word(wparam) != WA_INACTIVE,
        },
        WM_CLOSE => WindowMessage::Close,
        WM_DESTROY => WindowMessage::Destroy,
        WM_GETMINMAXINFO => WindowMessage::GetMinMaxInfo,
        WM_NCHITTEST => WindowMessage::NcHitTest {
            cursor: point_from_lparam(lparam),
        },
        WM_APP => WindowMessage::App,
        WM_HOTKEY => WindowMessage::HotKey { id: wparam as i32 },
        _ => return None,
    };
    Some(decoded)
}
