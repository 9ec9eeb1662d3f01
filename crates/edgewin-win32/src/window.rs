//! Top-level Win32 window and its window procedure.

use std::ffi::c_void;
use std::path::Path;

use edgewin_core::native::{NativeWindow, Placement, ShowCommand, WindowStyle, ZOrder};
use edgewin_core::{
    Error, HotKey, HotKeyError, Outcome, Rect, Result, Size, SizeConstraints,
    WindowEventDispatcher, WindowHandle, WindowOptions,
};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    HOT_KEY_MODIFIERS, RegisterHotKey, SetFocus, UnregisterHotKey,
};
use windows::Win32::UI::WindowsAndMessaging::*;
use windows::core::{HSTRING, PCWSTR, w};

use crate::decode;

const CLASS_NAME: PCWSTR = w!("edgewin_window");

static CLASS: OnceCell<()> = OnceCell::new();

pub(crate) fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.raw() as *mut c_void)
}

fn to_rect(rect: RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

fn register_class() -> Result<()> {
    CLASS
        .get_or_try_init(|| unsafe {
            let instance = GetModuleHandleW(None).map_err(|e| Error::Window(e.to_string()))?;
            let class = WNDCLASSEXW {
                cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
                style: CS_HREDRAW | CS_VREDRAW,
                lpfnWndProc: Some(window_proc),
                hInstance: instance.into(),
                hCursor: LoadCursorW(None, IDC_ARROW).unwrap_or_default(),
                lpszClassName: CLASS_NAME,
                ..Default::default()
            };
            if RegisterClassExW(&class) == 0 {
                return Err(Error::Window("RegisterClassExW failed".to_string()));
            }
            debug!("Registered window class");
            Ok(())
        })
        .map(|_| ())
}

/// Create a layered top-level window as described by `options`.
pub(crate) fn create(options: &WindowOptions) -> Result<Win32Window> {
    register_class()?;

    let size = options.initial_size();
    let (x, y) = if options.center {
        let screen = screen_size();
        ((screen.width - size.width) / 2, (screen.height - size.height) / 2)
    } else {
        (CW_USEDEFAULT, CW_USEDEFAULT)
    };

    let title = HSTRING::from(options.title.as_str());
    let hwnd = unsafe {
        CreateWindowExW(
            WS_EX_LAYERED,
            CLASS_NAME,
            &title,
            WINDOW_STYLE(options.style().bits()),
            x,
            y,
            size.width,
            size.height,
            None,
            None,
            GetModuleHandleW(None).ok().map(|m| m.into()),
            None,
        )
    }
    .map_err(|e| Error::Window(format!("CreateWindowExW failed: {e}")))?;

    let window = Win32Window {
        handle: WindowHandle::new(hwnd.0 as isize),
    };
    if let Some(icon) = &options.icon_path {
        window.set_icon(icon);
    }
    Ok(window)
}

fn screen_size() -> Size {
    unsafe { Size::new(GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) }
}

pub struct Win32Window {
    handle: WindowHandle,
}

impl Win32Window {
    fn hwnd(&self) -> HWND {
        hwnd(self.handle)
    }

    fn set_icon(&self, path: &Path) {
        let file = HSTRING::from(path.as_os_str());
        let icon = unsafe {
            LoadImageW(
                None,
                &file,
                IMAGE_ICON,
                0,
                0,
                LR_LOADFROMFILE | LR_DEFAULTSIZE,
            )
        };
        match icon {
            Ok(icon) => unsafe {
                let lparam = Some(LPARAM(icon.0 as isize));
                SendMessageW(self.hwnd(), WM_SETICON, Some(WPARAM(ICON_BIG as usize)), lparam);
                SendMessageW(self.hwnd(), WM_SETICON, Some(WPARAM(ICON_SMALL as usize)), lparam);
            },
            Err(e) => warn!("Failed to load icon {}: {}", path.display(), e),
        }
    }
}

impl NativeWindow for Win32Window {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn show(&self, command: ShowCommand) {
        let command = match command {
            ShowCommand::Show => SW_SHOW,
            ShowCommand::Hide => SW_HIDE,
            ShowCommand::Minimize => SW_MINIMIZE,
            ShowCommand::Maximize => SW_MAXIMIZE,
            ShowCommand::Restore => SW_RESTORE,
        };
        unsafe {
            let _ = ShowWindow(self.hwnd(), command);
        }
    }

    fn focus(&self) {
        unsafe {
            let _ = SetFocus(Some(self.hwnd()));
        }
    }

    fn set_title(&self, title: &str) {
        let title = HSTRING::from(title);
        if let Err(e) = unsafe { SetWindowTextW(self.hwnd(), &title) } {
            warn!("SetWindowTextW failed: {}", e);
        }
    }

    fn window_rect(&self) -> Rect {
        let mut rect = RECT::default();
        unsafe {
            let _ = GetWindowRect(self.hwnd(), &mut rect);
        }
        to_rect(rect)
    }

    fn client_rect(&self) -> Rect {
        let mut rect = RECT::default();
        unsafe {
            let _ = GetClientRect(self.hwnd(), &mut rect);
        }
        to_rect(rect)
    }

    fn screen_size(&self) -> Size {
        screen_size()
    }

    fn style(&self) -> WindowStyle {
        let bits = unsafe { GetWindowLongW(self.hwnd(), GWL_STYLE) };
        WindowStyle::from_bits_retain(bits as u32)
    }

    fn set_style(&self, style: WindowStyle) {
        unsafe {
            SetWindowLongW(self.hwnd(), GWL_STYLE, style.bits() as i32);
        }
    }

    fn frame_size_for_client(&self, client: Size) -> Size {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: client.width,
            bottom: client.height,
        };
        let style = WINDOW_STYLE(self.style().bits());
        if let Err(e) = unsafe { AdjustWindowRect(&mut rect, style, false) } {
            warn!("AdjustWindowRect failed: {}", e);
            return client;
        }
        to_rect(rect).size()
    }

    fn set_placement(&self, placement: Placement) {
        let mut flags = SWP_NOACTIVATE;
        let (x, y) = match placement.position {
            Some(p) => (p.x, p.y),
            None => {
                flags |= SWP_NOMOVE;
                (0, 0)
            }
        };
        let (cx, cy) = match placement.size {
            Some(s) => (s.width, s.height),
            None => {
                flags |= SWP_NOSIZE;
                (0, 0)
            }
        };
        let after = match placement.z_order {
            ZOrder::Unchanged => {
                flags |= SWP_NOZORDER;
                None
            }
            ZOrder::Top => Some(HWND_TOP),
            ZOrder::TopMost => Some(HWND_TOPMOST),
            ZOrder::NoTopMost => Some(HWND_NOTOPMOST),
        };
        if placement.frame_changed {
            flags |= SWP_FRAMECHANGED;
        }
        if let Err(e) = unsafe { SetWindowPos(self.hwnd(), after, x, y, cx, cy, flags) } {
            warn!("SetWindowPos failed: {}", e);
        }
    }

    fn set_layered_alpha(&self, alpha: u8) {
        if let Err(e) =
            unsafe { SetLayeredWindowAttributes(self.hwnd(), COLORREF(0), alpha, LWA_ALPHA) }
        {
            warn!("SetLayeredWindowAttributes failed: {}", e);
        }
    }

    fn register_hotkey(&self, id: i32, hotkey: HotKey) -> std::result::Result<(), HotKeyError> {
        let modifiers = HOT_KEY_MODIFIERS(hotkey.modifiers.bits());
        unsafe { RegisterHotKey(Some(self.hwnd()), id, modifiers, hotkey.key) }.map_err(|e| {
            HotKeyError::Denied {
                hotkey: hotkey.to_string(),
                reason: e.message().to_string(),
            }
        })
    }

    fn unregister_hotkey(&self, id: i32) {
        if let Err(e) = unsafe { UnregisterHotKey(Some(self.hwnd()), id) } {
            debug!("UnregisterHotKey({}) failed: {}", id, e);
        }
    }

    fn destroy(&self) {
        if let Err(e) = unsafe { DestroyWindow(self.hwnd()) } {
            debug!("DestroyWindow failed: {}", e);
        }
    }
}

fn apply_min_max(lparam: LPARAM, constraints: SizeConstraints) {
    let info = lparam.0 as *mut MINMAXINFO;
    if info.is_null() {
        return;
    }
    let info = unsafe { &mut *info };
    if constraints.max.is_set() {
        info.ptMaxSize.x = constraints.max.width;
        info.ptMaxSize.y = constraints.max.height;
        info.ptMaxTrackSize.x = constraints.max.width;
        info.ptMaxTrackSize.y = constraints.max.height;
    }
    if constraints.min.is_set() {
        info.ptMinTrackSize.x = constraints.min.width;
        info.ptMinTrackSize.y = constraints.min.height;
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let Some(message) = decode::decode(msg, wparam.0, lparam.0) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    let handle = WindowHandle::new(hwnd.0 as isize);
    match WindowEventDispatcher::global().dispatch(handle, message) {
        Outcome::Forward => unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) },
        Outcome::Handled => LRESULT(0),
        Outcome::HitTest(region) => LRESULT(region.code() as isize),
        Outcome::ApplyMinMax(constraints) => {
            apply_min_max(lparam, constraints);
            LRESULT(0)
        }
    }
}
