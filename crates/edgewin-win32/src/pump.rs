//! Thread message pump and the cross-thread waker.

use std::time::Duration;

use edgewin_core::WindowHandle;
use edgewin_core::native::{MessagePump, PumpStatus, Waker};
use tracing::{error, warn};
use windows::Win32::Foundation::{LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, MsgWaitForMultipleObjects, PM_REMOVE, PeekMessageW,
    PostMessageW, PostThreadMessageW, QS_ALLINPUT, TranslateMessage, WM_APP, WM_QUIT,
};

use crate::window::hwnd;

/// Pumps the calling thread's message queue.
pub struct Win32Pump;

impl Win32Pump {
    fn dispatch(msg: &MSG) -> PumpStatus {
        if msg.message == WM_QUIT {
            return PumpStatus::Quit;
        }
        // Wake-ups posted to the thread rather than a window.
        if msg.hwnd.is_invalid() && msg.message == WM_APP {
            return PumpStatus::Wake;
        }
        unsafe {
            let _ = TranslateMessage(msg);
            DispatchMessageW(msg);
        }
        PumpStatus::Dispatched
    }

    fn peek(msg: &mut MSG) -> bool {
        unsafe { PeekMessageW(msg, None, 0, 0, PM_REMOVE).as_bool() }
    }
}

impl MessagePump for Win32Pump {
    fn pump(&self, wait: Option<Duration>) -> PumpStatus {
        let mut msg = MSG::default();
        match wait {
            None => match unsafe { GetMessageW(&mut msg, None, 0, 0) }.0 {
                0 => PumpStatus::Quit,
                -1 => {
                    error!("GetMessageW failed");
                    PumpStatus::Quit
                }
                _ => Self::dispatch(&msg),
            },
            Some(wait) => {
                if !Self::peek(&mut msg) {
                    let millis = u32::try_from(wait.as_millis()).unwrap_or(u32::MAX);
                    unsafe {
                        MsgWaitForMultipleObjects(None, false, millis, QS_ALLINPUT);
                    }
                    if !Self::peek(&mut msg) {
                        return PumpStatus::Idle;
                    }
                }
                Self::dispatch(&msg)
            }
        }
    }
}

/// Wakes one window's UI thread from anywhere.
///
/// Wake-ups go to the window so they are still delivered while a modal loop
/// (menu tracking, window dragging) owns the thread.
pub struct Win32Waker {
    window: WindowHandle,
    thread_id: u32,
}

impl Win32Waker {
    /// Must be created on the window's UI thread.
    pub fn new(window: WindowHandle) -> Self {
        Self {
            window,
            thread_id: unsafe { GetCurrentThreadId() },
        }
    }

    /// Post the wake message, falling back to the thread queue once the
    /// window is gone.
    fn try_wake(&self) -> windows::core::Result<()> {
        let posted =
            unsafe { PostMessageW(Some(hwnd(self.window)), WM_APP, WPARAM(0), LPARAM(0)) };
        if posted.is_ok() {
            return Ok(());
        }
        unsafe { PostThreadMessageW(self.thread_id, WM_APP, WPARAM(0), LPARAM(0)) }
    }
}

impl Waker for Win32Waker {
    fn wake(&self) {
        if let Err(e) = self.try_wake() {
            warn!("Failed to post wake to thread {}: {}", self.thread_id, e);
        }
    }

    fn quit(&self) {
        if let Err(e) =
            unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
        {
            warn!("Failed to post quit to thread {}: {}", self.thread_id, e);
        }
    }
}
