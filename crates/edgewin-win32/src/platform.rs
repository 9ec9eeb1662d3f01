//! Win32 implementation of the `Platform` trait.

use std::rc::Rc;
use std::sync::Arc;

use edgewin_core::native::{NativeParts, NativeWindow, Platform};
use edgewin_core::{Error, Result, WindowOptions};
use tracing::info;
use windows::Win32::System::Com::{COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize};

use crate::engine::WebView2Engine;
use crate::pump::{Win32Pump, Win32Waker};
use crate::window;

/// Creates Win32 windows hosting WebView2 on the calling thread.
///
/// Initializes a single-threaded COM apartment for as long as it lives, so
/// it must stay on the thread that created it.
pub struct Win32Platform {
    _apartment: Rc<()>,
}

impl Win32Platform {
    pub fn new() -> Result<Self> {
        unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) }
            .ok()
            .map_err(|e| Error::Window(format!("COM initialization failed: {e}")))?;
        Ok(Self {
            _apartment: Rc::new(()),
        })
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        unsafe { CoUninitialize() };
    }
}

impl Platform for Win32Platform {
    fn create_window(&self, options: &WindowOptions) -> Result<NativeParts> {
        let window = window::create(options)?;
        let handle = window.handle();
        info!("Created native window {} ({}x{})", handle, options.width, options.height);

        Ok(NativeParts {
            window: Box::new(window),
            pump: Box::new(Win32Pump),
            waker: Arc::new(Win32Waker::new(handle)),
            engine: Rc::new(WebView2Engine::new()),
        })
    }
}
