//! edgewin Win32 backend
//!
//! Native half of an edgewin window on Windows:
//! - Layered top-level window whose procedure feeds the shared dispatcher
//! - Thread message pump plus a waker usable from any thread
//! - WebView2 environment and controller behind `BrowserEngine`
//!
//! On other targets the crate only carries the message decoding.

#[cfg_attr(not(windows), allow(dead_code))]
mod decode;

#[cfg(windows)]
mod engine;
#[cfg(windows)]
mod platform;
#[cfg(windows)]
mod pump;
#[cfg(windows)]
mod window;

#[cfg(windows)]
pub use engine::WebView2Engine;
#[cfg(windows)]
pub use platform::Win32Platform;
#[cfg(windows)]
pub use pump::{Win32Pump, Win32Waker};
#[cfg(windows)]
pub use window::Win32Window;
