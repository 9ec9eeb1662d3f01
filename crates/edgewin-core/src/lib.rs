//! edgewin core
//!
//! Platform-independent half of a desktop window hosting an embedded
//! browser engine:
//! - Window facade with a cross-thread dispatch queue
//! - Message routing from the window procedure to the owning window
//! - Script bridge for host functions callable from page script
//! - Global hotkeys, script hooks and permission policy
//!
//! The native window, message pump and engine sit behind the traits in
//! [`native`] and [`engine`]; `edgewin-win32` implements them on Windows.

mod bridge;
mod browser;
mod config;
mod dispatcher;
mod error;
mod handle;
mod hook;
mod hotkey;
mod message;
mod permission;
mod queue;
mod registry;
mod thread;
mod window;

pub mod engine;
pub mod native;

#[cfg(test)]
mod testing;

pub use bridge::{
    Arity, Binding, BridgeError, ControlMessage, HostFunction, Inbound, IntoReply, Json, Reply,
    RpcCall, ScriptBridge, binding_stub,
};
pub use browser::{BrowserAdapter, BrowserEvents, EngineFailure, EngineStage, SessionState};
pub use config::{ConfigError, FALLBACK_SIZE, WebViewOptions, WindowOptions, default_data_dir};
pub use dispatcher::{BORDER_WIDTH, WindowEventDispatcher, WindowOwner, hit_test};
pub use error::{Error, Result};
pub use handle::{Point, Rect, Size, WindowHandle};
pub use hook::{HookChain, HookId, HookKind, JsHook, ScriptHook};
pub use hotkey::{HotKey, HotKeyError, HotKeyTable, MAX_HOTKEY_ID, Modifiers, vk};
pub use message::{HitRegion, Outcome, SizeConstraints, WindowMessage};
pub use permission::{PermissionKind, PermissionPolicy, PermissionState};
pub use queue::{DispatchQueue, Job};
pub use registry::WindowRegistry;
pub use thread::ThreadBound;
pub use window::{DispatchHandle, HotKeyHandler, PageState, SizeHint, WebView};
