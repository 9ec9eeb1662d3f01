//! Error types shared across the window, bridge and engine layers.

use std::time::Duration;

use crate::bridge::BridgeError;
use crate::browser::EngineFailure;
use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::hotkey::HotKeyError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for window and browser operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine rejected environment or controller creation. The session
    /// is dead; the host should shut the window down.
    #[error("unrecoverable engine failure: {0}")]
    Fatal(EngineFailure),

    /// The engine never finished its creation handshake.
    #[error("engine initialization did not complete within {0:?}")]
    InitTimeout(Duration),

    /// The message loop quit while a blocking call was waiting on it.
    #[error("message loop exited")]
    LoopExited,

    /// A browser operation was attempted before the handshake completed.
    #[error("browser session is not ready")]
    NotReady,

    /// A browser operation was attempted after a fatal engine failure.
    #[error("browser session failed and cannot be used")]
    SessionFailed,

    /// A UI-thread-only object was touched from another thread.
    #[error("window objects may only be used on the thread that created them")]
    WrongThread,

    #[error("hotkey error: {0}")]
    HotKey(#[from] HotKeyError),

    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The native window layer failed.
    #[error("window error: {0}")]
    Window(String),
}
