//! Process-wide handle to owner registry.
//!
//! The OS window procedure receives only a window handle, so the dispatcher
//! needs a way back to the object that owns the window. The registry holds
//! weak references; a window that has been dropped simply stops resolving.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::dispatcher::WindowOwner;
use crate::handle::WindowHandle;

static GLOBAL: Lazy<Arc<WindowRegistry>> = Lazy::new(|| Arc::new(WindowRegistry::new()));

/// Maps window handles to their owning windows.
pub struct WindowRegistry {
    owners: RwLock<HashMap<WindowHandle, Weak<dyn WindowOwner>>>,
}

impl WindowRegistry {
    pub fn new() -> Self {
        Self {
            owners: RwLock::new(HashMap::new()),
        }
    }

    /// The registry shared by every window in the process.
    pub fn global() -> Arc<WindowRegistry> {
        GLOBAL.clone()
    }

    /// Associate a handle with its owner, replacing any stale entry.
    pub fn register(&self, handle: WindowHandle, owner: Weak<dyn WindowOwner>) {
        debug!("Registering {}", handle);
        self.owners.write().insert(handle, owner);
    }

    /// Forget a handle. Returns whether it was registered.
    pub fn unregister(&self, handle: WindowHandle) -> bool {
        let removed = self.owners.write().remove(&handle).is_some();
        if removed {
            debug!("Unregistered {}", handle);
        }
        removed
    }

    /// Resolve the live owner of a handle.
    pub fn lookup(&self, handle: WindowHandle) -> Option<Arc<dyn WindowOwner>> {
        self.owners.read().get(&handle).and_then(Weak::upgrade)
    }

    pub fn contains(&self, handle: WindowHandle) -> bool {
        self.owners.read().contains_key(&handle)
    }

    pub fn len(&self) -> usize {
        self.owners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.read().is_empty()
    }
}

impl Default for WindowRegistry {
    fn default() -> Self {
        Self::new()
    }
}
