//! Thread-affinity guard for objects that must stay on the UI thread.
//!
//! Native window and engine objects may only be touched by the thread that
//! owns the message loop. `ThreadBound` lets such objects live inside a
//! `Send + Sync` window while rejecting access from any other thread.

use std::mem;
use std::thread::{self, ThreadId};

use send_wrapper::SendWrapper;
use tracing::warn;

use crate::error::{Error, Result};

/// Wraps a value so it can only be reached from the thread that created it.
pub struct ThreadBound<T> {
    owner: ThreadId,
    value: Option<SendWrapper<T>>,
}

impl<T> ThreadBound<T> {
    /// Bind a value to the current thread.
    pub fn new(value: T) -> Self {
        Self {
            owner: thread::current().id(),
            value: Some(SendWrapper::new(value)),
        }
    }

    /// Thread that owns the value.
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Whether the calling thread owns the value.
    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Borrow the value, failing when called off the owning thread.
    pub fn get(&self) -> Result<&T> {
        match &self.value {
            Some(value) if value.valid() => Ok(&**value),
            _ => Err(Error::WrongThread),
        }
    }
}

impl<T> Drop for ThreadBound<T> {
    fn drop(&mut self) {
        // SendWrapper panics when dropped off its thread; leak instead.
        if let Some(value) = self.value.take() {
            if !value.valid() {
                warn!(
                    "UI-thread object dropped on {:?}; leaking it instead",
                    thread::current().id()
                );
                mem::forget(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_owner_thread_can_access() {
        let bound = ThreadBound::new(Rc::new(7));
        assert_eq!(**bound.get().unwrap(), 7);
    }

    #[test]
    fn test_foreign_thread_is_rejected() {
        let bound = Arc::new(ThreadBound::new(Rc::new(7)));
        let remote = bound.clone();
        let rejected = thread::spawn(move || matches!(remote.get(), Err(Error::WrongThread)))
            .join()
            .unwrap();
        assert!(rejected);
        assert!(bound.get().is_ok());
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_drop_runs_only_on_owner() {
        let dropped = Arc::new(AtomicBool::new(false));
        let bound = ThreadBound::new(SetOnDrop(dropped.clone()));
        thread::spawn(move || drop(bound)).join().unwrap();
        assert!(!dropped.load(Ordering::SeqCst));

        let bound = ThreadBound::new(SetOnDrop(dropped.clone()));
        drop(bound);
        assert!(dropped.load(Ordering::SeqCst));
    }
}
