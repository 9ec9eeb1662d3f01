//! Script hooks: ordered transformations applied around `eval`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// Rewrites a script before it is evaluated.
    Before,
    /// Sees the evaluated script afterwards.
    After,
}

/// A script transformation.
pub trait JsHook: Send + Sync {
    fn kind(&self) -> HookKind;

    /// Lower runs earlier.
    fn priority(&self) -> i32;

    fn handle(&self, script: &str) -> String;
}

/// A hook built from a closure.
pub struct ScriptHook<F> {
    kind: HookKind,
    priority: i32,
    transform: F,
}

impl<F> ScriptHook<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    pub fn before(priority: i32, transform: F) -> Self {
        Self {
            kind: HookKind::Before,
            priority,
            transform,
        }
    }

    pub fn after(priority: i32, transform: F) -> Self {
        Self {
            kind: HookKind::After,
            priority,
            transform,
        }
    }
}

impl<F> JsHook for ScriptHook<F>
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn kind(&self) -> HookKind {
        self.kind
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn handle(&self, script: &str) -> String {
        (self.transform)(script)
    }
}

/// Identifies a hook for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookId(u64);

static NEXT_HOOK_ID: AtomicU64 = AtomicU64::new(1);

impl HookId {
    fn next() -> Self {
        Self(NEXT_HOOK_ID.fetch_add(1, Ordering::SeqCst))
    }
}

/// Hooks kept sorted by ascending priority, equal priorities in insertion
/// order.
#[derive(Default)]
pub struct HookChain {
    hooks: Mutex<Vec<(HookId, Arc<dyn JsHook>)>>,
}

impl HookChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, hook: Arc<dyn JsHook>) -> HookId {
        let id = HookId::next();
        let mut hooks = self.hooks.lock();
        let at = hooks
            .iter()
            .position(|(_, h)| hook.priority() < h.priority())
            .unwrap_or(hooks.len());
        hooks.insert(at, (id, hook));
        id
    }

    pub fn remove(&self, id: HookId) -> bool {
        let mut hooks = self.hooks.lock();
        let before = hooks.len();
        hooks.retain(|(hook_id, _)| *hook_id != id);
        hooks.len() != before
    }

    pub fn clear(&self) {
        self.hooks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.hooks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.lock().is_empty()
    }

    /// Hooks of one kind in execution order.
    pub fn snapshot(&self, kind: HookKind) -> Vec<Arc<dyn JsHook>> {
        self.hooks
            .lock()
            .iter()
            .filter(|(_, hook)| hook.kind() == kind)
            .map(|(_, hook)| hook.clone())
            .collect()
    }

    /// Thread `script` through every hook of `kind`.
    ///
    /// Hooks run outside the lock so a hook may add or remove hooks.
    pub fn apply(&self, kind: HookKind, script: &str) -> String {
        self.snapshot(kind)
            .iter()
            .fold(script.to_string(), |acc, hook| hook.handle(&acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(kind: HookKind, priority: i32, label: &'static str) -> Arc<dyn JsHook> {
        let transform = move |s: &str| format!("{}{}", s, label);
        match kind {
            HookKind::Before => Arc::new(ScriptHook::before(priority, transform)),
            HookKind::After => Arc::new(ScriptHook::after(priority, transform)),
        }
    }

    #[test]
    fn test_lower_priority_runs_first() {
        let chain = HookChain::new();
        chain.add(tag(HookKind::Before, 10, "b"));
        chain.add(tag(HookKind::Before, 1, "a"));
        chain.add(tag(HookKind::Before, 20, "c"));
        assert_eq!(chain.apply(HookKind::Before, ">"), ">abc");
    }

    #[test]
    fn test_equal_priority_keeps_insertion_order() {
        let chain = HookChain::new();
        chain.add(tag(HookKind::Before, 5, "1"));
        chain.add(tag(HookKind::Before, 5, "2"));
        chain.add(tag(HookKind::Before, 0, "0"));
        chain.add(tag(HookKind::Before, 5, "3"));
        assert_eq!(chain.apply(HookKind::Before, ""), "0123");
    }

    #[test]
    fn test_kinds_are_separate() {
        let chain = HookChain::new();
        chain.add(tag(HookKind::Before, 0, "b"));
        chain.add(tag(HookKind::After, 0, "a"));
        assert_eq!(chain.apply(HookKind::Before, ""), "b");
        assert_eq!(chain.apply(HookKind::After, ""), "a");
        assert_eq!(chain.snapshot(HookKind::After).len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let chain = HookChain::new();
        let id = chain.add(tag(HookKind::Before, 0, "x"));
        chain.add(tag(HookKind::Before, 1, "y"));
        assert!(chain.remove(id));
        assert!(!chain.remove(id));
        assert_eq!(chain.apply(HookKind::Before, ""), "y");

        chain.clear();
        assert!(chain.is_empty());
        assert_eq!(chain.apply(HookKind::Before, "same"), "same");
    }
}
