//! Browser control adapter.
//!
//! Drives the engine's two-phase creation handshake
//! (`Uninitialized -> EnvironmentPending -> ControllerPending -> Ready`) and
//! exposes navigation, scripting, sizing and focus once the session is
//! ready. `embed` blocks by pumping the window's message loop until the
//! asynchronous completions have run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::path::Path;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::engine::{
    AcceleratorKey, BrowserEngine, EngineError, EngineEvents, EngineSettings, KeyEventKind,
    NavigationResult, ResourceRequest,
};
use crate::error::{Error, Result};
use crate::handle::{Rect, WindowHandle};
use crate::native::{MessagePump, PumpStatus};
use crate::permission::PermissionPolicy;

/// Routes `window.external.invoke` to the engine's message channel.
pub const EXTERNAL_INVOKE_SHIM: &str =
    "window.external={invoke:s=>window.chrome.webview.postMessage(s)}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    EnvironmentPending,
    ControllerPending,
    Ready,
    /// The handshake failed or timed out. Terminal.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStage {
    Environment,
    Controller,
}

impl fmt::Display for EngineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("environment"),
            Self::Controller => f.write_str("controller"),
        }
    }
}

/// Why a session died.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    pub stage: EngineStage,
    pub error: EngineError,
}

impl fmt::Display for EngineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} creation failed: {}", self.stage, self.error)
    }
}

/// Engine events forwarded to the window. Called on the UI thread.
pub trait BrowserEvents {
    fn message_received(&self, _message: &str) {}

    fn resource_requested(&self, _request: &ResourceRequest) {}

    /// A non-repeating key-down. Returns whether the host consumed it.
    fn accelerator_key(&self, _virtual_key: u32) -> bool {
        false
    }

    fn navigation_starting(&self, _url: &str) {}

    fn navigation_completed(&self, _result: &NavigationResult) {}
}

struct Shared {
    engine: Rc<dyn BrowserEngine>,
    events: Rc<dyn BrowserEvents>,
    permissions: Arc<PermissionPolicy>,
    state: Cell<SessionState>,
    failure: RefCell<Option<EngineFailure>>,
    settings: Cell<EngineSettings>,
    focus_pending: Cell<bool>,
    after_ready: RefCell<Vec<String>>,
}

impl Shared {
    fn fail(&self, stage: EngineStage, error: EngineError) {
        error!("Engine {} creation failed: {}", stage, error);
        self.failure.replace(Some(EngineFailure { stage, error }));
        self.state.set(SessionState::Failed);
        self.after_ready.borrow_mut().clear();
    }

    fn environment_completed(self: Rc<Self>, window: WindowHandle, result: Result<(), EngineError>) {
        if self.state.get() != SessionState::EnvironmentPending {
            debug!("Ignoring stale environment completion");
            return;
        }
        if let Err(e) = result {
            self.fail(EngineStage::Environment, e);
            return;
        }

        debug!("Engine environment created");
        self.state.set(SessionState::ControllerPending);
        let weak = Rc::downgrade(&self);
        let started = self.engine.create_controller(
            window,
            Box::new(move |result| {
                if let Some(shared) = weak.upgrade() {
                    shared.controller_completed(result);
                }
            }),
        );
        if let Err(e) = started {
            self.fail(EngineStage::Controller, e);
        }
    }

    fn controller_completed(self: Rc<Self>, result: Result<(), EngineError>) {
        if self.state.get() != SessionState::ControllerPending {
            debug!("Ignoring stale controller completion");
            return;
        }
        if let Err(e) = result.and_then(|()| self.engine.subscribe(self.engine_events())) {
            self.fail(EngineStage::Controller, e);
            return;
        }
        if let Err(e) = self.engine.apply_settings(&self.settings.get()) {
            warn!("Failed to apply engine settings: {}", e);
        }

        self.state.set(SessionState::Ready);
        info!("Browser session ready");

        if self.focus_pending.replace(false) {
            if let Err(e) = self.engine.move_focus() {
                warn!("Deferred focus failed: {}", e);
            }
        }
        let scripts = std::mem::take(&mut *self.after_ready.borrow_mut());
        for script in scripts {
            if let Err(e) = self.engine.execute_script(&script) {
                warn!("Deferred script failed: {}", e);
            }
        }
    }

    fn engine_events(&self) -> EngineEvents {
        let events = self.events.clone();
        let on_message = events.clone();
        let on_resource = events.clone();
        let on_accelerator = events.clone();
        let on_starting = events.clone();
        let permissions = self.permissions.clone();

        EngineEvents {
            message: Box::new(move |message: &str| on_message.message_received(message)),
            permission: Box::new(move |kind| permissions.decide(kind)),
            resource: Box::new(move |request: &ResourceRequest| {
                on_resource.resource_requested(request)
            }),
            accelerator: Box::new(move |key: &AcceleratorKey| {
                filter_accelerator(&*on_accelerator, key)
            }),
            navigation_starting: Box::new(move |url: &str| on_starting.navigation_starting(url)),
            navigation_completed: Box::new(move |result: &NavigationResult| {
                events.navigation_completed(result)
            }),
        }
    }
}

/// Only first presses of a key reach the host; repeats and releases are
/// left to the engine.
fn filter_accelerator(events: &dyn BrowserEvents, key: &AcceleratorKey) -> bool {
    match key.kind {
        KeyEventKind::KeyDown | KeyEventKind::SystemKeyDown if !key.was_key_down => {
            events.accelerator_key(key.virtual_key)
        }
        _ => false,
    }
}

/// One engine session bound to one window.
pub struct BrowserAdapter {
    shared: Rc<Shared>,
}

impl BrowserAdapter {
    pub fn new(
        engine: Rc<dyn BrowserEngine>,
        events: Rc<dyn BrowserEvents>,
        permissions: Arc<PermissionPolicy>,
    ) -> Self {
        Self {
            shared: Rc::new(Shared {
                engine,
                events,
                permissions,
                state: Cell::new(SessionState::Uninitialized),
                failure: RefCell::new(None),
                settings: Cell::new(EngineSettings::default()),
                focus_pending: Cell::new(false),
                after_ready: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.shared.state.get()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    pub fn failure(&self) -> Option<EngineFailure> {
        self.shared.failure.borrow().clone()
    }

    pub fn permissions(&self) -> &Arc<PermissionPolicy> {
        &self.shared.permissions
    }

    /// Create the engine inside `window`, pumping `pump` until the
    /// handshake finishes, fails, or `timeout` elapses.
    pub fn embed(
        &self,
        window: WindowHandle,
        data_dir: &Path,
        pump: &dyn MessagePump,
        timeout: Option<Duration>,
    ) -> Result<()> {
        match self.state() {
            SessionState::Uninitialized => {}
            SessionState::Ready => return Ok(()),
            SessionState::Failed => return Err(self.fatal()),
            SessionState::EnvironmentPending | SessionState::ControllerPending => {
                return Err(Error::NotReady);
            }
        }

        info!("Embedding browser in {} (data dir {})", window, data_dir.display());
        self.shared.state.set(SessionState::EnvironmentPending);
        let weak: Weak<Shared> = Rc::downgrade(&self.shared);
        let started = self.shared.engine.create_environment(
            data_dir,
            Box::new(move |result| {
                if let Some(shared) = weak.upgrade() {
                    shared.environment_completed(window, result);
                }
            }),
        );
        if let Err(e) = started {
            self.shared.state.set(SessionState::Uninitialized);
            return Err(Error::Engine(e));
        }

        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            match self.state() {
                SessionState::Ready => break,
                SessionState::Failed => return Err(self.fatal()),
                _ => {}
            }

            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        let stage = match self.state() {
                            SessionState::EnvironmentPending => EngineStage::Environment,
                            _ => EngineStage::Controller,
                        };
                        self.shared
                            .fail(stage, EngineError::new(EngineError::TIMEOUT, "timed out"));
                        return Err(Error::InitTimeout(timeout.unwrap_or_default()));
                    }
                    Some(left)
                }
                None => None,
            };

            if pump.pump(wait) == PumpStatus::Quit {
                warn!("Message loop quit while the engine was initializing");
                return Err(Error::LoopExited);
            }
        }

        self.init(EXTERNAL_INVOKE_SHIM)?;
        Ok(())
    }

    fn fatal(&self) -> Error {
        match self.failure() {
            Some(failure) => Error::Fatal(failure),
            None => Error::SessionFailed,
        }
    }

    fn engine(&self) -> Result<&dyn BrowserEngine> {
        match self.state() {
            SessionState::Ready => Ok(&*self.shared.engine),
            SessionState::Failed => Err(Error::SessionFailed),
            _ => Err(Error::NotReady),
        }
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        debug!("Navigating to {}", url);
        Ok(self.engine()?.navigate(url)?)
    }

    pub fn set_html(&self, html: &str) -> Result<()> {
        Ok(self.engine()?.navigate_to_string(html)?)
    }

    /// Add a script that runs on every future document.
    pub fn init(&self, script: &str) -> Result<()> {
        Ok(self.engine()?.add_init_script(script)?)
    }

    /// Run a script once in the current document.
    pub fn eval(&self, script: &str) -> Result<()> {
        Ok(self.engine()?.execute_script(script)?)
    }

    /// Like `eval`, but a session still in its handshake queues the script
    /// until it becomes ready.
    pub fn eval_after_ready(&self, script: &str) -> Result<()> {
        match self.state() {
            SessionState::Ready => self.eval(script),
            SessionState::Failed => Err(Error::SessionFailed),
            _ => {
                self.shared.after_ready.borrow_mut().push(script.to_string());
                Ok(())
            }
        }
    }

    /// Fit the browser to `bounds`. Ignored before the session is ready.
    pub fn resize(&self, bounds: Rect) -> Result<()> {
        match self.engine() {
            Ok(engine) => Ok(engine.set_bounds(bounds)?),
            Err(_) => Ok(()),
        }
    }

    /// Tell the engine its parent moved. Ignored before the session is
    /// ready.
    pub fn notify_moved(&self) -> Result<()> {
        match self.engine() {
            Ok(engine) => Ok(engine.notify_parent_moved()?),
            Err(_) => Ok(()),
        }
    }

    /// Focus the browser, or remember to once the session is ready.
    pub fn focus(&self) -> Result<()> {
        match self.state() {
            SessionState::Ready => Ok(self.shared.engine.move_focus()?),
            SessionState::Failed => Err(Error::SessionFailed),
            _ => {
                self.shared.focus_pending.set(true);
                Ok(())
            }
        }
    }

    /// Store settings, applying them now if the session is ready.
    pub fn set_settings(&self, settings: EngineSettings) -> Result<()> {
        self.shared.settings.set(settings);
        if self.is_ready() {
            self.shared.engine.apply_settings(&settings)?;
        }
        Ok(())
    }

    pub fn settings(&self) -> EngineSettings {
        self.shared.settings.get()
    }

    pub fn open_devtools(&self) -> Result<()> {
        Ok(self.engine()?.open_devtools()?)
    }

    pub fn add_resource_filter(&self, pattern: &str) -> Result<()> {
        Ok(self.engine()?.add_resource_filter(pattern)?)
    }

    pub fn print_to_pdf(&self, path: &Path, done: crate::engine::Completion) -> Result<()> {
        Ok(self.engine()?.print_to_pdf(path, done)?)
    }

    /// Release the engine. Later calls fail with `SessionFailed`.
    pub fn close(&self) {
        if self.state() == SessionState::Ready {
            self.shared.engine.close();
        }
        self.shared.state.set(SessionState::Failed);
        self.shared.after_ready.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{PermissionKind, PermissionState};
    use crate::testing::{EngineCall, MockEngine, MockLoop};

    #[derive(Default)]
    struct Keys {
        seen: RefCell<Vec<u32>>,
        messages: RefCell<Vec<String>>,
    }

    impl BrowserEvents for Keys {
        fn message_received(&self, message: &str) {
            self.messages.borrow_mut().push(message.to_string());
        }

        fn accelerator_key(&self, virtual_key: u32) -> bool {
            self.seen.borrow_mut().push(virtual_key);
            virtual_key == 0x74
        }
    }

    fn adapter() -> (BrowserAdapter, Rc<MockEngine>, Rc<MockLoop>, Rc<Keys>) {
        let lp = MockLoop::new();
        let engine = MockEngine::new(lp.clone());
        let keys = Rc::new(Keys::default());
        let adapter = BrowserAdapter::new(
            engine.clone(),
            keys.clone(),
            Arc::new(PermissionPolicy::with_defaults()),
        );
        (adapter, engine, lp, keys)
    }

    fn window() -> WindowHandle {
        WindowHandle::new(0x100)
    }

    #[test]
    fn test_embed_completes_handshake() {
        let (adapter, engine, lp, _) = adapter();
        assert_eq!(adapter.state(), SessionState::Uninitialized);

        adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap();
        assert!(adapter.is_ready());

        let calls = engine.calls();
        assert!(calls.contains(&EngineCall::CreateEnvironment("data".into())));
        assert!(calls.contains(&EngineCall::CreateController(window())));
        assert!(calls.contains(&EngineCall::Subscribe));
        assert_eq!(engine.init_scripts(), vec![EXTERNAL_INVOKE_SHIM.to_string()]);
    }

    #[test]
    fn test_environment_failure_is_fatal() {
        let (adapter, engine, lp, _) = adapter();
        engine.fail_environment(EngineError::new(-1, "no runtime"));

        let err = adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap_err();
        match err {
            Error::Fatal(failure) => {
                assert_eq!(failure.stage, EngineStage::Environment);
                assert_eq!(failure.error.message, "no runtime");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(adapter.state(), SessionState::Failed);
        assert!(matches!(adapter.navigate("about:blank"), Err(Error::SessionFailed)));
        assert!(matches!(adapter.eval("1"), Err(Error::SessionFailed)));
    }

    #[test]
    fn test_controller_failure_is_fatal() {
        let (adapter, engine, lp, _) = adapter();
        engine.fail_controller(EngineError::new(-2, "no controller"));

        let err = adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Fatal(EngineFailure {
                stage: EngineStage::Controller,
                ..
            })
        ));
    }

    #[test]
    fn test_synchronous_start_failure_is_recoverable() {
        let (adapter, engine, lp, _) = adapter();
        engine.refuse_start(EngineError::new(-3, "refused"));

        let err = adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap_err();
        assert!(matches!(err, Error::Engine(_)));
        assert_eq!(adapter.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_embed_times_out() {
        let (adapter, engine, lp, _) = adapter();
        engine.stall();

        let err = adapter
            .embed(
                window(),
                Path::new("data"),
                &lp.pump(),
                Some(Duration::from_millis(50)),
            )
            .unwrap_err();
        assert!(matches!(err, Error::InitTimeout(_)));
        assert_eq!(adapter.state(), SessionState::Failed);
    }

    #[test]
    fn test_quit_during_embed() {
        let (adapter, engine, lp, _) = adapter();
        engine.stall();
        lp.sender().send(crate::testing::LoopItem::Quit).unwrap();

        let err = adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap_err();
        assert!(matches!(err, Error::LoopExited));
    }

    #[test]
    fn test_calls_before_ready() {
        let (adapter, engine, _, _) = adapter();
        assert!(matches!(adapter.navigate("about:blank"), Err(Error::NotReady)));
        assert!(matches!(adapter.set_html("<p>"), Err(Error::NotReady)));
        assert!(matches!(adapter.init("1"), Err(Error::NotReady)));
        assert!(matches!(adapter.eval("1"), Err(Error::NotReady)));
        assert!(adapter.resize(Rect::new(0, 0, 10, 10)).is_ok());
        assert!(adapter.notify_moved().is_ok());
        assert!(adapter.focus().is_ok());
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn test_deferred_focus_and_scripts_flush_on_ready() {
        let (adapter, engine, lp, _) = adapter();
        adapter.focus().unwrap();
        adapter.eval_after_ready("late()").unwrap();

        adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap();
        let calls = engine.calls();
        assert!(calls.contains(&EngineCall::MoveFocus));
        assert_eq!(engine.evaluated(), vec!["late()".to_string()]);
    }

    #[test]
    fn test_ready_operations_reach_engine() {
        let (adapter, engine, lp, _) = adapter();
        adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap();

        adapter.navigate("https://example.com").unwrap();
        adapter.eval("go()").unwrap();
        adapter.resize(Rect::new(0, 0, 640, 480)).unwrap();
        adapter
            .set_settings(EngineSettings {
                dev_tools: true,
                context_menus: false,
            })
            .unwrap();

        let calls = engine.calls();
        assert!(calls.contains(&EngineCall::Navigate("https://example.com".to_string())));
        assert!(calls.contains(&EngineCall::SetBounds(Rect::new(0, 0, 640, 480))));
        assert!(calls.contains(&EngineCall::ApplySettings(EngineSettings {
            dev_tools: true,
            context_menus: false,
        })));
        assert_eq!(engine.evaluated(), vec!["go()".to_string()]);
    }

    #[test]
    fn test_engine_events_are_routed() {
        let (adapter, engine, lp, keys) = adapter();
        adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap();

        engine.post_message("hello");
        assert_eq!(*keys.messages.borrow(), vec!["hello".to_string()]);

        assert_eq!(
            engine.request_permission(PermissionKind::ClipboardRead),
            Some(PermissionState::Allow)
        );
        adapter
            .permissions()
            .set_global(Some(PermissionState::Deny));
        assert_eq!(
            engine.request_permission(PermissionKind::Camera),
            Some(PermissionState::Deny)
        );
    }

    #[test]
    fn test_accelerator_filtering() {
        let (adapter, engine, lp, keys) = adapter();
        adapter
            .embed(window(), Path::new("data"), &lp.pump(), None)
            .unwrap();

        let press = |kind, was_key_down| {
            engine.press_key(AcceleratorKey {
                kind,
                virtual_key: 0x74,
                was_key_down,
            })
        };
        assert_eq!(press(KeyEventKind::KeyDown, false), Some(true));
        assert_eq!(press(KeyEventKind::SystemKeyDown, false), Some(true));
        assert_eq!(press(KeyEventKind::KeyDown, true), Some(false));
        assert_eq!(press(KeyEventKind::KeyUp, false), Some(false));
        assert_eq!(keys.seen.borrow().len(), 2);
    }
}
