//! In-process stand-ins for the OS window manager and the browser engine.
//!
//! `MockLoop` plays the role of the thread message queue: other threads feed
//! it through a channel, and engine completions are deferred onto it so they
//! run from inside `pump`, exactly where a real engine would deliver them.

use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config::WindowOptions;
use crate::dispatcher::WindowEventDispatcher;
use crate::engine::{
    AcceleratorKey, BrowserEngine, Completion, EngineError, EngineEvents, EngineSettings,
    NavigationResult, ResourceRequest,
};
use crate::error::Result;
use crate::handle::{Point, Rect, Size, WindowHandle};
use crate::hotkey::{HotKey, HotKeyError};
use crate::message::{Outcome, WindowMessage};
use crate::native::{
    MessagePump, NativeParts, NativeWindow, Placement, Platform, PumpStatus, ShowCommand, Waker,
    WindowStyle,
};
use crate::permission::{PermissionKind, PermissionState};
use crate::registry::WindowRegistry;

static NEXT_HANDLE: AtomicIsize = AtomicIsize::new(0x1000);

pub const SCREEN: Size = Size {
    width: 1920,
    height: 1080,
};

/// Non-client frame added around the client area of captioned windows.
pub const FRAME: Size = Size {
    width: 16,
    height: 39,
};

#[derive(Debug)]
pub enum LoopItem {
    Wake,
    Quit,
    Message(WindowHandle, WindowMessage),
}

pub struct MockLoop {
    tx: Sender<LoopItem>,
    rx: Receiver<LoopItem>,
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    dispatcher: WindowEventDispatcher,
    outcomes: RefCell<Vec<(WindowMessage, Outcome)>>,
}

impl MockLoop {
    pub fn new() -> Rc<Self> {
        Self::with_registry(Arc::new(WindowRegistry::new()))
    }

    pub fn with_registry(registry: Arc<WindowRegistry>) -> Rc<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        Rc::new(Self {
            tx,
            rx,
            deferred: RefCell::new(VecDeque::new()),
            dispatcher: WindowEventDispatcher::new(registry),
            outcomes: RefCell::new(Vec::new()),
        })
    }

    pub fn sender(&self) -> Sender<LoopItem> {
        self.tx.clone()
    }

    pub fn pump(self: &Rc<Self>) -> MockPump {
        MockPump { lp: self.clone() }
    }

    pub fn waker(&self) -> Arc<MockWaker> {
        Arc::new(MockWaker { tx: self.tx.clone() })
    }

    /// Run `f` from a later `pump` call.
    pub fn defer(&self, f: Box<dyn FnOnce()>) {
        self.deferred.borrow_mut().push_back(f);
    }

    /// Dispatcher verdicts for every window message pumped so far.
    pub fn outcomes(&self) -> Vec<(WindowMessage, Outcome)> {
        self.outcomes.borrow().clone()
    }
}

pub struct MockPump {
    lp: Rc<MockLoop>,
}

impl MessagePump for MockPump {
    fn pump(&self, wait: Option<Duration>) -> PumpStatus {
        let next = self.lp.deferred.borrow_mut().pop_front();
        if let Some(f) = next {
            f();
            return PumpStatus::Dispatched;
        }

        let item = match wait {
            Some(wait) => match self.lp.rx.recv_timeout(wait) {
                Ok(item) => item,
                Err(RecvTimeoutError::Timeout) => return PumpStatus::Idle,
                Err(RecvTimeoutError::Disconnected) => return PumpStatus::Quit,
            },
            None => match self.lp.rx.recv() {
                Ok(item) => item,
                Err(_) => return PumpStatus::Quit,
            },
        };

        match item {
            LoopItem::Wake => PumpStatus::Wake,
            LoopItem::Quit => PumpStatus::Quit,
            LoopItem::Message(handle, message) => {
                let outcome = self.lp.dispatcher.dispatch(handle, message);
                self.lp.outcomes.borrow_mut().push((message, outcome));
                PumpStatus::Dispatched
            }
        }
    }
}

pub struct MockWaker {
    tx: Sender<LoopItem>,
}

impl Waker for MockWaker {
    fn wake(&self) {
        let _ = self.tx.send(LoopItem::Wake);
    }

    fn quit(&self) {
        let _ = self.tx.send(LoopItem::Quit);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Show(ShowCommand),
    Focus,
    SetTitle(String),
    SetStyle(WindowStyle),
    SetPlacement(Placement),
    SetLayeredAlpha(u8),
    RegisterHotKey(i32, HotKey),
    UnregisterHotKey(i32),
    Destroy,
}

/// Observable state of a mock window, shared with the test.
pub struct WindowState {
    pub rect: Cell<Rect>,
    pub style: Cell<WindowStyle>,
    pub calls: RefCell<Vec<NativeCall>>,
    pub hotkeys: RefCell<HashSet<i32>>,
    /// Make the next hotkey registration fail as if another process owned it.
    pub deny_hotkeys: Cell<bool>,
}

impl WindowState {
    pub fn calls(&self) -> Vec<NativeCall> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: NativeCall) {
        self.calls.borrow_mut().push(call);
    }
}

pub struct MockWindow {
    handle: WindowHandle,
    state: Rc<WindowState>,
    tx: Sender<LoopItem>,
}

impl NativeWindow for MockWindow {
    fn handle(&self) -> WindowHandle {
        self.handle
    }

    fn show(&self, command: ShowCommand) {
        self.state.record(NativeCall::Show(command));
    }

    fn focus(&self) {
        self.state.record(NativeCall::Focus);
    }

    fn set_title(&self, title: &str) {
        self.state.record(NativeCall::SetTitle(title.to_string()));
    }

    fn window_rect(&self) -> Rect {
        self.state.rect.get()
    }

    fn client_rect(&self) -> Rect {
        let outer = self.state.rect.get().size();
        let size = if self.state.style.get().contains(WindowStyle::CAPTION) {
            Size::new(outer.width - FRAME.width, outer.height - FRAME.height)
        } else {
            outer
        };
        Rect::from_origin_size(Point::default(), size)
    }

    fn screen_size(&self) -> Size {
        SCREEN
    }

    fn style(&self) -> WindowStyle {
        self.state.style.get()
    }

    fn set_style(&self, style: WindowStyle) {
        self.state.style.set(style);
        self.state.record(NativeCall::SetStyle(style));
    }

    fn frame_size_for_client(&self, client: Size) -> Size {
        if self.state.style.get().contains(WindowStyle::CAPTION) {
            Size::new(client.width + FRAME.width, client.height + FRAME.height)
        } else {
            client
        }
    }

    fn set_placement(&self, placement: Placement) {
        let rect = self.state.rect.get();
        let origin = placement.position.unwrap_or(rect.origin());
        let size = placement.size.unwrap_or(rect.size());
        self.state.rect.set(Rect::from_origin_size(origin, size));
        self.state.record(NativeCall::SetPlacement(placement));
    }

    fn set_layered_alpha(&self, alpha: u8) {
        self.state.record(NativeCall::SetLayeredAlpha(alpha));
    }

    fn register_hotkey(&self, id: i32, hotkey: HotKey) -> Result<(), HotKeyError> {
        if self.state.deny_hotkeys.replace(false) {
            return Err(HotKeyError::Denied {
                hotkey: hotkey.to_string(),
                reason: "hot key is already registered".to_string(),
            });
        }
        self.state.hotkeys.borrow_mut().insert(id);
        self.state.record(NativeCall::RegisterHotKey(id, hotkey));
        Ok(())
    }

    fn unregister_hotkey(&self, id: i32) {
        self.state.hotkeys.borrow_mut().remove(&id);
        self.state.record(NativeCall::UnregisterHotKey(id));
    }

    fn destroy(&self) {
        self.state.record(NativeCall::Destroy);
        let _ = self.tx.send(LoopItem::Message(self.handle, WindowMessage::Destroy));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    CreateEnvironment(PathBuf),
    CreateController(WindowHandle),
    Subscribe,
    Navigate(String),
    NavigateToString(String),
    AddInitScript(String),
    ExecuteScript(String),
    SetBounds(Rect),
    NotifyParentMoved,
    MoveFocus,
    ApplySettings(EngineSettings),
    OpenDevTools,
    AddResourceFilter(String),
    PrintToPdf(PathBuf),
    Close,
}

pub struct MockEngine {
    lp: Rc<MockLoop>,
    calls: RefCell<Vec<EngineCall>>,
    events: RefCell<Option<Rc<EngineEvents>>>,
    environment_error: RefCell<Option<EngineError>>,
    controller_error: RefCell<Option<EngineError>>,
    start_error: RefCell<Option<EngineError>>,
    stalled: Cell<bool>,
}

impl MockEngine {
    pub fn new(lp: Rc<MockLoop>) -> Rc<Self> {
        Rc::new(Self {
            lp,
            calls: RefCell::new(Vec::new()),
            events: RefCell::new(None),
            environment_error: RefCell::new(None),
            controller_error: RefCell::new(None),
            start_error: RefCell::new(None),
            stalled: Cell::new(false),
        })
    }

    pub fn fail_environment(&self, error: EngineError) {
        self.environment_error.replace(Some(error));
    }

    pub fn fail_controller(&self, error: EngineError) {
        self.controller_error.replace(Some(error));
    }

    /// Refuse to even start environment creation.
    pub fn refuse_start(&self, error: EngineError) {
        self.start_error.replace(Some(error));
    }

    /// Never complete environment creation.
    pub fn stall(&self) {
        self.stalled.set(true);
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.borrow().clone()
    }

    pub fn init_scripts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::AddInitScript(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn evaluated(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                EngineCall::ExecuteScript(s) => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: EngineCall) {
        self.calls.borrow_mut().push(call);
    }

    fn events(&self) -> Option<Rc<EngineEvents>> {
        self.events.borrow().clone()
    }

    /// Deliver a page message. Returns whether anyone was subscribed.
    pub fn post_message(&self, message: &str) -> bool {
        match self.events() {
            Some(events) => {
                (events.message)(message);
                true
            }
            None => false,
        }
    }

    pub fn request_permission(&self, kind: PermissionKind) -> Option<PermissionState> {
        self.events().map(|events| (events.permission)(kind))
    }

    pub fn press_key(&self, key: AcceleratorKey) -> Option<bool> {
        self.events().map(|events| (events.accelerator)(&key))
    }

    pub fn request_resource(&self, request: ResourceRequest) -> bool {
        self.events()
            .map(|events| (events.resource)(&request))
            .is_some()
    }

    pub fn start_navigation(&self, url: &str) -> bool {
        self.events()
            .map(|events| (events.navigation_starting)(url))
            .is_some()
    }

    pub fn complete_navigation(&self, result: NavigationResult) -> bool {
        self.events()
            .map(|events| (events.navigation_completed)(&result))
            .is_some()
    }
}

impl BrowserEngine for MockEngine {
    fn create_environment(&self, data_dir: &Path, done: Completion) -> Result<(), EngineError> {
        self.record(EngineCall::CreateEnvironment(data_dir.to_path_buf()));
        if let Some(e) = self.start_error.borrow_mut().take() {
            return Err(e);
        }
        if !self.stalled.get() {
            let result = match self.environment_error.borrow_mut().take() {
                Some(e) => Err(e),
                None => Ok(()),
            };
            self.lp.defer(Box::new(move || done(result)));
        }
        Ok(())
    }

    fn create_controller(&self, window: WindowHandle, done: Completion) -> Result<(), EngineError> {
        self.record(EngineCall::CreateController(window));
        let result = match self.controller_error.borrow_mut().take() {
            Some(e) => Err(e),
            None => Ok(()),
        };
        self.lp.defer(Box::new(move || done(result)));
        Ok(())
    }

    fn subscribe(&self, events: EngineEvents) -> Result<(), EngineError> {
        self.record(EngineCall::Subscribe);
        self.events.replace(Some(Rc::new(events)));
        Ok(())
    }

    fn navigate(&self, url: &str) -> Result<(), EngineError> {
        self.record(EngineCall::Navigate(url.to_string()));
        Ok(())
    }

    fn navigate_to_string(&self, html: &str) -> Result<(), EngineError> {
        self.record(EngineCall::NavigateToString(html.to_string()));
        Ok(())
    }

    fn add_init_script(&self, script: &str) -> Result<(), EngineError> {
        self.record(EngineCall::AddInitScript(script.to_string()));
        Ok(())
    }

    fn execute_script(&self, script: &str) -> Result<(), EngineError> {
        self.record(EngineCall::ExecuteScript(script.to_string()));
        Ok(())
    }

    fn set_bounds(&self, bounds: Rect) -> Result<(), EngineError> {
        self.record(EngineCall::SetBounds(bounds));
        Ok(())
    }

    fn notify_parent_moved(&self) -> Result<(), EngineError> {
        self.record(EngineCall::NotifyParentMoved);
        Ok(())
    }

    fn move_focus(&self) -> Result<(), EngineError> {
        self.record(EngineCall::MoveFocus);
        Ok(())
    }

    fn apply_settings(&self, settings: &EngineSettings) -> Result<(), EngineError> {
        self.record(EngineCall::ApplySettings(*settings));
        Ok(())
    }

    fn open_devtools(&self) -> Result<(), EngineError> {
        self.record(EngineCall::OpenDevTools);
        Ok(())
    }

    fn add_resource_filter(&self, pattern: &str) -> Result<(), EngineError> {
        self.record(EngineCall::AddResourceFilter(pattern.to_string()));
        Ok(())
    }

    fn print_to_pdf(&self, path: &Path, done: Completion) -> Result<(), EngineError> {
        self.record(EngineCall::PrintToPdf(path.to_path_buf()));
        self.lp.defer(Box::new(move || done(Ok(()))));
        Ok(())
    }

    fn close(&self) {
        self.record(EngineCall::Close);
        self.events.replace(None);
    }
}

/// Hands out mock windows wired to one loop and one engine.
pub struct MockPlatform {
    pub lp: Rc<MockLoop>,
    pub engine: Rc<MockEngine>,
    pub window: Rc<WindowState>,
    registry: Arc<WindowRegistry>,
}

impl MockPlatform {
    pub fn new() -> Self {
        let registry = Arc::new(WindowRegistry::new());
        let lp = MockLoop::with_registry(registry.clone());
        let engine = MockEngine::new(lp.clone());
        let window = Rc::new(WindowState {
            rect: Cell::new(Rect::default()),
            style: Cell::new(WindowStyle::default()),
            calls: RefCell::new(Vec::new()),
            hotkeys: RefCell::new(HashSet::new()),
            deny_hotkeys: Cell::new(false),
        });
        Self {
            lp,
            engine,
            window,
            registry,
        }
    }

    pub fn registry(&self) -> Arc<WindowRegistry> {
        self.registry.clone()
    }

    /// Queue a window message as the OS would post it.
    pub fn post(&self, handle: WindowHandle, message: WindowMessage) {
        let _ = self.lp.sender().send(LoopItem::Message(handle, message));
    }
}

impl Platform for MockPlatform {
    fn create_window(&self, options: &WindowOptions) -> Result<NativeParts> {
        let style = options.style();
        self.window.style.set(style);

        let size = options.initial_size();
        let origin = if options.center {
            Point::new(
                (SCREEN.width - size.width) / 2,
                (SCREEN.height - size.height) / 2,
            )
        } else {
            Point::default()
        };
        self.window.rect.set(Rect::from_origin_size(origin, size));

        let handle = WindowHandle::new(NEXT_HANDLE.fetch_add(1, Ordering::SeqCst));
        Ok(NativeParts {
            window: Box::new(MockWindow {
                handle,
                state: self.window.clone(),
                tx: self.lp.sender(),
            }),
            pump: Box::new(self.lp.pump()),
            waker: self.lp.waker(),
            engine: self.engine.clone(),
        })
    }
}
