//! The window facade.
//!
//! [`WebView`] ties one native window to one engine session. It is cheap to
//! clone and may be shared across threads, but every operation touching the
//! window or the engine must run on the thread that created it; other
//! threads reach it through [`DispatchHandle`].

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::bridge::{Binding, ControlMessage, Inbound, ScriptBridge, binding_stub};
use crate::browser::{BrowserAdapter, BrowserEvents, SessionState};
use crate::config::{WebViewOptions, WindowOptions};
use crate::dispatcher::WindowOwner;
use crate::engine::{EngineError, EngineSettings, NavigationResult, ResourceRequest};
use crate::error::{Error, Result};
use crate::handle::{Point, Rect, Size, WindowHandle};
use crate::hook::{HookChain, HookId, HookKind, JsHook};
use crate::hotkey::{HotKey, HotKeyTable};
use crate::message::{HitRegion, SizeConstraints};
use crate::native::{
    MessagePump, NativeWindow, Placement, Platform, PumpStatus, ShowCommand, Waker, WindowStyle,
    ZOrder,
};
use crate::permission::{PermissionKind, PermissionPolicy, PermissionState};
use crate::queue::DispatchQueue;
use crate::registry::WindowRegistry;
use crate::thread::ThreadBound;

/// Installed in every document: lets page script ask the host to navigate.
const BASE_SCRIPT: &str = r#"window.webview2 = {
    navigate: function(url) {
        window.chrome.webview.postMessage(JSON.stringify({ type: 'navigate', url: url }));
    }
};"#;

const CLEAR_CACHE_SCRIPT: &str = r#"if (window.caches) {
    caches.keys().then(function(keys) {
        return Promise.all(keys.map(function(key) { return caches.delete(key); }));
    });
}
localStorage.clear();
sessionStorage.clear();"#;

const CLEAR_COOKIES_SCRIPT: &str = r#"document.cookie.split(";").forEach(function(c) {
    document.cookie = c.replace(/^ +/, "")
        .replace(/=.*/, "=;expires=" + new Date().toUTCString() + ";path=/");
});"#;

/// How `set_size` interprets its dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeHint {
    /// Resize the client area; the user may resize afterwards.
    #[default]
    None,
    /// Resize the client area and lock it.
    Fixed,
    /// Smallest size the user may drag to.
    Min,
    /// Largest size the user may drag to.
    Max,
}

/// Loading state of the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageState {
    pub loading: bool,
    pub url: String,
    pub title: String,
}

pub type HotKeyHandler = Arc<dyn Fn(&WebView) + Send + Sync>;
type FlagListener = Arc<dyn Fn(bool) + Send + Sync>;
type TextListener = Arc<dyn Fn(&str) + Send + Sync>;
type AcceleratorHandler = Arc<dyn Fn(u32) -> bool + Send + Sync>;
type ResourceObserver = Arc<dyn Fn(&ResourceRequest) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    loading: Vec<FlagListener>,
    url: Vec<TextListener>,
    title: Vec<TextListener>,
    fullscreen: Vec<FlagListener>,
    accelerator: Option<AcceleratorHandler>,
    resource: Option<ResourceObserver>,
}

/// Window geometry saved when entering fullscreen.
#[derive(Debug, Clone, Copy)]
struct SavedFrame {
    rect: Rect,
    style: WindowStyle,
}

#[derive(Debug)]
struct FrameState {
    constraints: SizeConstraints,
    fullscreen: Option<SavedFrame>,
    always_on_top: bool,
    opacity: f64,
    custom_hit_test: bool,
}

struct Inner {
    this: Weak<Inner>,
    handle: WindowHandle,
    ui_thread: ThreadId,
    native: ThreadBound<Box<dyn NativeWindow>>,
    pump: ThreadBound<Box<dyn MessagePump>>,
    browser: ThreadBound<BrowserAdapter>,
    waker: Arc<dyn Waker>,
    registry: Arc<WindowRegistry>,
    queue: Arc<DispatchQueue<WebView>>,
    permissions: Arc<PermissionPolicy>,
    bridge: ScriptBridge,
    hooks: HookChain,
    hotkeys: Mutex<HotKeyTable<HotKeyHandler>>,
    frame: Mutex<FrameState>,
    page: Mutex<PageState>,
    listeners: Mutex<Listeners>,
    auto_focus: bool,
    hide_on_close: bool,
    destroyed: AtomicBool,
}

impl Inner {
    fn view(&self) -> Option<WebView> {
        self.this.upgrade().map(|inner| WebView { inner })
    }

    fn native(&self) -> Result<&dyn NativeWindow> {
        Ok(&**self.native.get()?)
    }

    fn browser(&self) -> Result<&BrowserAdapter> {
        self.browser.get()
    }

    /// Stretch the browser over the whole client area.
    fn fit_browser(&self) -> Result<()> {
        let bounds = self.native()?.client_rect();
        self.browser()?.resize(bounds)
    }

    fn drain(&self) {
        if let Some(view) = self.view() {
            let ran = self.queue.drain(&view);
            if ran > 0 {
                debug!("Ran {} dispatched jobs", ran);
            }
        }
    }

    fn reply(&self, script: String) {
        self.queue.dispatch(Box::new(move |view: &WebView| {
            let sent = view.inner.browser().and_then(|b| b.eval_after_ready(&script));
            if let Err(e) = sent {
                warn!("Failed to deliver bridge reply: {}", e);
            }
        }));
    }

    fn update_page<F>(&self, update: F)
    where
        F: FnOnce(&mut PageState),
    {
        let (before, after) = {
            let mut page = self.page.lock();
            let before = page.clone();
            update(&mut page);
            (before, page.clone())
        };
        if before == after {
            return;
        }

        let (loading, url, title) = {
            let listeners = self.listeners.lock();
            (
                listeners.loading.clone(),
                listeners.url.clone(),
                listeners.title.clone(),
            )
        };
        if before.loading != after.loading {
            loading.iter().for_each(|f| f(after.loading));
        }
        if before.url != after.url {
            url.iter().for_each(|f| f(&after.url));
        }
        if before.title != after.title {
            title.iter().for_each(|f| f(&after.title));
        }
    }

    fn notify_fullscreen(&self, fullscreen: bool) {
        let listeners = self.listeners.lock().fullscreen.clone();
        listeners.iter().for_each(|f| f(fullscreen));
    }

    fn release_hotkeys(&self) {
        let released = match self.native() {
            Ok(native) => self
                .hotkeys
                .lock()
                .clear(|id| native.unregister_hotkey(id)),
            Err(_) => self.hotkeys.lock().clear(|_| {}),
        };
        if released > 0 {
            debug!("Released {} hotkeys", released);
        }
    }
}

impl WindowOwner for Inner {
    fn on_move(&self) {
        if let Err(e) = self.browser().and_then(|b| b.notify_moved()) {
            warn!("Failed to reposition browser: {}", e);
        }
    }

    fn on_size(&self) {
        if let Err(e) = self.fit_browser() {
            warn!("Failed to resize browser: {}", e);
        }
    }

    fn on_activate(&self) {
        if self.auto_focus {
            if let Err(e) = self.browser().and_then(|b| b.focus()) {
                debug!("Focus on activate failed: {}", e);
            }
        }
    }

    fn on_close(&self) {
        let Ok(native) = self.native() else {
            return;
        };
        if self.hide_on_close {
            native.show(ShowCommand::Hide);
        } else if !self.destroyed.swap(true, Ordering::SeqCst) {
            native.destroy();
        }
    }

    fn on_destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        self.hotkeys.lock().clear(|_| {});
        info!("{} destroyed", self.handle);
        self.waker.quit();
    }

    fn on_frame_button_down(&self, _hit: HitRegion) {
        if let Ok(native) = self.native() {
            native.focus();
        }
    }

    fn size_constraints(&self) -> SizeConstraints {
        self.frame.lock().constraints
    }

    fn hit_test_frame(&self) -> Option<Rect> {
        {
            let frame = self.frame.lock();
            if !frame.custom_hit_test || frame.fullscreen.is_some() {
                return None;
            }
        }
        self.native().ok().map(|native| native.window_rect())
    }

    fn on_wake(&self) {
        self.drain();
    }

    fn on_hotkey(&self, id: i32) -> bool {
        let handler = self.hotkeys.lock().handler(id).cloned();
        match (handler, self.view()) {
            (Some(handler), Some(view)) => {
                handler(&view);
                true
            }
            _ => false,
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.registry.unregister(self.handle);
        self.queue.close();
        if let Ok(browser) = self.browser.get() {
            browser.close();
        }
        if !self.destroyed.load(Ordering::SeqCst) {
            if let Ok(native) = self.native.get() {
                native.destroy();
            }
        }
    }
}

/// Routes engine events to the facade without keeping it alive.
struct FacadeEvents {
    inner: Weak<Inner>,
}

impl BrowserEvents for FacadeEvents {
    fn message_received(&self, message: &str) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        match Inbound::parse(message) {
            Ok(Inbound::Rpc(call)) => {
                let reply = inner.bridge.invoke(call);
                inner.reply(reply.script());
            }
            Ok(Inbound::Control(ControlMessage::Navigate { url })) => {
                if let Err(e) = inner.browser().and_then(|b| b.navigate(&url)) {
                    warn!("Page-requested navigation to {} failed: {}", url, e);
                }
            }
            Ok(Inbound::Control(ControlMessage::StateChange {
                loading,
                url,
                title,
            })) => inner.update_page(|page| {
                page.loading = loading;
                page.url = url;
                page.title = title;
            }),
            Err(e) => warn!("Ignoring page message: {}", e),
        }
    }

    fn resource_requested(&self, request: &ResourceRequest) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let observer = inner.listeners.lock().resource.clone();
        if let Some(observer) = observer {
            observer(request);
        }
    }

    fn accelerator_key(&self, virtual_key: u32) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let handler = inner.listeners.lock().accelerator.clone();
        handler.is_some_and(|handler| handler(virtual_key))
    }

    fn navigation_starting(&self, url: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.update_page(|page| {
                page.loading = true;
                page.url = url.to_string();
            });
        }
    }

    fn navigation_completed(&self, result: &NavigationResult) {
        debug!("Navigation completed: {}", result);
        if let Some(inner) = self.inner.upgrade() {
            inner.update_page(|page| {
                page.loading = false;
                page.url = result.url.clone();
                page.title = result.title.clone();
            });
        }
    }
}

/// A native window hosting an embedded browser.
#[derive(Clone)]
pub struct WebView {
    inner: Arc<Inner>,
}

impl WebView {
    /// Create a window, embed the engine and wait for it to become ready.
    pub fn new(platform: &dyn Platform, options: WebViewOptions) -> Result<Self> {
        Self::with_registry(platform, options, WindowRegistry::global())
    }

    /// Like `new`, registering the window in `registry` instead of the
    /// process-wide one.
    pub fn with_registry(
        platform: &dyn Platform,
        options: WebViewOptions,
        registry: Arc<WindowRegistry>,
    ) -> Result<Self> {
        let parts = platform.create_window(&options.window)?;
        let handle = parts.window.handle();
        let permissions = Arc::new(PermissionPolicy::with_defaults());
        let queue = Arc::new(DispatchQueue::new(parts.waker.clone()));
        let window = &options.window;

        let inner = Arc::new_cyclic(|this: &Weak<Inner>| {
            let events = std::rc::Rc::new(FacadeEvents { inner: this.clone() });
            let browser = BrowserAdapter::new(parts.engine, events, permissions.clone());
            Inner {
                this: this.clone(),
                handle,
                ui_thread: thread::current().id(),
                native: ThreadBound::new(parts.window),
                pump: ThreadBound::new(parts.pump),
                browser: ThreadBound::new(browser),
                waker: parts.waker,
                registry: registry.clone(),
                queue,
                permissions,
                bridge: ScriptBridge::new(),
                hooks: HookChain::new(),
                hotkeys: Mutex::new(HotKeyTable::new()),
                frame: Mutex::new(FrameState {
                    constraints: SizeConstraints::default(),
                    fullscreen: None,
                    always_on_top: false,
                    opacity: 1.0,
                    custom_hit_test: window.frameless,
                }),
                page: Mutex::new(PageState::default()),
                listeners: Mutex::new(Listeners::default()),
                auto_focus: options.auto_focus,
                hide_on_close: window.hide_on_close,
                destroyed: AtomicBool::new(false),
            }
        });
        let owner: Weak<dyn WindowOwner> = Arc::<Inner>::downgrade(&inner);
        registry.register(handle, owner);

        let view = WebView { inner };
        info!("Created {} ({:?})", handle, window.title);
        view.set_opacity(window.opacity)?;
        {
            let native = view.inner.native()?;
            native.show(ShowCommand::Show);
            native.focus();
        }

        let browser = view.inner.browser()?;
        browser.set_settings(EngineSettings {
            dev_tools: options.debug,
            context_menus: options.debug && !window.disable_context_menu,
        })?;
        browser.embed(
            handle,
            &options.data_dir(),
            &**view.inner.pump.get()?,
            options.init_timeout(),
        )?;
        view.inner.fit_browser()?;
        browser.init(BASE_SCRIPT)?;

        view.apply_window_options(window)?;
        view.inner.queue.rewake_if_pending();
        Ok(view)
    }

    fn apply_window_options(&self, window: &WindowOptions) -> Result<()> {
        if let Some(background) = &window.default_background {
            let color = serde_json::Value::String(background.clone());
            self.eval(&format!(
                "document.documentElement.style.background = {color}; \
                 if (document.body) document.body.style.background = {color};"
            ))?;
        }
        if window.fullscreen {
            self.set_fullscreen(true)?;
        }
        if window.always_on_top {
            self.set_always_on_top(true)?;
        }
        if window.maximizable && window.maximized {
            self.maximize()?;
        } else if window.minimizable && window.minimized {
            self.minimize()?;
        }
        Ok(())
    }

    pub fn handle(&self) -> WindowHandle {
        self.inner.handle
    }

    pub fn session_state(&self) -> Result<SessionState> {
        Ok(self.inner.browser()?.state())
    }

    /// Pump messages until the loop is told to quit.
    pub fn run(&self) -> Result<()> {
        let pump = self.inner.pump.get()?;
        loop {
            match pump.pump(None) {
                PumpStatus::Quit => break,
                PumpStatus::Wake => self.inner.drain(),
                PumpStatus::Dispatched | PumpStatus::Idle => {}
            }
        }
        let dropped = self.inner.queue.close();
        info!("Message loop for {} exited ({} jobs dropped)", self.inner.handle, dropped);
        Ok(())
    }

    /// Pump a single message, waiting at most `wait`. Returns `false` once
    /// the loop has been told to quit.
    pub fn run_once(&self, wait: Option<Duration>) -> Result<bool> {
        match self.inner.pump.get()?.pump(wait) {
            PumpStatus::Quit => {
                self.inner.queue.close();
                Ok(false)
            }
            PumpStatus::Wake => {
                self.inner.drain();
                Ok(true)
            }
            PumpStatus::Dispatched | PumpStatus::Idle => Ok(true),
        }
    }

    /// Ask the message loop to exit. Callable from any thread.
    pub fn terminate(&self) {
        self.inner.waker.quit();
    }

    /// Tear the window down: release hotkeys, bindings and hooks, close the
    /// engine and destroy the native window.
    pub fn destroy(&self) -> Result<()> {
        let native = self.inner.native()?;
        self.inner.release_hotkeys();
        self.inner.bridge.clear();
        self.inner.hooks.clear();
        self.inner.browser()?.close();
        if !self.inner.destroyed.swap(true, Ordering::SeqCst) {
            native.destroy();
        }
        Ok(())
    }

    /// Queue `f` to run on the UI thread. Callable from any thread.
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce(&WebView) + Send + 'static,
    {
        self.inner.queue.dispatch(Box::new(f));
    }

    pub fn dispatch_handle(&self) -> DispatchHandle {
        DispatchHandle {
            queue: self.inner.queue.clone(),
            waker: self.inner.waker.clone(),
            ui_thread: self.inner.ui_thread,
            view: Arc::downgrade(&self.inner),
        }
    }

    pub fn navigate(&self, url: &str) -> Result<()> {
        self.inner.browser()?.navigate(url)
    }

    pub fn set_html(&self, html: &str) -> Result<()> {
        self.inner.browser()?.set_html(html)
    }

    /// Add a script that runs before every future document loads.
    pub fn init(&self, script: &str) -> Result<()> {
        self.inner.browser()?.init(script)
    }

    /// Evaluate a script in the current document.
    ///
    /// Before-hooks rewrite the script first. After-hooks then see the
    /// evaluated script; if they return something different, that is
    /// evaluated too.
    pub fn eval(&self, script: &str) -> Result<()> {
        let browser = self.inner.browser()?;
        let script = self.inner.hooks.apply(HookKind::Before, script);
        browser.eval(&script)?;

        let follow_up = self.inner.hooks.apply(HookKind::After, &script);
        if follow_up != script {
            browser.eval(&follow_up)?;
        }
        Ok(())
    }

    /// Expose a host function to page script as `window[name]`.
    pub fn bind(&self, name: &str, binding: Binding) -> Result<()> {
        let browser = self.inner.browser()?;
        if self.inner.bridge.bind(name, binding) {
            debug!("Replaced binding {}", name);
            return Ok(());
        }
        browser.init(&binding_stub(name))?;
        browser.eval(&binding_stub(name))
    }

    /// Remove a binding. Returns whether it existed.
    pub fn unbind(&self, name: &str) -> Result<bool> {
        let browser = self.inner.browser()?;
        if !self.inner.bridge.unbind(name) {
            return Ok(false);
        }
        let name = serde_json::Value::String(name.to_string());
        browser.eval(&format!("delete window[{name}]"))?;
        Ok(true)
    }

    pub fn add_hook(&self, hook: Arc<dyn JsHook>) -> HookId {
        self.inner.hooks.add(hook)
    }

    pub fn remove_hook(&self, id: HookId) -> bool {
        self.inner.hooks.remove(id)
    }

    pub fn clear_hooks(&self) {
        self.inner.hooks.clear();
    }

    pub fn set_permission(&self, kind: PermissionKind, state: PermissionState) {
        self.inner.permissions.set(kind, state);
    }

    pub fn set_global_permission(&self, state: Option<PermissionState>) {
        self.inner.permissions.set_global(state);
    }

    /// Register a global hotkey such as `"Ctrl+Alt+Q"`. Returns its id.
    pub fn register_hotkey<F>(&self, combination: &str, handler: F) -> Result<i32>
    where
        F: Fn(&WebView) + Send + Sync + 'static,
    {
        let hotkey = HotKey::parse(combination)?;
        self.register_hotkey_code(hotkey, handler)
    }

    pub fn register_hotkey_code<F>(&self, hotkey: HotKey, handler: F) -> Result<i32>
    where
        F: Fn(&WebView) + Send + Sync + 'static,
    {
        let native = self.inner.native()?;
        let id = self.inner.hotkeys.lock().register(
            hotkey,
            Arc::new(handler),
            |id, hotkey| native.register_hotkey(id, hotkey),
        )?;
        Ok(id)
    }

    /// Unregister the exact combination. Returns whether it was registered.
    pub fn unregister_hotkey(&self, combination: &str) -> Result<bool> {
        let hotkey = HotKey::parse(combination)?;
        let id = self.inner.hotkeys.lock().find(&hotkey);
        match id {
            Some(id) => self.unregister_hotkey_id(id),
            None => Ok(false),
        }
    }

    pub fn unregister_hotkey_id(&self, id: i32) -> Result<bool> {
        let native = self.inner.native()?;
        let removed = self
            .inner
            .hotkeys
            .lock()
            .unregister(id, |id| native.unregister_hotkey(id));
        Ok(removed.is_some())
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.inner.native()?.set_title(title);
        Ok(())
    }

    /// Resize or constrain the window according to `hint`.
    pub fn set_size(&self, width: i32, height: i32, hint: SizeHint) -> Result<()> {
        let native = self.inner.native()?;
        let size = Size::new(width, height);

        let mut style = native.style();
        if !style.contains(WindowStyle::POPUP) {
            let resizable = WindowStyle::THICK_FRAME | WindowStyle::MAXIMIZE_BOX;
            if hint == SizeHint::Fixed {
                style.remove(resizable);
            } else {
                style.insert(resizable);
            }
            native.set_style(style);
        }

        match hint {
            SizeHint::Min => self.inner.frame.lock().constraints.min = size,
            SizeHint::Max => self.inner.frame.lock().constraints.max = size,
            SizeHint::None | SizeHint::Fixed => {
                let outer = native.frame_size_for_client(size);
                native.set_placement(Placement::resize(outer).with_frame_changed());
                self.inner.fit_browser()?;
            }
        }
        Ok(())
    }

    pub fn minimize(&self) -> Result<()> {
        self.inner.native()?.show(ShowCommand::Minimize);
        Ok(())
    }

    pub fn maximize(&self) -> Result<()> {
        self.inner.native()?.show(ShowCommand::Maximize);
        Ok(())
    }

    pub fn restore(&self) -> Result<()> {
        self.inner.native()?.show(ShowCommand::Restore);
        Ok(())
    }

    pub fn set_minimized(&self, minimized: bool) -> Result<()> {
        if minimized { self.minimize() } else { self.restore() }
    }

    pub fn set_maximized(&self, maximized: bool) -> Result<()> {
        if maximized { self.maximize() } else { self.restore() }
    }

    /// Center the window on the primary screen.
    pub fn center(&self) -> Result<()> {
        let native = self.inner.native()?;
        let origin = native.window_rect().centered_on(native.screen_size());
        native.set_placement(Placement::move_to(origin));
        Ok(())
    }

    /// Set window opacity, clamped to `0.0..=1.0`.
    pub fn set_opacity(&self, opacity: f64) -> Result<()> {
        let opacity = if opacity.is_nan() { 1.0 } else { opacity.clamp(0.0, 1.0) };
        let alpha = (opacity * 255.0).round() as u8;
        self.inner.native()?.set_layered_alpha(alpha);
        self.inner.frame.lock().opacity = opacity;
        Ok(())
    }

    pub fn opacity(&self) -> f64 {
        self.inner.frame.lock().opacity
    }

    pub fn set_always_on_top(&self, enable: bool) -> Result<()> {
        let z_order = if enable { ZOrder::TopMost } else { ZOrder::NoTopMost };
        self.inner.native()?.set_placement(Placement::reorder(z_order));
        self.inner.frame.lock().always_on_top = enable;
        Ok(())
    }

    pub fn is_always_on_top(&self) -> bool {
        self.inner.frame.lock().always_on_top
    }

    /// Cover the screen without a frame, or go back to the saved bounds and
    /// style.
    pub fn set_fullscreen(&self, enable: bool) -> Result<()> {
        let native = self.inner.native()?;
        let saved = self.inner.frame.lock().fullscreen;

        match (enable, saved) {
            (true, None) => {
                let style = native.style();
                let saved = SavedFrame {
                    rect: native.window_rect(),
                    style,
                };
                let mut bare = style;
                bare.remove(WindowStyle::OVERLAPPED_WINDOW);
                native.set_style(bare);

                let screen = Rect::from_origin_size(Point::default(), native.screen_size());
                native.set_placement(
                    Placement::bounds(screen)
                        .with_z_order(ZOrder::Top)
                        .with_frame_changed(),
                );
                self.inner.frame.lock().fullscreen = Some(saved);
            }
            (false, Some(saved)) => {
                native.set_style(saved.style);
                native.set_placement(
                    Placement::bounds(saved.rect)
                        .with_z_order(ZOrder::Top)
                        .with_frame_changed(),
                );
                self.inner.frame.lock().fullscreen = None;
            }
            _ => return Ok(()),
        }

        self.inner.fit_browser()?;
        self.inner.notify_fullscreen(enable);
        Ok(())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.inner.frame.lock().fullscreen.is_some()
    }

    /// Treat the window body as caption and its edges as resize borders.
    /// On by default for frameless windows.
    pub fn set_custom_hit_test(&self, enable: bool) {
        self.inner.frame.lock().custom_hit_test = enable;
    }

    pub fn reload(&self) -> Result<()> {
        self.eval("window.location.reload();")
    }

    pub fn back(&self) -> Result<()> {
        self.eval("window.history.back();")
    }

    pub fn forward(&self) -> Result<()> {
        self.eval("window.history.forward();")
    }

    pub fn stop(&self) -> Result<()> {
        self.eval("window.stop();")
    }

    /// Open the print dialog.
    pub fn print(&self) -> Result<()> {
        self.eval("window.print();")
    }

    /// Clear Cache Storage plus local and session storage.
    pub fn clear_cache(&self) -> Result<()> {
        self.eval(CLEAR_CACHE_SCRIPT)
    }

    /// Expire every cookie visible to the page.
    pub fn clear_cookies(&self) -> Result<()> {
        self.eval(CLEAR_COOKIES_SCRIPT)
    }

    pub fn open_devtools(&self) -> Result<()> {
        self.inner.browser()?.open_devtools()
    }

    pub fn set_context_menu_enabled(&self, enabled: bool) -> Result<()> {
        let browser = self.inner.browser()?;
        browser.set_settings(EngineSettings {
            context_menus: enabled,
            ..browser.settings()
        })
    }

    /// Print the page to a PDF; `done` runs on the UI thread when finished.
    pub fn print_to_pdf<F>(&self, path: &Path, done: F) -> Result<()>
    where
        F: FnOnce(std::result::Result<(), EngineError>) + 'static,
    {
        self.inner.browser()?.print_to_pdf(path, Box::new(done))
    }

    pub fn page_state(&self) -> PageState {
        self.inner.page.lock().clone()
    }

    pub fn on_loading_state_changed<F>(&self, f: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().loading.push(Arc::new(f));
    }

    pub fn on_url_changed<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().url.push(Arc::new(f));
    }

    pub fn on_title_changed<F>(&self, f: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().title.push(Arc::new(f));
    }

    pub fn on_fullscreen_changed<F>(&self, f: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().fullscreen.push(Arc::new(f));
    }

    /// Offer first presses of keys to `f` before the page sees them; return
    /// `true` to swallow the key.
    pub fn on_accelerator_key<F>(&self, f: F)
    where
        F: Fn(u32) -> bool + Send + Sync + 'static,
    {
        self.inner.listeners.lock().accelerator = Some(Arc::new(f));
    }

    /// Report requests whose URI matches `pattern` (`*` wildcards).
    pub fn add_web_resource_filter(&self, pattern: &str) -> Result<()> {
        self.inner.browser()?.add_resource_filter(pattern)
    }

    pub fn on_web_resource_requested<F>(&self, f: F)
    where
        F: Fn(&ResourceRequest) + Send + Sync + 'static,
    {
        self.inner.listeners.lock().resource = Some(Arc::new(f));
    }
}

/// A `Send` handle for scheduling work on a window's UI thread.
#[derive(Clone)]
pub struct DispatchHandle {
    queue: Arc<DispatchQueue<WebView>>,
    waker: Arc<dyn Waker>,
    ui_thread: ThreadId,
    view: Weak<Inner>,
}

impl DispatchHandle {
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce(&WebView) + Send + 'static,
    {
        self.queue.dispatch(Box::new(f));
    }

    /// Run `f` on the UI thread and wait for its result.
    ///
    /// On the UI thread itself `f` runs immediately. Fails with
    /// `LoopExited` if the loop has exited or the window goes away before
    /// `f` could run.
    pub fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&WebView) -> R + Send + 'static,
        R: Send + 'static,
    {
        if thread::current().id() == self.ui_thread {
            let inner = self.view.upgrade().ok_or(Error::LoopExited)?;
            return Ok(f(&WebView { inner }));
        }

        let (tx, rx) = crossbeam_channel::bounded(1);
        self.dispatch(move |view| {
            let _ = tx.send(f(view));
        });
        rx.recv().map_err(|_| Error::LoopExited)
    }

    pub fn terminate(&self) {
        self.waker.quit();
    }
}
