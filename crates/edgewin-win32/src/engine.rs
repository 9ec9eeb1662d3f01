//! WebView2 behind the `BrowserEngine` trait.

use std::cell::RefCell;
use std::ffi::c_void;
use std::path::Path;
use std::rc::Rc;

use edgewin_core::engine::{
    AcceleratorKey, BrowserEngine, Completion, EngineError, EngineEvents, EngineSettings,
    KeyEventKind, NavigationResult, ResourceRequest,
};
use edgewin_core::{PermissionKind, Rect, WindowHandle};
use tracing::debug;
use webview2_com::Microsoft::Web::WebView2::Win32::*;
use webview2_com::{
    AcceleratorKeyPressedEventHandler, CreateCoreWebView2ControllerCompletedHandler,
    CreateCoreWebView2EnvironmentCompletedHandler, NavigationCompletedEventHandler,
    NavigationStartingEventHandler, PermissionRequestedEventHandler, PrintToPdfCompletedHandler,
    WebMessageReceivedEventHandler, WebResourceRequestedEventHandler,
};
use windows::Win32::Foundation::{E_FAIL, E_POINTER, E_UNEXPECTED, RECT};
use windows::Win32::System::Com::CoTaskMemFree;
use windows::core::{HSTRING, Interface, PCWSTR, PWSTR};

use crate::window::hwnd;

fn engine_error(e: windows::core::Error) -> EngineError {
    EngineError::new(e.code().0, e.message().to_string())
}

/// Copy out a string the engine allocated and free it.
fn take_string(value: PWSTR) -> String {
    if value.is_null() {
        return String::new();
    }
    let text = unsafe { value.to_string() }.unwrap_or_default();
    unsafe { CoTaskMemFree(Some(value.0 as *const c_void)) };
    text
}

fn key_event_kind(kind: COREWEBVIEW2_KEY_EVENT_KIND) -> Option<KeyEventKind> {
    match kind {
        COREWEBVIEW2_KEY_EVENT_KIND_KEY_DOWN => Some(KeyEventKind::KeyDown),
        COREWEBVIEW2_KEY_EVENT_KIND_KEY_UP => Some(KeyEventKind::KeyUp),
        COREWEBVIEW2_KEY_EVENT_KIND_SYSTEM_KEY_DOWN => Some(KeyEventKind::SystemKeyDown),
        COREWEBVIEW2_KEY_EVENT_KIND_SYSTEM_KEY_UP => Some(KeyEventKind::SystemKeyUp),
        _ => None,
    }
}

#[derive(Default)]
struct Handles {
    environment: RefCell<Option<ICoreWebView2Environment>>,
    controller: RefCell<Option<ICoreWebView2Controller>>,
    webview: RefCell<Option<ICoreWebView2>>,
}

/// One WebView2 environment and controller pair.
#[derive(Default)]
pub struct WebView2Engine {
    handles: Rc<Handles>,
}

impl WebView2Engine {
    pub fn new() -> Self {
        Self::default()
    }

    fn controller(&self) -> Result<ICoreWebView2Controller, EngineError> {
        self.handles
            .controller
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::new(E_UNEXPECTED.0, "controller not created"))
    }

    fn webview(&self) -> Result<ICoreWebView2, EngineError> {
        self.handles
            .webview
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::new(E_UNEXPECTED.0, "controller not created"))
    }

    fn subscribe_webview(
        &self,
        webview: &ICoreWebView2,
        events: &Rc<EngineEvents>,
    ) -> windows::core::Result<()> {
        let mut token = 0i64;

        let on_message = events.clone();
        let handler = WebMessageReceivedEventHandler::create(Box::new(move |_, args| {
            if let Some(args) = args {
                let mut message = PWSTR::null();
                if unsafe { args.TryGetWebMessageAsString(&mut message) }.is_ok() {
                    (on_message.message)(&take_string(message));
                }
            }
            Ok(())
        }));
        unsafe { webview.add_WebMessageReceived(&handler, &mut token)? };

        let on_permission = events.clone();
        let handler = PermissionRequestedEventHandler::create(Box::new(move |_, args| {
            if let Some(args) = args {
                let mut kind = COREWEBVIEW2_PERMISSION_KIND::default();
                unsafe { args.PermissionKind(&mut kind)? };
                let state = (on_permission.permission)(PermissionKind::from_code(kind.0));
                unsafe { args.SetState(COREWEBVIEW2_PERMISSION_STATE(state.code()))? };
            }
            Ok(())
        }));
        unsafe { webview.add_PermissionRequested(&handler, &mut token)? };

        let on_resource = events.clone();
        let handler = WebResourceRequestedEventHandler::create(Box::new(move |_, args| {
            if let Some(args) = args {
                let request = unsafe { args.Request()? };
                let mut uri = PWSTR::null();
                let mut method = PWSTR::null();
                unsafe {
                    request.Uri(&mut uri)?;
                    request.Method(&mut method)?;
                }
                (on_resource.resource)(&ResourceRequest {
                    uri: take_string(uri),
                    method: take_string(method),
                });
            }
            Ok(())
        }));
        unsafe { webview.add_WebResourceRequested(&handler, &mut token)? };

        let on_starting = events.clone();
        let handler = NavigationStartingEventHandler::create(Box::new(move |_, args| {
            if let Some(args) = args {
                let mut uri = PWSTR::null();
                unsafe { args.Uri(&mut uri)? };
                (on_starting.navigation_starting)(&take_string(uri));
            }
            Ok(())
        }));
        unsafe { webview.add_NavigationStarting(&handler, &mut token)? };

        let on_completed = events.clone();
        let handler = NavigationCompletedEventHandler::create(Box::new(move |sender, args| {
            let mut success = Default::default();
            if let Some(args) = args {
                unsafe { args.IsSuccess(&mut success)? };
            }
            let mut result = NavigationResult {
                success: success.as_bool(),
                url: String::new(),
                title: String::new(),
            };
            if let Some(sender) = sender {
                let mut source = PWSTR::null();
                let mut title = PWSTR::null();
                unsafe {
                    sender.Source(&mut source)?;
                    sender.DocumentTitle(&mut title)?;
                }
                result.url = take_string(source);
                result.title = take_string(title);
            }
            (on_completed.navigation_completed)(&result);
            Ok(())
        }));
        unsafe { webview.add_NavigationCompleted(&handler, &mut token)? };

        Ok(())
    }

    fn subscribe_controller(
        &self,
        controller: &ICoreWebView2Controller,
        events: &Rc<EngineEvents>,
    ) -> windows::core::Result<()> {
        let mut token = 0i64;
        let on_key = events.clone();
        let handler = AcceleratorKeyPressedEventHandler::create(Box::new(move |_, args| {
            let Some(args) = args else {
                return Ok(());
            };
            let mut kind = COREWEBVIEW2_KEY_EVENT_KIND::default();
            let mut virtual_key = 0u32;
            let mut status = COREWEBVIEW2_PHYSICAL_KEY_STATUS::default();
            unsafe {
                args.KeyEventKind(&mut kind)?;
                args.VirtualKey(&mut virtual_key)?;
                args.PhysicalKeyStatus(&mut status)?;
            }
            let Some(kind) = key_event_kind(kind) else {
                return Ok(());
            };
            let key = AcceleratorKey {
                kind,
                virtual_key,
                was_key_down: status.WasKeyDown.as_bool(),
            };
            if (on_key.accelerator)(&key) {
                unsafe { args.SetHandled(true)? };
            }
            Ok(())
        }));
        unsafe { controller.add_AcceleratorKeyPressed(&handler, &mut token) }
    }
}

impl BrowserEngine for WebView2Engine {
    fn create_environment(&self, data_dir: &Path, done: Completion) -> Result<(), EngineError> {
        let handles = self.handles.clone();
        let handler = CreateCoreWebView2EnvironmentCompletedHandler::create(Box::new(
            move |result, environment| {
                let environment =
                    result.and_then(|()| environment.ok_or_else(|| E_POINTER.into()));
                match environment {
                    Ok(environment) => {
                        handles.environment.replace(Some(environment));
                        done(Ok(()));
                    }
                    Err(e) => done(Err(engine_error(e))),
                }
                Ok(())
            },
        ));

        let folder = HSTRING::from(data_dir.as_os_str());
        unsafe { CreateCoreWebView2EnvironmentWithOptions(PCWSTR::null(), &folder, None, &handler) }
            .map_err(engine_error)
    }

    fn create_controller(&self, window: WindowHandle, done: Completion) -> Result<(), EngineError> {
        let environment = self
            .handles
            .environment
            .borrow()
            .clone()
            .ok_or_else(|| EngineError::new(E_UNEXPECTED.0, "environment not created"))?;

        let handles = self.handles.clone();
        let handler = CreateCoreWebView2ControllerCompletedHandler::create(Box::new(
            move |result, controller| {
                let created = result
                    .and_then(|()| controller.ok_or_else(|| E_POINTER.into()))
                    .and_then(|controller| {
                        let webview = unsafe {
                            controller.SetIsVisible(true)?;
                            controller.CoreWebView2()?
                        };
                        Ok((controller, webview))
                    });
                match created {
                    Ok((controller, webview)) => {
                        handles.controller.replace(Some(controller));
                        handles.webview.replace(Some(webview));
                        done(Ok(()));
                    }
                    Err(e) => done(Err(engine_error(e))),
                }
                Ok(())
            },
        ));

        unsafe { environment.CreateCoreWebView2Controller(hwnd(window), &handler) }
            .map_err(engine_error)
    }

    fn subscribe(&self, events: EngineEvents) -> Result<(), EngineError> {
        let (webview, controller) = (self.webview()?, self.controller()?);
        let events = Rc::new(events);
        self.subscribe_webview(&webview, &events)
            .and_then(|()| self.subscribe_controller(&controller, &events))
            .map_err(engine_error)
    }

    fn navigate(&self, url: &str) -> Result<(), EngineError> {
        let url = HSTRING::from(url);
        unsafe { self.webview()?.Navigate(&url) }.map_err(engine_error)
    }

    fn navigate_to_string(&self, html: &str) -> Result<(), EngineError> {
        let html = HSTRING::from(html);
        unsafe { self.webview()?.NavigateToString(&html) }.map_err(engine_error)
    }

    fn add_init_script(&self, script: &str) -> Result<(), EngineError> {
        let script = HSTRING::from(script);
        unsafe { self.webview()?.AddScriptToExecuteOnDocumentCreated(&script, None) }
            .map_err(engine_error)
    }

    fn execute_script(&self, script: &str) -> Result<(), EngineError> {
        let script = HSTRING::from(script);
        unsafe { self.webview()?.ExecuteScript(&script, None) }.map_err(engine_error)
    }

    fn set_bounds(&self, bounds: Rect) -> Result<(), EngineError> {
        let rect = RECT {
            left: bounds.left,
            top: bounds.top,
            right: bounds.right,
            bottom: bounds.bottom,
        };
        unsafe { self.controller()?.SetBounds(rect) }.map_err(engine_error)
    }

    fn notify_parent_moved(&self) -> Result<(), EngineError> {
        unsafe { self.controller()?.NotifyParentWindowPositionChanged() }.map_err(engine_error)
    }

    fn move_focus(&self) -> Result<(), EngineError> {
        unsafe {
            self.controller()?
                .MoveFocus(COREWEBVIEW2_MOVE_FOCUS_REASON_PROGRAMMATIC)
        }
        .map_err(engine_error)
    }

    fn apply_settings(&self, settings: &EngineSettings) -> Result<(), EngineError> {
        let webview = self.webview()?;
        unsafe {
            let native = webview.Settings().map_err(engine_error)?;
            native
                .SetAreDevToolsEnabled(settings.dev_tools)
                .and_then(|()| native.SetAreDefaultContextMenusEnabled(settings.context_menus))
                .map_err(engine_error)
        }
    }

    fn open_devtools(&self) -> Result<(), EngineError> {
        unsafe { self.webview()?.OpenDevToolsWindow() }.map_err(engine_error)
    }

    fn add_resource_filter(&self, pattern: &str) -> Result<(), EngineError> {
        let pattern = HSTRING::from(pattern);
        unsafe {
            self.webview()?
                .AddWebResourceRequestedFilter(&pattern, COREWEBVIEW2_WEB_RESOURCE_CONTEXT_ALL)
        }
        .map_err(engine_error)
    }

    fn print_to_pdf(&self, path: &Path, done: Completion) -> Result<(), EngineError> {
        let webview: ICoreWebView2_7 = self.webview()?.cast().map_err(engine_error)?;
        let handler = PrintToPdfCompletedHandler::create(Box::new(move |result, success| {
            match result {
                Ok(()) if success => done(Ok(())),
                Ok(()) => done(Err(EngineError::new(E_FAIL.0, "printing to PDF failed"))),
                Err(e) => done(Err(engine_error(e))),
            }
            Ok(())
        }));
        let path = HSTRING::from(path.as_os_str());
        unsafe { webview.PrintToPdf(&path, None, &handler) }.map_err(engine_error)
    }

    fn close(&self) {
        self.handles.webview.replace(None);
        if let Some(controller) = self.handles.controller.replace(None) {
            if let Err(e) = unsafe { controller.Close() } {
                debug!("Controller close failed: {}", e);
            }
        }
        self.handles.environment.replace(None);
    }
}
