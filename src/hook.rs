//! Window-procedure hook and `WM_INPUT` routing.
//!
//! [`MessageHook`] subclasses one window. It is a two-state machine:
//!
//! ```text
//!   Unhooked --hook(window)--> Hooked{window, previous, installed} --unhook()--> Unhooked
//! ```
//!
//! While hooked, every message for the window reaches the routing sink first:
//!
//! 1. `WM_INPUT`: fetch the payload, resolve the device handle through [`DeviceRoutes`],
//!    decode it and hand a [`RawInputEvent`] to the listeners. The message is then always
//!    forwarded to the previous procedure (which lets the OS release the input).
//! 2. Legacy mouse messages while mouse exclusivity is on: swallowed (returns 0).
//! 3. Everything else: forwarded unchanged.
//!
//! Handles that resolve to no identity are dropped without error. Fetch and decode
//! failures are logged; they never stop the message from being forwarded.
//!
//! Unhooking only restores the previous procedure when the window still points at ours.
//! If something subclassed the window after us, our entry point stays in its chain and
//! keeps forwarding to our previous procedure.

use crate::api::{MessageSink, RawInputApi, WindowMessage, WindowProcApi};
use crate::buffer::query_sized;
use crate::device::{DeviceClass, DeviceIdentity, RawInputHandle, WindowHandle, WndProcPtr};
use crate::error::{Error, Result};
use crate::event::RawInputEvent;
use crate::eventbus::{EventFilter, InputEventBus, InputListener};
use crate::exclusivity::ExclusivityController;
use crate::native::{self, is_legacy_mouse_message, WM_INPUT};
use crate::registration::{Interest, RegistrationManager};
use crate::routes::DeviceRoutes;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Procedure chain of a hooked window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookState {
    pub window: WindowHandle,
    /// Procedure that was installed before ours. Set once per hook.
    pub previous: WndProcPtr,
    /// Our entry point, as installed.
    pub installed: WndProcPtr,
}

struct Router<A> {
    api: Rc<A>,
    routes: DeviceRoutes,
    exclusivity: Arc<ExclusivityController>,
    bus: RefCell<InputEventBus>,
    state: Cell<Option<HookState>>,
}

impl<A: RawInputApi> Router<A> {
    fn route_input(&self, msg: &WindowMessage) -> Result<()> {
        let input = RawInputHandle(msg.lparam);
        let api = &*self.api;
        let bytes: Vec<u8> = query_sized(
            "GetRawInputData",
            || api.input_len(input),
            |buf| api.read_input(input, buf),
        )?;

        let header = native::parse_header(&bytes)?;
        let Some(class) = DeviceClass::from_raw(header.kind) else {
            trace!(kind = header.kind, "unknown raw input type");
            return Ok(());
        };
        let Some(identity) = self.routes.resolve(header.device, class) else {
            trace!(device = %header.device, %class, "unrouted device, dropped");
            return Ok(());
        };
        let Some(payload) = native::parse_payload(&header, &bytes)? else {
            return Ok(());
        };

        let event = RawInputEvent {
            identity,
            device: header.device,
            class,
            payload,
        };
        trace!(device = %header.device, %identity, %class, "routing input");

        match self.bus.try_borrow_mut() {
            Ok(mut bus) => bus.emit(&event),
            Err(_) => warn!(device = %header.device, "input arrived inside a listener, dropped"),
        }
        Ok(())
    }
}

impl<A: RawInputApi + WindowProcApi> MessageSink for Router<A> {
    fn dispatch(&self, msg: &WindowMessage) -> isize {
        let Some(state) = self.state.get() else {
            return 0;
        };

        if msg.msg == WM_INPUT && msg.window == state.window {
            if let Err(e) = self.route_input(msg) {
                warn!(window = %msg.window, error = %e, "failed to read WM_INPUT");
            }
            return self.api.call_window_proc(state.previous, msg);
        }

        if is_legacy_mouse_message(msg.msg) && self.exclusivity.is_mouse_exclusive() {
            trace!(msg = msg.msg, "legacy mouse message swallowed");
            return 0;
        }

        self.api.call_window_proc(state.previous, msg)
    }
}

/// Subclasses one window and routes its `WM_INPUT` to listeners.
pub struct MessageHook<A: RawInputApi + WindowProcApi + 'static> {
    router: Rc<Router<A>>,
    registrations: RegistrationManager<A>,
    interests: Vec<Interest>,
    background: bool,
}

impl<A: RawInputApi + WindowProcApi + 'static> MessageHook<A> {
    /// A hook registering the standard device set with input-sink semantics.
    pub fn new(api: Rc<A>, routes: DeviceRoutes, exclusivity: Arc<ExclusivityController>) -> Self {
        Self {
            registrations: RegistrationManager::new(api.clone(), exclusivity.clone()),
            router: Rc::new(Router {
                api,
                routes,
                exclusivity,
                bus: RefCell::new(InputEventBus::new()),
                state: Cell::new(None),
            }),
            interests: Interest::STANDARD.to_vec(),
            background: true,
        }
    }

    /// Replace the device set registered on hook (and removed on unhook).
    pub fn with_interests(mut self, interests: Vec<Interest>, background: bool) -> Self {
        self.interests = interests;
        self.background = background;
        self
    }

    pub fn state(&self) -> Option<HookState> {
        self.router.state.get()
    }

    pub fn is_hooked(&self) -> bool {
        self.state().is_some()
    }

    pub fn registrations(&self) -> &RegistrationManager<A> {
        &self.registrations
    }

    pub fn routes(&self) -> &DeviceRoutes {
        &self.router.routes
    }

    /// Registers a listener. Fails when called from inside a listener.
    pub fn add_listener(
        &self,
        listener: impl InputListener + 'static,
        filter: EventFilter,
        device: Option<DeviceIdentity>,
    ) -> Result<u64> {
        self.with_bus(|bus| bus.add_listener(listener, filter, device))
    }

    pub fn remove_listener(&self, id: u64) -> Result<bool> {
        self.with_bus(|bus| bus.remove_listener(id))
    }

    /// Run `f` on the listener bus.
    pub fn with_bus<R>(&self, f: impl FnOnce(&mut InputEventBus) -> R) -> Result<R> {
        let mut bus = self
            .router
            .bus
            .try_borrow_mut()
            .map_err(|_| Error::InvalidState("listener bus is busy dispatching".into()))?;
        Ok(f(&mut bus))
    }

    /// Install the routing procedure on `window` and register the device set.
    ///
    /// Hooking the window that is already hooked is a no-op. On any failure the hook
    /// stays unhooked and the window keeps its original procedure.
    pub fn hook(&self, window: WindowHandle) -> Result<()> {
        if let Some(state) = self.state() {
            if state.window == window {
                return Ok(());
            }
            return Err(Error::HookInstallFailed {
                window,
                reason: format!("already hooked to window {}", state.window),
            });
        }
        if window.is_null() {
            return Err(Error::HookInstallFailed {
                window,
                reason: "null window handle".into(),
            });
        }

        let api = &*self.router.api;
        let previous = api.window_proc(window)?;
        if previous.is_null() {
            return Err(Error::HookInstallFailed {
                window,
                reason: "window has no procedure".into(),
            });
        }

        let installed = api.hook_entry_point();
        // One router per window.
        if previous == installed || api.is_bound(window) {
            return Err(Error::HookInstallFailed {
                window,
                reason: "window already routed by another hook".into(),
            });
        }
        self.router.state.set(Some(HookState {
            window,
            previous,
            installed,
        }));
        api.bind_sink(window, self.router.clone());

        let replaced = match api.replace_window_proc(window, installed) {
            Ok(p) => p,
            Err(e) => {
                api.release_sink(window, None);
                self.router.state.set(None);
                return Err(e);
            }
        };
        // What we actually replaced is authoritative.
        let previous = if replaced.is_null() { previous } else { replaced };
        self.router.state.set(Some(HookState {
            window,
            previous,
            installed,
        }));

        if let Err(e) = self
            .registrations
            .register(window, &self.interests, self.background)
        {
            warn!(%window, error = %e, "registration failed, rolling back hook");
            if let Err(restore) = api.replace_window_proc(window, previous) {
                warn!(%window, error = %restore, "could not restore window procedure");
                api.release_sink(window, Some(previous));
            } else {
                api.release_sink(window, None);
            }
            self.router.state.set(None);
            return Err(e);
        }

        info!(%window, %previous, %installed, "window hooked");
        Ok(())
    }

    /// Restore the previous procedure (when still ours) and unregister the device set.
    ///
    /// Unhooking an unhooked hook is a no-op. Teardown always runs to completion; the
    /// first failure is returned afterwards.
    pub fn unhook(&self) -> Result<()> {
        let Some(state) = self.state() else {
            return Ok(());
        };
        let api = &*self.router.api;
        let window = state.window;
        let mut first_error: Option<Error> = None;

        let restored = match api.window_proc(window) {
            Ok(current) if current == state.installed => {
                match api.replace_window_proc(window, state.previous) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(%window, error = %e, "could not restore window procedure");
                        first_error.get_or_insert(e);
                        false
                    }
                }
            }
            Ok(current) => {
                warn!(%window, %current, installed = %state.installed,
                    "window was subclassed after us, leaving chain in place");
                false
            }
            Err(e) => {
                warn!(%window, error = %e, "could not read window procedure");
                false
            }
        };
        api.release_sink(window, (!restored).then_some(state.previous));
        self.router.state.set(None);

        if let Err(e) = self.registrations.unregister_interests(&self.interests) {
            warn!(%window, error = %e, "failed to unregister raw input devices");
            first_error.get_or_insert(e);
        }

        info!(%window, restored, "window unhooked");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<A: RawInputApi + WindowProcApi + 'static> Drop for MessageHook<A> {
    fn drop(&mut self) {
        if let Err(e) = self.unhook() {
            warn!(error = %e, "unhook on drop failed");
        }
    }
}
