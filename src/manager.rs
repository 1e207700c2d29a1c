//! Application façade over discovery, routing and the window hook.
//!
//! ```text
//!   discover()  -> device list + route table (handle -> path identity)
//!   attach(w)   -> exclusivity from config, subclass w, register the standard set
//!   detach()    -> restore w, remove the standard set
//! ```
//!
//! The manager lives on the thread that pumps the window's messages.

use crate::api::Platform;
use crate::config::RawInputConfig;
use crate::device::{DeviceClass, DeviceHandle, DeviceIdentity, WindowHandle};
use crate::discovery::{discover, DiscoveredDevice};
use crate::error::{Error, Result};
use crate::eventbus::{EventFilter, InputListener};
use crate::exclusivity::ExclusivityController;
use crate::hid_caps::{parse_capabilities, HidCapabilities};
use crate::hook::MessageHook;
use crate::registration::RegistrationManager;
use crate::info::get_preparsed_data;
use crate::routes::{DeviceRoutes, RouteTable};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// Serializable snapshot of what the manager knows, for diagnostics.
#[derive(Debug, Serialize)]
pub struct DeviceReport<'a> {
    pub window: Option<WindowHandle>,
    pub keyboard_exclusive: bool,
    pub mouse_exclusive: bool,
    pub devices: &'a [DiscoveredDevice],
    pub capabilities: Vec<(DeviceHandle, HidCapabilities)>,
}

pub struct RawInputManager<A: Platform + 'static> {
    api: Rc<A>,
    config: RawInputConfig,
    devices: Vec<DiscoveredDevice>,
    capabilities: RefCell<HashMap<DeviceHandle, HidCapabilities>>,
    hook: MessageHook<A>,
}

impl<A: Platform + 'static> RawInputManager<A> {
    /// A manager sharing the process-wide exclusivity flags.
    pub fn new(api: A, config: RawInputConfig) -> Self {
        Self::with_exclusivity(api, config, ExclusivityController::global())
    }

    pub fn with_exclusivity(api: A, config: RawInputConfig, exclusivity: Arc<ExclusivityController>) -> Self {
        Self::with_shared(Rc::new(api), config, exclusivity)
    }

    /// A manager over an API handle the caller keeps a reference to.
    pub fn with_shared(api: Rc<A>, config: RawInputConfig, exclusivity: Arc<ExclusivityController>) -> Self {
        let hook = MessageHook::new(api.clone(), DeviceRoutes::default(), exclusivity)
            .with_interests(config.standard_devices.clone(), config.background);
        Self {
            api,
            config,
            devices: Vec::new(),
            capabilities: RefCell::new(HashMap::new()),
            hook,
        }
    }

    pub fn config(&self) -> &RawInputConfig {
        &self.config
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Re-enumerate devices and swap in a route table keyed on their path identities.
    ///
    /// The capability cache is cleared; handles from a previous enumeration may have
    /// been reused by the OS.
    pub fn discover(&mut self) -> Result<&[DiscoveredDevice]> {
        let devices = discover(&*self.api, self.config.skip_remote_desktop)?;

        let mut builder = RouteTable::builder();
        for d in &devices {
            builder = builder.device(d.handle, d.identity);
        }
        let table = builder.build()?;
        self.hook.routes().replace(table);

        self.capabilities.borrow_mut().clear();
        self.devices = devices;
        info!(count = self.devices.len(), "device list refreshed");
        Ok(&self.devices)
    }

    pub fn devices(&self) -> &[DiscoveredDevice] {
        &self.devices
    }

    pub fn device(&self, identity: DeviceIdentity) -> Option<&DiscoveredDevice> {
        self.devices.iter().find(|d| d.identity == identity)
    }

    pub fn routes(&self) -> &DeviceRoutes {
        self.hook.routes()
    }

    /// Route unmapped handles of `class` to `identity`.
    pub fn set_system_device(&self, class: DeviceClass, identity: DeviceIdentity) -> Result<()> {
        let mut builder = RouteTable::builder().system(class, identity);
        for d in &self.devices {
            builder = builder.device(d.handle, d.identity);
        }
        let table = builder.build()?;
        self.hook.routes().replace(table);
        Ok(())
    }

    /// Apply the configured exclusivity and subclass `window`.
    pub fn attach(&self, window: WindowHandle) -> Result<()> {
        let exclusivity = self.hook.registrations().exclusivity();
        if self.config.keyboard_exclusive {
            exclusivity.set_keyboard_exclusive(true);
        }
        if self.config.mouse_exclusive {
            exclusivity.set_mouse_exclusive(true);
        }
        self.hook.hook(window)
    }

    /// Restore the window and remove the registered device set. No-op when detached.
    pub fn detach(&self) -> Result<()> {
        self.hook.unhook()
    }

    pub fn registrations(&self) -> &RegistrationManager<A> {
        self.hook.registrations()
    }

    pub fn attached_window(&self) -> Option<WindowHandle> {
        self.hook.state().map(|s| s.window)
    }

    pub fn add_listener(
        &self,
        listener: impl InputListener + 'static,
        filter: EventFilter,
        device: Option<DeviceIdentity>,
    ) -> Result<u64> {
        self.hook.add_listener(listener, filter, device)
    }

    pub fn remove_listener(&self, id: u64) -> Result<bool> {
        self.hook.remove_listener(id)
    }

    /// See [`crate::registration::RegistrationManager::set_exclusive`].
    pub fn set_exclusive(&self, class: DeviceClass, enabled: bool) -> Result<bool> {
        self.hook.registrations().set_exclusive(class, enabled)
    }

    /// HID capabilities of `handle`, parsed on first use and cached.
    pub fn capabilities(&self, handle: DeviceHandle) -> Result<HidCapabilities> {
        if let Some(caps) = self.capabilities.borrow().get(&handle) {
            return Ok(caps.clone());
        }
        let blob = get_preparsed_data(&*self.api, handle)?;
        let caps = parse_capabilities(&*self.api, &blob)?;
        debug!(device = %handle, buttons = caps.button_count, axes = caps.axes.len(), "cached capabilities");
        self.capabilities.borrow_mut().insert(handle, caps.clone());
        Ok(caps)
    }

    pub fn report(&self) -> DeviceReport<'_> {
        let exclusivity = self.hook.registrations().exclusivity();
        let mut capabilities: Vec<_> = self
            .capabilities
            .borrow()
            .iter()
            .map(|(h, c)| (*h, c.clone()))
            .collect();
        capabilities.sort_by_key(|(h, _)| *h);
        DeviceReport {
            window: self.attached_window(),
            keyboard_exclusive: exclusivity.is_keyboard_exclusive(),
            mouse_exclusive: exclusivity.is_mouse_exclusive(),
            devices: &self.devices,
            capabilities,
        }
    }

    pub fn report_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.report())
            .map_err(|e| Error::InvalidState(format!("device report: {e}")))
    }
}

#[cfg(windows)]
impl RawInputManager<crate::backends::windows::Win32> {
    /// A manager over the live Win32 API.
    pub fn win32(config: RawInputConfig) -> Self {
        Self::new(crate::backends::windows::Win32, config)
    }
}
