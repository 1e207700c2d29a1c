//! rawtap: Windows Raw Input acquisition and routing.
//!
//! Enumerates keyboards, mice and other HID devices, registers interest in them for a
//! window, subclasses that window's procedure and turns each `WM_INPUT` into a
//! [`RawInputEvent`] tagged with an application-chosen [`DeviceIdentity`].
//!
//! Most applications only need [`RawInputManager`]:
//! - `discover()` to enumerate devices and build the route table
//! - `attach(window)` to register and hook
//! - `add_listener(..)` to receive events
//! - `detach()` (or drop) to restore the window and unregister
//!
//! The OS is reached only through the traits in [`api`]; [`backends::windows`] is the
//! live implementation.

pub mod api;
pub mod backends;
pub mod buffer;
pub mod config;
pub mod device;
pub mod discovery;
pub mod enumerator;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod exclusivity;
pub mod filtered_listener;
pub mod hid_caps;
pub mod hook;
pub mod info;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod native;
pub mod registration;
pub mod routes;

#[cfg(test)]
mod integration_tests;

pub use api::{HidParserApi, Platform, RawInputApi, WindowProcApi};
pub use config::RawInputConfig;
pub use device::*;
pub use discovery::{discover, discover_with_debug, DiscoveredDevice};
pub use error::{Error, Result};
pub use event::*;
pub use eventbus::*;
pub use exclusivity::ExclusivityController;
pub use hid_caps::{AxisRange, HidCapabilities};
pub use hook::MessageHook;
pub use manager::*;
pub use metadata::DeviceInfo;
pub use registration::{Interest, RegistrationManager};
pub use routes::{DeviceRoutes, RouteTable};

#[cfg(windows)]
pub use backends::windows::Win32;
