//! Platform seam.
//!
//! The core never calls Win32 directly. It talks to three small traits:
//!
//! - [`RawInputApi`]: device list, device info, input payloads, registrations
//! - [`WindowProcApi`]: reading and replacing a window procedure, chaining to it
//! - [`HidParserApi`]: typed access to a preparsed HID blob
//!
//! Every sized query is split into a `*_len` probe and a `read_*` fetch so the two-phase
//! negotiation lives in one place ([`crate::buffer::query_sized`]). Sizes are in elements
//! of the output slice (bytes for `&mut [u8]`).
//!
//! The Windows implementation lives in `backends::windows`; tests use an in-memory
//! double.

use crate::buffer::{Fetch, PreparsedData};
use crate::device::{DeviceHandle, RawInputHandle, WindowHandle, WndProcPtr};
use crate::error::Result;
use crate::hid_caps::{ButtonCap, HidCaps, ValueCap};
use std::rc::Rc;

/// One `RAWINPUTDEVICELIST` entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawDeviceEntry {
    pub handle: DeviceHandle,
    /// `RIM_TYPE*` discriminant.
    pub kind: u32,
}

/// `GetRawInputDeviceInfoW` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InfoCommand {
    /// `RIDI_DEVICENAME`: UTF-16 interface path.
    DeviceName,
    /// `RIDI_DEVICEINFO`: `RID_DEVICE_INFO` block.
    DeviceInfo,
    /// `RIDI_PREPARSEDDATA`: opaque HID descriptor blob.
    PreparsedData,
}

/// One `RAWINPUTDEVICE`: a registered (or to-be-registered) interest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Registration {
    pub usage_page: u16,
    pub usage: u16,
    /// `RIDEV_*` bits.
    pub flags: u32,
    /// `None` follows keyboard focus.
    pub target: Option<WindowHandle>,
}

impl Registration {
    pub fn has_flag(&self, flag: u32) -> bool {
        self.flags & flag == flag
    }
}

/// A message travelling down a window-procedure chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowMessage {
    pub window: WindowHandle,
    pub msg: u32,
    pub wparam: usize,
    pub lparam: isize,
}

/// Receiver the routing entry point hands messages to.
pub trait MessageSink {
    fn dispatch(&self, msg: &WindowMessage) -> isize;
}

/// Raw Input device and registration queries.
pub trait RawInputApi {
    fn device_list_len(&self) -> Result<usize>;
    fn read_device_list(&self, out: &mut [RawDeviceEntry]) -> Result<Fetch>;

    fn device_info_len(&self, device: DeviceHandle, command: InfoCommand) -> Result<usize>;
    fn read_device_info(
        &self,
        device: DeviceHandle,
        command: InfoCommand,
        out: &mut [u8],
    ) -> Result<Fetch>;

    fn input_len(&self, input: RawInputHandle) -> Result<usize>;
    fn read_input(&self, input: RawInputHandle, out: &mut [u8]) -> Result<Fetch>;

    /// Apply registrations atomically (`RegisterRawInputDevices`).
    fn register_devices(&self, registrations: &[Registration]) -> Result<()>;
    fn registered_len(&self) -> Result<usize>;
    fn read_registered(&self, out: &mut [Registration]) -> Result<Fetch>;

    /// `REG_SZ` value under `HKEY_LOCAL_MACHINE\<subkey>`.
    fn registry_string(&self, _subkey: &str, _value: &str) -> Option<String> {
        None
    }
}

/// Window-procedure subclassing.
pub trait WindowProcApi {
    /// Current procedure of `window`.
    fn window_proc(&self, window: WindowHandle) -> Result<WndProcPtr>;
    /// Install `proc` and return the procedure it replaced.
    fn replace_window_proc(&self, window: WindowHandle, proc: WndProcPtr) -> Result<WndProcPtr>;
    /// Forward a message to a previously installed procedure.
    fn call_window_proc(&self, previous: WndProcPtr, msg: &WindowMessage) -> isize;
    /// Address of the routing procedure this backend installs.
    fn hook_entry_point(&self) -> WndProcPtr;
    /// Route messages arriving at the entry point for `window` to `sink`.
    fn bind_sink(&self, window: WindowHandle, sink: Rc<dyn MessageSink>);
    /// Whether the entry point already routes or forwards messages for `window`.
    fn is_bound(&self, window: WindowHandle) -> bool;
    /// Drop the sink for `window`. With `forward_to`, the entry point keeps forwarding
    /// that window's messages to the given procedure (it is still in someone's chain).
    fn release_sink(&self, window: WindowHandle, forward_to: Option<WndProcPtr>);
}

/// Typed access to a preparsed HID descriptor.
pub trait HidParserApi {
    fn caps(&self, blob: &PreparsedData) -> Result<HidCaps>;
    fn button_caps(&self, blob: &PreparsedData, caps: &HidCaps) -> Result<Vec<ButtonCap>>;
    fn value_caps(&self, blob: &PreparsedData, caps: &HidCaps) -> Result<Vec<ValueCap>>;
}

/// Everything a full raw-input session needs.
pub trait Platform: RawInputApi + WindowProcApi + HidParserApi {}

impl<T: RawInputApi + WindowProcApi + HidParserApi> Platform for T {}
