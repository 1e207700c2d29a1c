//! `RawInputApi` over user32.
//!
//! Every probe/fetch pair maps onto one Win32 call made twice: once with a null buffer to
//! learn the size, once to copy. A fetch that fails with `ERROR_INSUFFICIENT_BUFFER`
//! reports the new size instead of an error so [`crate::buffer::query_sized`] can retry.
//!
//! ## Units
//! - `RIDI_DEVICENAME` sizes are in UTF-16 code units; everything here reports bytes.
//! - `RIDI_DEVICEINFO` requires `cbSize` to be set before the fetch.
//! - Device list and registration sizes are element counts.

#![cfg(target_os = "windows")]

use super::Win32;
use crate::api::{InfoCommand, RawDeviceEntry, RawInputApi, Registration};
use crate::buffer::Fetch;
use crate::device::{DeviceHandle, RawInputHandle, WindowHandle};
use crate::error::{Error, Result};
use crate::native::RIDEV_REMOVE;
use core::ffi::c_void;
use core::mem::size_of;
use tracing::debug;
use windows_sys::Win32::Foundation::{GetLastError, HANDLE, HWND};
use windows_sys::Win32::UI::Input::*;

// Raw Input command ids and the error codes checked below.
const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
const RIDI_PREPARSEDDATA_CMD: u32 = 0x2000_0005;
const RIDI_DEVICENAME_CMD: u32 = 0x2000_0007;
const RIDI_DEVICEINFO_CMD: u32 = 0x2000_000B;
const RID_INPUT_CMD: u32 = 0x1000_0003;
const FAILED: u32 = u32::MAX;

fn command_id(command: InfoCommand) -> u32 {
    match command {
        InfoCommand::DeviceName => RIDI_DEVICENAME_CMD,
        InfoCommand::DeviceInfo => RIDI_DEVICEINFO_CMD,
        InfoCommand::PreparsedData => RIDI_PREPARSEDDATA_CMD,
    }
}

fn os_handle(device: DeviceHandle) -> HANDLE {
    device.0 as HANDLE
}

/// Map a failed sized call to `Insufficient` or an error.
fn shortfall(op: &'static str, required: usize) -> Result<Fetch> {
    let code = unsafe { GetLastError() };
    if code == ERROR_INSUFFICIENT_BUFFER {
        Ok(Fetch::Insufficient(required))
    } else {
        Err(Error::DeviceQueryFailed { op, code })
    }
}

fn to_native(r: &Registration) -> RAWINPUTDEVICE {
    RAWINPUTDEVICE {
        usUsagePage: r.usage_page,
        usUsage: r.usage,
        dwFlags: r.flags,
        hwndTarget: r.target.map(|w| w.0).unwrap_or(0) as HWND,
    }
}

fn from_native(d: &RAWINPUTDEVICE) -> Registration {
    let target = WindowHandle(d.hwndTarget as isize);
    Registration {
        usage_page: d.usUsagePage,
        usage: d.usUsage,
        flags: d.dwFlags,
        target: (!target.is_null()).then_some(target),
    }
}

impl RawInputApi for Win32 {
    fn device_list_len(&self) -> Result<usize> {
        let mut count: u32 = 0;
        let r = unsafe {
            GetRawInputDeviceList(
                core::ptr::null_mut(),
                &mut count,
                size_of::<RAWINPUTDEVICELIST>() as u32,
            )
        };
        if r == FAILED {
            let code = unsafe { GetLastError() };
            return Err(Error::DeviceQueryFailed {
                op: "GetRawInputDeviceList",
                code,
            });
        }
        Ok(count as usize)
    }

    fn read_device_list(&self, out: &mut [RawDeviceEntry]) -> Result<Fetch> {
        let mut native: Vec<RAWINPUTDEVICELIST> = vec![unsafe { core::mem::zeroed() }; out.len()];
        let mut count = native.len() as u32;
        let r = unsafe {
            GetRawInputDeviceList(
                native.as_mut_ptr(),
                &mut count,
                size_of::<RAWINPUTDEVICELIST>() as u32,
            )
        };
        if r == FAILED {
            return shortfall("GetRawInputDeviceList", count as usize);
        }

        let n = (r as usize).min(out.len());
        for (dst, src) in out.iter_mut().zip(&native[..n]) {
            *dst = RawDeviceEntry {
                handle: DeviceHandle(src.hDevice as isize),
                kind: src.dwType,
            };
        }
        Ok(Fetch::Complete(n))
    }

    fn device_info_len(&self, device: DeviceHandle, command: InfoCommand) -> Result<usize> {
        let mut size: u32 = 0;
        let r = unsafe {
            GetRawInputDeviceInfoW(
                os_handle(device),
                command_id(command),
                core::ptr::null_mut(),
                &mut size,
            )
        };
        if r == FAILED {
            let code = unsafe { GetLastError() };
            return Err(Error::DeviceQueryFailed {
                op: "GetRawInputDeviceInfoW",
                code,
            });
        }
        Ok(match command {
            InfoCommand::DeviceName => size as usize * 2,
            InfoCommand::DeviceInfo => (size as usize).max(size_of::<RID_DEVICE_INFO>()),
            InfoCommand::PreparsedData => size as usize,
        })
    }

    fn read_device_info(
        &self,
        device: DeviceHandle,
        command: InfoCommand,
        out: &mut [u8],
    ) -> Result<Fetch> {
        let op = "GetRawInputDeviceInfoW";
        match command {
            InfoCommand::DeviceName => {
                let mut wide = vec![0u16; out.len() / 2];
                let mut chars = wide.len() as u32;
                let r = unsafe {
                    GetRawInputDeviceInfoW(
                        os_handle(device),
                        RIDI_DEVICENAME_CMD,
                        wide.as_mut_ptr() as *mut c_void,
                        &mut chars,
                    )
                };
                if r == FAILED {
                    return shortfall(op, chars as usize * 2);
                }
                let n = (r as usize).min(wide.len());
                for (i, w) in wide[..n].iter().enumerate() {
                    out[i * 2..i * 2 + 2].copy_from_slice(&w.to_le_bytes());
                }
                Ok(Fetch::Complete(n * 2))
            }
            InfoCommand::DeviceInfo => {
                let len = size_of::<RID_DEVICE_INFO>();
                if out.len() < len {
                    return Ok(Fetch::Insufficient(len));
                }
                let mut info: RID_DEVICE_INFO = unsafe { core::mem::zeroed() };
                info.cbSize = len as u32;
                let mut size = len as u32;
                let r = unsafe {
                    GetRawInputDeviceInfoW(
                        os_handle(device),
                        RIDI_DEVICEINFO_CMD,
                        &mut info as *mut RID_DEVICE_INFO as *mut c_void,
                        &mut size,
                    )
                };
                if r == FAILED {
                    return shortfall(op, size as usize);
                }
                let bytes =
                    unsafe { core::slice::from_raw_parts(&info as *const RID_DEVICE_INFO as *const u8, len) };
                out[..len].copy_from_slice(bytes);
                Ok(Fetch::Complete(len))
            }
            InfoCommand::PreparsedData => {
                let mut size = out.len() as u32;
                let r = unsafe {
                    GetRawInputDeviceInfoW(
                        os_handle(device),
                        RIDI_PREPARSEDDATA_CMD,
                        out.as_mut_ptr() as *mut c_void,
                        &mut size,
                    )
                };
                if r == FAILED {
                    return shortfall(op, size as usize);
                }
                Ok(Fetch::Complete((r as usize).min(out.len())))
            }
        }
    }

    fn input_len(&self, input: RawInputHandle) -> Result<usize> {
        let mut size: u32 = 0;
        let r = unsafe {
            GetRawInputData(
                input.0 as HRAWINPUT,
                RID_INPUT_CMD,
                core::ptr::null_mut(),
                &mut size,
                size_of::<RAWINPUTHEADER>() as u32,
            )
        };
        if r == FAILED {
            let code = unsafe { GetLastError() };
            return Err(Error::DeviceQueryFailed {
                op: "GetRawInputData",
                code,
            });
        }
        Ok(size as usize)
    }

    fn read_input(&self, input: RawInputHandle, out: &mut [u8]) -> Result<Fetch> {
        // RAWINPUT must be pointer aligned; fetch into u64 words and copy out.
        let mut words = vec![0u64; out.len().div_ceil(8)];
        let mut size = out.len() as u32;
        let r = unsafe {
            GetRawInputData(
                input.0 as HRAWINPUT,
                RID_INPUT_CMD,
                words.as_mut_ptr() as *mut c_void,
                &mut size,
                size_of::<RAWINPUTHEADER>() as u32,
            )
        };
        if r == FAILED {
            return shortfall("GetRawInputData", size as usize);
        }
        let n = (r as usize).min(out.len());
        let bytes = unsafe { core::slice::from_raw_parts(words.as_ptr() as *const u8, n) };
        out[..n].copy_from_slice(bytes);
        Ok(Fetch::Complete(n))
    }

    fn register_devices(&self, registrations: &[Registration]) -> Result<()> {
        let native: Vec<RAWINPUTDEVICE> = registrations.iter().map(to_native).collect();
        let ok = unsafe {
            RegisterRawInputDevices(
                native.as_ptr(),
                native.len() as u32,
                size_of::<RAWINPUTDEVICE>() as u32,
            )
        };
        if ok == 0 {
            let code = unsafe { GetLastError() };
            let removing = registrations.iter().any(|r| r.has_flag(RIDEV_REMOVE));
            return Err(Error::RegistrationFailed {
                op: if removing {
                    "RegisterRawInputDevices(RIDEV_REMOVE)"
                } else {
                    "RegisterRawInputDevices"
                },
                code,
            });
        }
        debug!(count = registrations.len(), "RegisterRawInputDevices applied");
        Ok(())
    }

    fn registered_len(&self) -> Result<usize> {
        let mut count: u32 = 0;
        let r = unsafe {
            GetRegisteredRawInputDevices(
                core::ptr::null_mut(),
                &mut count,
                size_of::<RAWINPUTDEVICE>() as u32,
            )
        };
        if r == FAILED {
            let code = unsafe { GetLastError() };
            return Err(Error::DeviceQueryFailed {
                op: "GetRegisteredRawInputDevices",
                code,
            });
        }
        Ok(count as usize)
    }

    fn read_registered(&self, out: &mut [Registration]) -> Result<Fetch> {
        let mut native: Vec<RAWINPUTDEVICE> = vec![unsafe { core::mem::zeroed() }; out.len()];
        let mut count = native.len() as u32;
        let r = unsafe {
            GetRegisteredRawInputDevices(
                native.as_mut_ptr(),
                &mut count,
                size_of::<RAWINPUTDEVICE>() as u32,
            )
        };
        if r == FAILED {
            return shortfall("GetRegisteredRawInputDevices", count as usize);
        }
        let n = (r as usize).min(out.len());
        for (dst, src) in out.iter_mut().zip(&native[..n]) {
            *dst = from_native(src);
        }
        Ok(Fetch::Complete(n))
    }

    fn registry_string(&self, subkey: &str, value: &str) -> Option<String> {
        super::registry::read_string(subkey, value)
    }
}
