#![cfg(target_os = "windows")]

//! `REG_SZ` lookups under `HKEY_LOCAL_MACHINE`, used for device descriptions.

use crate::buffer::{query_sized, Fetch};
use crate::error::{Error, Result};
use core::ffi::c_void;
use tracing::trace;
use windows_sys::Win32::System::Registry::{RegGetValueW, HKEY_LOCAL_MACHINE, RRF_RT_REG_SZ};

const ERROR_SUCCESS: u32 = 0;
const ERROR_MORE_DATA: u32 = 234;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(core::iter::once(0)).collect()
}

/// Call `RegGetValueW`, returning the byte count it reports.
fn get_value(subkey: &[u16], value: &[u16], buf: Option<&mut [u16]>) -> (u32, u32) {
    let (ptr, mut bytes) = match buf {
        Some(b) => (b.as_mut_ptr() as *mut c_void, (b.len() * 2) as u32),
        None => (core::ptr::null_mut(), 0),
    };
    let status = unsafe {
        RegGetValueW(
            HKEY_LOCAL_MACHINE,
            subkey.as_ptr(),
            value.as_ptr(),
            RRF_RT_REG_SZ,
            core::ptr::null_mut(),
            ptr,
            &mut bytes,
        )
    };
    (status, bytes)
}

fn query(subkey: &str, value: &str) -> Result<Vec<u16>> {
    let op = "RegGetValueW";
    let (k, v) = (wide(subkey), wide(value));
    query_sized(
        op,
        || match get_value(&k, &v, None) {
            (ERROR_SUCCESS, bytes) | (ERROR_MORE_DATA, bytes) => Ok((bytes as usize).div_ceil(2)),
            (code, _) => Err(Error::DeviceQueryFailed { op, code }),
        },
        |buf| match get_value(&k, &v, Some(buf)) {
            (ERROR_SUCCESS, bytes) => Ok(Fetch::Complete((bytes as usize).div_ceil(2))),
            (ERROR_MORE_DATA, bytes) => Ok(Fetch::Insufficient((bytes as usize).div_ceil(2))),
            (code, _) => Err(Error::DeviceQueryFailed { op, code }),
        },
    )
}

/// Read `HKLM\<subkey>\<value>`. Missing keys and values are `None`.
pub fn read_string(subkey: &str, value: &str) -> Option<String> {
    match query(subkey, value) {
        Ok(mut w) => {
            while w.last() == Some(&0) {
                w.pop();
            }
            Some(String::from_utf16_lossy(&w))
        }
        Err(e) => {
            trace!(subkey, value, error = %e, "registry value unavailable");
            None
        }
    }
}
