#![cfg(target_os = "windows")]

//! Win32 implementation of the platform seam.
//!
//! - [`raw_input`]: `GetRawInputDeviceList`, `GetRawInputDeviceInfoW`, `GetRawInputData`,
//!   `RegisterRawInputDevices`, `GetRegisteredRawInputDevices`
//! - [`window_proc`]: `GWLP_WNDPROC` subclassing and the routing entry point
//! - [`hidp`]: `HidP_GetCaps` / `HidP_GetButtonCaps` / `HidP_GetValueCaps` (feature `hid`)
//! - [`registry`]: `RegGetValueW` for device descriptions
//!
//! Every call copies what it needs out of OS memory before returning; no OS pointer
//! outlives the call that produced it.

pub mod raw_input;
pub mod registry;
pub mod window_proc;

#[cfg(feature = "hid")]
pub mod hidp;

#[cfg(not(feature = "hid"))]
use crate::{
    api::HidParserApi,
    buffer::PreparsedData,
    error::{Error, Result},
    hid_caps::{ButtonCap, HidCaps, ValueCap},
};

/// The live Win32 API. Zero-sized; all state lives in the OS (and, for the window
/// procedure entry point, in a thread-local sink table).
#[derive(Clone, Copy, Debug, Default)]
pub struct Win32;

#[cfg(not(feature = "hid"))]
impl HidParserApi for Win32 {
    fn caps(&self, _blob: &PreparsedData) -> Result<HidCaps> {
        Err(Error::InvalidState("built without the `hid` feature".into()))
    }

    fn button_caps(&self, _blob: &PreparsedData, _caps: &HidCaps) -> Result<Vec<ButtonCap>> {
        Err(Error::InvalidState("built without the `hid` feature".into()))
    }

    fn value_caps(&self, _blob: &PreparsedData, _caps: &HidCaps) -> Result<Vec<ValueCap>> {
        Err(Error::InvalidState("built without the `hid` feature".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::Win32;
    use crate::device::DeviceClass;
    use crate::discovery::discover;
    use crate::enumerator::list_devices;

    #[test]
    #[ignore = "talks to the live Raw Input API"]
    fn enumerates_real_keyboards() {
        let keyboards = list_devices(&Win32, Some(DeviceClass::Keyboard)).unwrap();
        assert!(keyboards.iter().all(|(_, c)| *c == DeviceClass::Keyboard));

        let devices = discover(&Win32, true).unwrap();
        for d in &devices {
            assert!(!d.path.is_empty());
            assert_eq!(d.identity, crate::device::DeviceIdentity::from_path(&d.path));
        }
    }
}
