//! Device enumeration (`GetRawInputDeviceList`).

use crate::api::{RawDeviceEntry, RawInputApi};
use crate::buffer::query_sized;
use crate::device::{DeviceClass, DeviceHandle};
use crate::error::Result;
use tracing::trace;

/// List attached devices, optionally restricted to one class.
///
/// Returns an empty list (not an error) when nothing matches. Entries with a null handle
/// or an unknown `RIM_TYPE*` are skipped.
pub fn list_devices<A>(api: &A, filter: Option<DeviceClass>) -> Result<Vec<(DeviceHandle, DeviceClass)>>
where
    A: RawInputApi + ?Sized,
{
    let entries: Vec<RawDeviceEntry> = query_sized(
        "GetRawInputDeviceList",
        || api.device_list_len(),
        |buf| api.read_device_list(buf),
    )?;

    let out: Vec<_> = entries
        .into_iter()
        .filter(|e| e.handle.0 != 0)
        .filter_map(|e| DeviceClass::from_raw(e.kind).map(|c| (e.handle, c)))
        .filter(|(_, c)| filter.map_or(true, |f| f == *c))
        .collect();

    trace!(count = out.len(), ?filter, "enumerated raw input devices");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{MockDevice, MockOs};
    use crate::error::Error;

    fn os() -> MockOs {
        let os = MockOs::new();
        os.add_device(MockDevice::keyboard(0x10, r"\\?\HID#VID_046D&PID_C31C#1&2&0#{kbd}"));
        os.add_device(MockDevice::mouse(0x20, r"\\?\HID#VID_046D&PID_C077#1&3&0#{mou}"));
        os.add_device(MockDevice::keyboard(0x30, r"\\?\ACPI#PNP0303#4&1&0#{kbd}"));
        os
    }

    #[test]
    fn class_filter_has_no_false_positives() {
        let os = os();
        let keyboards = list_devices(&os, Some(DeviceClass::Keyboard)).unwrap();
        assert_eq!(
            keyboards,
            vec![
                (DeviceHandle(0x10), DeviceClass::Keyboard),
                (DeviceHandle(0x30), DeviceClass::Keyboard)
            ]
        );
        assert!(list_devices(&os, Some(DeviceClass::OtherHid)).unwrap().is_empty());
        assert_eq!(list_devices(&os, None).unwrap().len(), 3);
    }

    #[test]
    fn empty_system_is_not_an_error() {
        assert!(list_devices(&MockOs::new(), None).unwrap().is_empty());
    }

    #[test]
    fn device_attached_mid_query_is_picked_up() {
        let os = os();
        os.attach_during_fetch(MockDevice::mouse(0x40, r"\\?\HID#VID_1532&PID_0084#1&4&0#{mou}"));
        let mice = list_devices(&os, Some(DeviceClass::Mouse)).unwrap();
        assert_eq!(mice.len(), 2);
        assert!(mice.contains(&(DeviceHandle(0x40), DeviceClass::Mouse)));
    }

    #[test]
    fn persistent_shortfall_fails() {
        let os = os();
        os.always_short(true);
        assert!(matches!(
            list_devices(&os, None),
            Err(Error::BufferTooSmall { op: "GetRawInputDeviceList", .. })
        ));
    }
}
