//! Per-device queries (`GetRawInputDeviceInfoW`) and registry descriptions.
//!
//! Nothing here is cached. Each call goes to the OS so the result reflects the device
//! as it is now.

use crate::api::{InfoCommand, RawInputApi};
use crate::buffer::{query_sized, PreparsedData};
use crate::device::DeviceHandle;
use crate::error::Result;
use crate::metadata::{ClassInfo, DeviceInfo, DevicePath};
use crate::native;
use tracing::trace;

fn device_bytes<A>(api: &A, device: DeviceHandle, command: InfoCommand) -> Result<Vec<u8>>
where
    A: RawInputApi + ?Sized,
{
    query_sized(
        "GetRawInputDeviceInfoW",
        || api.device_info_len(device, command),
        |buf| api.read_device_info(device, command, buf),
    )
}

/// Decoded `RID_DEVICE_INFO` for `device`.
///
/// Mice and keyboards get vendor/product ids from their interface path when it carries
/// a `VID_xxxx&PID_xxxx` segment.
pub fn get_info<A>(api: &A, device: DeviceHandle) -> Result<DeviceInfo>
where
    A: RawInputApi + ?Sized,
{
    let bytes = device_bytes(api, device, InfoCommand::DeviceInfo)?;
    let mut info = native::parse_device_info(&bytes)?;

    if !matches!(info.class, ClassInfo::Hid(_)) {
        if let Some(path) = get_device_path(api, device)
            .ok()
            .as_deref()
            .and_then(DevicePath::parse)
        {
            info.vendor_id = path.vendor_id();
            info.product_id = path.product_id();
        }
    }

    trace!(%device, ?info, "read device info");
    Ok(info)
}

/// Interface path of `device` (`RIDI_DEVICENAME`). Descriptive only; never a lookup key.
pub fn get_device_path<A>(api: &A, device: DeviceHandle) -> Result<String>
where
    A: RawInputApi + ?Sized,
{
    let bytes = device_bytes(api, device, InfoCommand::DeviceName)?;
    Ok(native::decode_wide(&bytes))
}

/// Copy of the preparsed HID descriptor. Empty for mice and keyboards.
pub fn get_preparsed_data<A>(api: &A, device: DeviceHandle) -> Result<PreparsedData>
where
    A: RawInputApi + ?Sized,
{
    device_bytes(api, device, InfoCommand::PreparsedData).map(PreparsedData::from_bytes)
}

/// Friendly description from the device's registry key (`DeviceDesc`).
///
/// Driver-provided descriptions look like `@input.inf,%hid.devicedesc%;HID Keyboard Device`;
/// the text after the last `;` is the display string.
pub fn device_description<A>(api: &A, path: &DevicePath) -> Option<String>
where
    A: RawInputApi + ?Sized,
{
    let desc = api.registry_string(&path.registry_key(), "DeviceDesc")?;
    let text = desc.rsplit(';').next().unwrap_or(&desc).trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Device setup class (`Keyboard`, `Mouse`, `HIDClass`, ...).
///
/// Older systems store `Class` on the device key; newer ones only store `ClassGUID`, which
/// is resolved through `Control\Class\<guid>`.
pub fn device_class_name<A>(api: &A, path: &DevicePath) -> Option<String>
where
    A: RawInputApi + ?Sized,
{
    let key = path.registry_key();
    api.registry_string(&key, "DeviceDesc")?;
    if let Some(class) = api.registry_string(&key, "Class") {
        return Some(class);
    }
    let guid = api.registry_string(&key, "ClassGUID")?;
    if guid.trim().is_empty() {
        return None;
    }
    api.registry_string(
        &format!(r"SYSTEM\CurrentControlSet\Control\Class\{}", guid.trim()),
        "Class",
    )
}
