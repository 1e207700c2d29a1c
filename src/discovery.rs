//! Raw Input device discovery.
//!
//! Pipeline per enumerated device:
//!
//! - Read the interface path (`RIDI_DEVICENAME`); devices without one are dropped
//! - Skip remote-desktop redirected devices (`RDP_*`) when configured
//! - Read `RID_DEVICE_INFO`
//! - Look up the registry description and setup class (best effort)
//! - Assign a display name, made unique with ` #n` suffixes
//!
//! ## `discover` vs `discover_with_debug`
//! - [`discover`] returns only the devices that made it through.
//! - [`discover_with_debug`] also returns a [`DiscoveryRecord`] per enumerated device
//!   naming the stage that dropped it, for device-report tooling.

use crate::api::RawInputApi;
use crate::device::{DeviceClass, DeviceHandle, DeviceIdentity};
use crate::enumerator::list_devices;
use crate::error::Result;
use crate::info::{device_class_name, device_description, get_device_path, get_info};
use crate::metadata::{DeviceInfo, DevicePath};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

/// A device that passed discovery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscoveredDevice {
    pub handle: DeviceHandle,
    pub class: DeviceClass,
    /// Identity derived from the interface path.
    pub identity: DeviceIdentity,
    pub info: DeviceInfo,
    pub path: String,
    /// Unique display name.
    pub name: String,
    /// Setup class from the registry (`Keyboard`, `Mouse`, `HIDClass`, ...).
    pub class_name: Option<String>,
    /// Registry description, when the driver provides one.
    pub description: Option<String>,
}

/// Where along the discovery pipeline a device was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", content = "reason", rename_all = "snake_case")]
pub enum DropStage {
    /// The interface path could not be read.
    PathUnavailable(String),
    /// Redirected by a remote-desktop session.
    RemoteDesktop,
    /// `RID_DEVICE_INFO` could not be read.
    InfoUnavailable(String),
}

/// Debug view of one enumerated device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DiscoveryRecord {
    pub handle: DeviceHandle,
    pub class: DeviceClass,
    pub path: Option<String>,
    /// `None` means the device was returned by discovery.
    pub drop_stage: Option<DropStage>,
}

/// Discover attached devices.
pub fn discover<A>(api: &A, skip_remote_desktop: bool) -> Result<Vec<DiscoveredDevice>>
where
    A: RawInputApi + ?Sized,
{
    discover_with_debug(api, skip_remote_desktop).map(|(devices, _)| devices)
}

/// Debug-aware variant of [`discover`] that also reports every drop decision.
pub fn discover_with_debug<A>(
    api: &A,
    skip_remote_desktop: bool,
) -> Result<(Vec<DiscoveredDevice>, Vec<DiscoveryRecord>)>
where
    A: RawInputApi + ?Sized,
{
    let mut devices = Vec::new();
    let mut debug = Vec::new();
    let mut names: HashMap<String, usize> = HashMap::new();

    for (handle, class) in list_devices(api, None)? {
        let mut record = DiscoveryRecord {
            handle,
            class,
            path: None,
            drop_stage: None,
        };

        let path = match get_device_path(api, handle) {
            Ok(p) if !p.is_empty() => p,
            Ok(_) => {
                warn!(device = %handle, %class, "device has an empty path, skipping");
                record.drop_stage = Some(DropStage::PathUnavailable("empty path".into()));
                debug.push(record);
                continue;
            }
            Err(e) => {
                warn!(device = %handle, %class, error = %e, "cannot read device path, skipping");
                record.drop_stage = Some(DropStage::PathUnavailable(e.to_string()));
                debug.push(record);
                continue;
            }
        };
        record.path = Some(path.clone());

        let parsed = DevicePath::parse(&path);
        if skip_remote_desktop && parsed.as_ref().is_some_and(DevicePath::is_remote_desktop) {
            info!(device = %handle, %path, "remote desktop device, skipping");
            record.drop_stage = Some(DropStage::RemoteDesktop);
            debug.push(record);
            continue;
        }

        let info = match get_info(api, handle) {
            Ok(i) => i,
            Err(e) => {
                warn!(device = %handle, %path, error = %e, "cannot read device info, skipping");
                record.drop_stage = Some(DropStage::InfoUnavailable(e.to_string()));
                debug.push(record);
                continue;
            }
        };

        let description = parsed.as_ref().and_then(|p| device_description(api, p));
        let class_name = parsed.as_ref().and_then(|p| device_class_name(api, p));
        let name = unique_name(&mut names, base_name(class, &info, description.as_deref()));

        info!(device = %handle, %class, %name, %path, "found device");
        devices.push(DiscoveredDevice {
            handle,
            class,
            identity: DeviceIdentity::from_path(&path),
            info,
            path,
            name,
            class_name,
            description,
        });
        debug.push(record);
    }

    Ok((devices, debug))
}

fn base_name(class: DeviceClass, info: &DeviceInfo, description: Option<&str>) -> String {
    if let Some(d) = description {
        return d.to_string();
    }
    let kind = match class {
        DeviceClass::Keyboard => "Keyboard",
        DeviceClass::Mouse => "Mouse",
        DeviceClass::OtherHid => "HID device",
    };
    match (info.vendor_id, info.product_id) {
        (Some(vid), Some(pid)) => format!("{kind} {vid:04X}:{pid:04X}"),
        _ => kind.to_string(),
    }
}

/// First occurrence keeps the name; later ones get ` #1`, ` #2`, ...
fn unique_name(seen: &mut HashMap<String, usize>, name: String) -> String {
    let count = seen.entry(name.clone()).or_insert(0);
    let out = if *count == 0 {
        name
    } else {
        format!("{name} #{count}")
    };
    *count += 1;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{preparsed, MockDevice, MockOs};

    const KBD_A: &str = r"\\?\HID#VID_046D&PID_C31C&MI_00#7&1&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";
    const KBD_B: &str = r"\\?\HID#VID_046D&PID_C31C&MI_00#7&2&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";
    const RDP: &str = r"\\?\Root#RDP_KBD#0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";
    const STICK: &str = r"\\?\HID#VID_044F&PID_B10A#8&1&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}";

    fn os() -> MockOs {
        let os = MockOs::new();
        os.add_device(MockDevice::keyboard(0x10, KBD_A));
        os.add_device(MockDevice::keyboard(0x11, KBD_B));
        os.add_device(MockDevice::keyboard(0x12, RDP));
        os.add_device(MockDevice::hid(0x20, STICK, 0x04, preparsed(1, 4, &[(1, 12)], &[(0, 1023)])));
        os
    }

    #[test]
    fn skips_remote_desktop_and_dedupes_names() {
        let os = os();
        for path in [KBD_A, KBD_B] {
            let key = DevicePath::parse(path).unwrap().registry_key();
            os.set_registry(&key, "DeviceDesc", "@keyboard.inf,%hid%;HID Keyboard Device");
            os.set_registry(&key, "Class", "Keyboard");
        }

        let (devices, debug) = discover_with_debug(&os, true).unwrap();
        let names: Vec<&str> = devices.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["HID Keyboard Device", "HID Keyboard Device #1", "HID device 044F:B10A"]);
        assert_eq!(devices[0].class_name.as_deref(), Some("Keyboard"));
        assert_eq!(devices[0].identity, DeviceIdentity::from_path(KBD_A));
        assert_ne!(devices[0].identity, devices[1].identity);

        let rdp = debug.iter().find(|r| r.handle == DeviceHandle(0x12)).unwrap();
        assert_eq!(rdp.drop_stage, Some(DropStage::RemoteDesktop));
        assert_eq!(debug.len(), 4);

        assert_eq!(discover(&os, false).unwrap().len(), 4);
    }

    #[test]
    fn fallback_name_uses_vid_pid() {
        let os = MockOs::new();
        os.add_device(MockDevice::mouse(0x30, r"\\?\ACPI#PNP0F13#4&1&0#{mou}"));
        os.add_device(MockDevice::mouse(0x31, r"\\?\HID#VID_1532&PID_0084#1&4&0#{mou}"));
        let devices = discover(&os, true).unwrap();
        assert_eq!(devices[0].name, "Mouse");
        assert_eq!(devices[1].name, "Mouse 1532:0084");
    }

    #[test]
    fn records_serialize_for_reports() {
        let (_, debug) = discover_with_debug(&os(), true).unwrap();
        let json = serde_json::to_value(&debug).unwrap();
        assert_eq!(json[2]["drop_stage"]["stage"], "remote_desktop");
        assert!(json[0]["drop_stage"].is_null());
    }
}
