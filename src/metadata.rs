//! Device metadata.
//!
//! [`DeviceInfo`] is the decoded `RID_DEVICE_INFO` block: vendor/product/version plus
//! class-specific fields. It is fetched on demand and never cached; call
//! [`crate::info::get_info`] again to see the current state.
//!
//! [`DevicePath`] splits a Raw Input interface path into its registry components.
//!
//! # Conventions
//! - `vendor_id`/`product_id` are always reported by the OS for HID devices. For mice and
//!   keyboards they are parsed from the `VID_xxxx&PID_xxxx` segment of the path when
//!   present, and stay `None` otherwise (PS/2, ACPI, remote-desktop devices).
//! - The path is an OS/topology string; treat it as diagnostic, never as a lookup key.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of one device's `RID_DEVICE_INFO`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// USB Vendor ID (VID), if known.
    pub vendor_id: Option<u16>,
    /// USB Product ID (PID), if known.
    pub product_id: Option<u16>,
    /// Version number (HID only).
    pub version: Option<u32>,
    /// Class-specific part.
    pub class: ClassInfo,
}

/// Class-specific fields of [`DeviceInfo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ClassInfo {
    Mouse(MouseDeviceInfo),
    Keyboard(KeyboardDeviceInfo),
    Hid(HidDeviceInfo),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseDeviceInfo {
    pub id: u32,
    pub button_count: u32,
    /// Samples per second. Zero for most USB mice.
    pub sample_rate: u32,
    pub has_horizontal_wheel: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardDeviceInfo {
    /// Keyboard type (`dwType`, 4 = enhanced 101/102-key).
    pub kind: u32,
    pub subtype: u32,
    pub mode: u32,
    pub function_keys: u32,
    pub indicators: u32,
    pub total_keys: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidDeviceInfo {
    /// HID Usage Page (e.g., `0x01` for Generic Desktop).
    pub usage_page: u16,
    /// HID Usage within the page (e.g., `0x04` Joystick, `0x05` Gamepad).
    pub usage: u16,
}

impl DeviceInfo {
    pub fn usage(&self) -> Option<(u16, u16)> {
        match self.class {
            ClassInfo::Hid(h) => Some((h.usage_page, h.usage)),
            _ => None,
        }
    }
}

/// Parsed Raw Input interface path.
///
/// `\\?\HID#VID_046D&PID_C52B&MI_01#7&1a2b&0&0000#{4d1e55b2-...}` splits into
/// enumerator `HID`, device id `VID_046D&PID_C52B&MI_01` and instance `7&1a2b&0&0000`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DevicePath {
    pub enumerator: String,
    pub device_id: String,
    pub instance: String,
}

impl DevicePath {
    /// Split an interface path. Returns `None` for paths that do not carry at least
    /// enumerator, device id and instance.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path
            .strip_prefix(r"\\?\")
            .or_else(|| path.strip_prefix(r"\??\"))
            .unwrap_or(path);
        let mut parts = trimmed.split('#');
        let enumerator = parts.next().filter(|s| !s.is_empty())?;
        let device_id = parts.next().filter(|s| !s.is_empty())?;
        let instance = parts.next().filter(|s| !s.is_empty())?;
        Some(Self {
            enumerator: enumerator.to_string(),
            device_id: device_id.to_string(),
            instance: instance.to_string(),
        })
    }

    /// Registry key (under `HKEY_LOCAL_MACHINE`) describing this device instance.
    pub fn registry_key(&self) -> String {
        format!(
            r"SYSTEM\CurrentControlSet\Enum\{}\{}\{}",
            self.enumerator, self.device_id, self.instance
        )
    }

    /// Remote-desktop redirected devices (`RDP_KBD`, `RDP_MOU`, ...).
    pub fn is_remote_desktop(&self) -> bool {
        self.device_id
            .get(..4)
            .map(|p| p.eq_ignore_ascii_case("RDP_"))
            .unwrap_or(false)
    }

    pub fn vendor_id(&self) -> Option<u16> {
        hex_tag(&self.device_id, "VID_")
    }

    pub fn product_id(&self) -> Option<u16> {
        hex_tag(&self.device_id, "PID_")
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, r"{}\{}\{}", self.enumerator, self.device_id, self.instance)
    }
}

/// Find `TAG` followed by four hex digits in an `&`-separated id.
fn hex_tag(device_id: &str, tag: &str) -> Option<u16> {
    device_id.split('&').find_map(|seg| {
        let head = seg.get(..tag.len())?;
        if !head.eq_ignore_ascii_case(tag) {
            return None;
        }
        let digits = seg.get(tag.len()..tag.len() + 4)?;
        u16::from_str_radix(digits, 16).ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MOUSE: &str = r"\\?\HID#VID_046D&PID_C52B&MI_01&Col01#7&1a2b3c&0&0000#{378de44c-56ef-11d1-bc8c-00a0c91405dd}";

    #[test]
    fn splits_interface_path() {
        let p = DevicePath::parse(MOUSE).unwrap();
        assert_eq!(p.enumerator, "HID");
        assert_eq!(p.device_id, "VID_046D&PID_C52B&MI_01&Col01");
        assert_eq!(p.instance, "7&1a2b3c&0&0000");
        assert_eq!(
            p.registry_key(),
            r"SYSTEM\CurrentControlSet\Enum\HID\VID_046D&PID_C52B&MI_01&Col01\7&1a2b3c&0&0000"
        );
        assert_eq!(p.vendor_id(), Some(0x046D));
        assert_eq!(p.product_id(), Some(0xC52B));
        assert!(!p.is_remote_desktop());
    }

    #[test]
    fn recognises_remote_desktop_devices() {
        let p = DevicePath::parse(r"\\?\Root#RDP_KBD#0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}")
            .unwrap();
        assert!(p.is_remote_desktop());
        assert_eq!(p.vendor_id(), None);
    }

    #[test]
    fn rejects_short_paths() {
        assert_eq!(DevicePath::parse(r"\\?\HID"), None);
        assert_eq!(DevicePath::parse(""), None);
        assert_eq!(DevicePath::parse(r"\\?\ACPI#PNP0303"), None);
    }

    #[test]
    fn info_serializes_with_class_tag() {
        let info = DeviceInfo {
            vendor_id: Some(0x044F),
            product_id: Some(0xB10A),
            version: Some(0x100),
            class: ClassInfo::Hid(HidDeviceInfo {
                usage_page: 1,
                usage: 4,
            }),
        };
        let v = serde_json::to_value(&info).unwrap();
        assert_eq!(v["class"]["class"], "hid");
        assert_eq!(v["class"]["usage"], 4);
        assert_eq!(info.usage(), Some((1, 4)));
    }
}
