//! Handles and identities.
//!
//! Raw Input talks about devices and windows through opaque OS handles. This module
//! wraps them in small `Copy` newtypes so they can be used as map keys and logged
//! without leaking raw pointers across component boundaries.
//!
//! ## Identity vs handle
//! - [`DeviceHandle`] is assigned by the OS and is only stable while the device stays
//!   attached. It is the **only** valid lookup key inside one process session.
//! - [`DeviceIdentity`] is chosen by the application (or derived from the device path
//!   via [`DeviceIdentity::from_path`]) and names a device independently of its handle.
//! - Device paths are descriptive; never key a map on them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// OS-assigned device handle (`RAWINPUTDEVICELIST::hDevice`). Not ownership-bearing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DeviceHandle(pub isize);

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Native window handle (`HWND`) owned by the windowing collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Address of a window procedure as stored in the window's `GWLP_WNDPROC` slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct WndProcPtr(pub usize);

impl WndProcPtr {
    #[inline]
    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WndProcPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Per-message input handle (`HRAWINPUT`, carried in `WM_INPUT`'s `lParam`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct RawInputHandle(pub isize);

/// Device class reported by Raw Input (`RIM_TYPE*`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mouse,
    Keyboard,
    OtherHid,
}

impl DeviceClass {
    /// Map a `RIM_TYPE*` discriminant.
    pub fn from_raw(kind: u32) -> Option<Self> {
        match kind {
            crate::native::RIM_TYPEMOUSE => Some(Self::Mouse),
            crate::native::RIM_TYPEKEYBOARD => Some(Self::Keyboard),
            crate::native::RIM_TYPEHID => Some(Self::OtherHid),
            _ => None,
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Mouse => crate::native::RIM_TYPEMOUSE,
            Self::Keyboard => crate::native::RIM_TYPEKEYBOARD,
            Self::OtherHid => crate::native::RIM_TYPEHID,
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mouse => "mouse",
            Self::Keyboard => "keyboard",
            Self::OtherHid => "hid",
        })
    }
}

/// Application-chosen logical device id, printed in UUID form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceIdentity(Uuid);

/// Name-based UUID namespace for identities derived from device paths.
const PATH_NAMESPACE: Uuid = Uuid::from_u128(0x7261_7774_6170_4d00_8e71_6465_7670_6174);

impl DeviceIdentity {
    /// The all-zero identity.
    pub const NIL: Self = Self(Uuid::nil());

    pub const fn from_u128(v: u128) -> Self {
        Self(Uuid::from_u128(v))
    }

    pub const fn as_u128(self) -> u128 {
        self.0.as_u128()
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Deterministic version 5 identity derived from a device path.
    ///
    /// The path is lower-cased first; Windows reports the same interface path with
    /// varying case depending on the API used.
    pub fn from_path(path: &str) -> Self {
        Self(Uuid::new_v5(&PATH_NAMESPACE, path.to_lowercase().as_bytes()))
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for DeviceIdentity {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
