//! Decoded Raw Input events.
//!
//! A [`RawInputEvent`] is what consumers see for every routed `WM_INPUT`: the logical
//! device identity, its class, and the typed payload decoded from the OS buffer.
//!
//! ## Conventions
//! - Mouse deltas are reported in **raw OS units** (counts) as provided by Raw Input.
//!   When [`MousePayload::is_absolute`] is set they are normalized `0..=65535` coordinates.
//! - Wheel deltas are reported in **raw WHEEL_DELTA units** (typically ±120 per notch).
//! - Keyboard identity is `(scan_code, extended)` and can be packed into a `u16` via
//!   [`KeyboardPayload::key_index`]. This is a stable binding key, not a character.
//! - HID reports are raw bytes; no usage decoding happens here.

use crate::device::{DeviceClass, DeviceHandle, DeviceIdentity};
use crate::native::{
    MOUSE_MOVE_ABSOLUTE, MOUSE_VIRTUAL_DESKTOP, RI_MOUSE_BUTTON_4_DOWN, RI_MOUSE_BUTTON_4_UP,
    RI_MOUSE_BUTTON_5_DOWN, RI_MOUSE_BUTTON_5_UP, RI_MOUSE_LEFT_BUTTON_DOWN,
    RI_MOUSE_LEFT_BUTTON_UP, RI_MOUSE_MIDDLE_BUTTON_DOWN, RI_MOUSE_MIDDLE_BUTTON_UP,
    RI_MOUSE_RIGHT_BUTTON_DOWN, RI_MOUSE_RIGHT_BUTTON_UP,
};
use serde::Serialize;

/// `RAWKEYBOARD`, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KeyboardPayload {
    /// Virtual-key code (`VK_*`).
    pub virtual_key: u16,
    /// Hardware scan code (`MakeCode`, layout-independent).
    pub scan_code: u16,
    /// Raw `RI_KEY_*` flags.
    pub flags: u16,
    /// `true` for key-up (break), `false` for key-down (make).
    pub is_break: bool,
    /// E0/E1 prefix present.
    pub is_extended: bool,
    /// Corresponding window message (`WM_KEYDOWN`, `WM_SYSKEYUP`, ...).
    pub message: u32,
    pub extra: u32,
}

impl KeyboardPayload {
    /// Pack the key identity into a stable `u16`.
    ///
    /// Layout:
    /// - low 15 bits = scancode
    /// - high bit    = extended flag
    #[inline]
    pub fn key_index(&self) -> u16 {
        let mut idx = self.scan_code & 0x7FFF;
        if self.is_extended {
            idx |= 0x8000;
        }
        idx
    }
}

/// Mouse buttons Raw Input reports transitions for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    X1,
    X2,
}

const BUTTON_EDGES: [(MouseButton, u16, u16); 5] = [
    (MouseButton::Left, RI_MOUSE_LEFT_BUTTON_DOWN, RI_MOUSE_LEFT_BUTTON_UP),
    (MouseButton::Right, RI_MOUSE_RIGHT_BUTTON_DOWN, RI_MOUSE_RIGHT_BUTTON_UP),
    (MouseButton::Middle, RI_MOUSE_MIDDLE_BUTTON_DOWN, RI_MOUSE_MIDDLE_BUTTON_UP),
    (MouseButton::X1, RI_MOUSE_BUTTON_4_DOWN, RI_MOUSE_BUTTON_4_UP),
    (MouseButton::X2, RI_MOUSE_BUTTON_5_DOWN, RI_MOUSE_BUTTON_5_UP),
];

/// `RAWMOUSE`, decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct MousePayload {
    /// Raw `usFlags` (`MOUSE_MOVE_*`).
    pub flags: u16,
    /// `usButtonFlags` bitfield (`RI_MOUSE_*`).
    pub button_flags: u16,
    pub button_data: u16,
    pub raw_buttons: u32,
    pub last_x: i32,
    pub last_y: i32,
    pub extra: u32,
    /// Vertical wheel delta (0 unless `RI_MOUSE_WHEEL` is set).
    pub wheel_delta: i16,
    /// Horizontal wheel delta (0 unless `RI_MOUSE_HWHEEL` is set).
    pub hwheel_delta: i16,
}

impl MousePayload {
    pub fn is_absolute(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE != 0
    }

    pub fn is_virtual_desktop(&self) -> bool {
        self.flags & MOUSE_VIRTUAL_DESKTOP != 0
    }

    /// Button edges carried by this packet, as `(button, pressed)`.
    ///
    /// One packet may carry both the press and the release of the same button; the
    /// press is listed first.
    pub fn transitions(&self) -> Vec<(MouseButton, bool)> {
        let mut out = Vec::new();
        for (button, down, up) in BUTTON_EDGES {
            if self.button_flags & down != 0 {
                out.push((button, true));
            }
            if self.button_flags & up != 0 {
                out.push((button, false));
            }
        }
        out
    }
}

/// `RAWHID`, decoded. `data` holds `count` reports of `size_hid` bytes each.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HidPayload {
    pub size_hid: u32,
    pub count: u32,
    pub data: Vec<u8>,
}

impl HidPayload {
    /// Iterate the individual fixed-size reports.
    pub fn reports(&self) -> impl Iterator<Item = &[u8]> {
        let size = (self.size_hid as usize).max(1);
        self.data.chunks(size).take(self.count as usize)
    }
}

/// Typed payload of one `WM_INPUT`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawPayload {
    Keyboard(KeyboardPayload),
    Mouse(MousePayload),
    Hid(HidPayload),
}

impl RawPayload {
    pub fn class(&self) -> DeviceClass {
        match self {
            Self::Keyboard(_) => DeviceClass::Keyboard,
            Self::Mouse(_) => DeviceClass::Mouse,
            Self::Hid(_) => DeviceClass::OtherHid,
        }
    }
}

/// One routed input notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RawInputEvent {
    /// Logical device the handle resolved to.
    pub identity: DeviceIdentity,
    /// OS handle that produced the packet (diagnostic only).
    pub device: DeviceHandle,
    pub class: DeviceClass,
    pub payload: RawPayload,
}

impl RawInputEvent {
    pub fn keyboard(&self) -> Option<&KeyboardPayload> {
        match &self.payload {
            RawPayload::Keyboard(k) => Some(k),
            _ => None,
        }
    }

    pub fn mouse(&self) -> Option<&MousePayload> {
        match &self.payload {
            RawPayload::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn hid(&self) -> Option<&HidPayload> {
        match &self.payload {
            RawPayload::Hid(h) => Some(h),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(button_flags: u16) -> MousePayload {
        MousePayload {
            flags: 0,
            button_flags,
            button_data: 0,
            raw_buttons: 0,
            last_x: 0,
            last_y: 0,
            extra: 0,
            wheel_delta: 0,
            hwheel_delta: 0,
        }
    }

    #[test]
    fn key_index_sets_high_bit_for_extended() {
        let mut k = KeyboardPayload {
            virtual_key: 0x2E,
            scan_code: 0x53,
            flags: 0,
            is_break: false,
            is_extended: false,
            message: 0x0100,
            extra: 0,
        };
        assert_eq!(k.key_index(), 0x0053);
        k.is_extended = true;
        assert_eq!(k.key_index(), 0x8053);
    }

    #[test]
    fn transitions_list_press_before_release() {
        let m = mouse(RI_MOUSE_LEFT_BUTTON_DOWN | RI_MOUSE_LEFT_BUTTON_UP | RI_MOUSE_BUTTON_5_DOWN);
        assert_eq!(
            m.transitions(),
            vec![
                (MouseButton::Left, true),
                (MouseButton::Left, false),
                (MouseButton::X2, true)
            ]
        );
        assert!(mouse(0).transitions().is_empty());
    }

    #[test]
    fn absolute_and_virtual_desktop_flags() {
        let mut m = mouse(0);
        assert!(!m.is_absolute());
        m.flags = MOUSE_MOVE_ABSOLUTE | MOUSE_VIRTUAL_DESKTOP;
        assert!(m.is_absolute());
        assert!(m.is_virtual_desktop());
    }

    #[test]
    fn hid_reports_split_by_declared_size() {
        let h = HidPayload {
            size_hid: 2,
            count: 3,
            data: vec![1, 2, 3, 4, 5, 6],
        };
        let reports: Vec<&[u8]> = h.reports().collect();
        assert_eq!(reports, vec![&[1u8, 2][..], &[3, 4][..], &[5, 6][..]]);
    }
}
