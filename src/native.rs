//! Win32 Raw Input structure layouts and constants.
//!
//! The OS hands back `RAWINPUT` and `RID_DEVICE_INFO` blocks as variable-sized byte
//! buffers. Instead of casting those buffers to `#[repr(C)]` structs, this module reads
//! fields at their documented offsets (little-endian, host pointer width). Every read is
//! bounds-checked; a short buffer is reported as [`Error::MalformedPayload`].
//!
//! Layouts (offsets in bytes, `P` = pointer size):
//! - `RAWINPUTHEADER`: `dwType@0 u32`, `dwSize@4 u32`, `hDevice@8 ptr`, `wParam@8+P ptr`
//! - `RAWMOUSE` (24): `usFlags@0`, `usButtonFlags@4`, `usButtonData@6`, `ulRawButtons@8`,
//!   `lLastX@12`, `lLastY@16`, `ulExtraInformation@20`
//! - `RAWKEYBOARD` (16): `MakeCode@0`, `Flags@2`, `Reserved@4`, `VKey@6`, `Message@8`,
//!   `ExtraInformation@12`
//! - `RAWHID` (8 + n): `dwSizeHid@0`, `dwCount@4`, `bRawData@8`
//! - `RID_DEVICE_INFO` (32): `cbSize@0`, `dwType@4`, class union `@8`

use crate::device::DeviceHandle;
use crate::error::{Error, Result};
use crate::event::{HidPayload, KeyboardPayload, MousePayload, RawPayload};
use crate::metadata::{ClassInfo, DeviceInfo, HidDeviceInfo, KeyboardDeviceInfo, MouseDeviceInfo};

pub const WM_INPUT: u32 = 0x00FF;

pub const WM_MOUSEMOVE: u32 = 0x0200;
pub const WM_LBUTTONDOWN: u32 = 0x0201;
pub const WM_LBUTTONUP: u32 = 0x0202;
pub const WM_LBUTTONDBLCLK: u32 = 0x0203;
pub const WM_RBUTTONDOWN: u32 = 0x0204;
pub const WM_RBUTTONUP: u32 = 0x0205;
pub const WM_RBUTTONDBLCLK: u32 = 0x0206;
pub const WM_MBUTTONDOWN: u32 = 0x0207;
pub const WM_MBUTTONUP: u32 = 0x0208;
pub const WM_MBUTTONDBLCLK: u32 = 0x0209;
pub const WM_MOUSEWHEEL: u32 = 0x020A;
pub const WM_XBUTTONDOWN: u32 = 0x020B;
pub const WM_XBUTTONUP: u32 = 0x020C;
pub const WM_XBUTTONDBLCLK: u32 = 0x020D;
pub const WM_MOUSEHWHEEL: u32 = 0x020E;
pub const WM_MOUSEHOVER: u32 = 0x02A1;
pub const WM_MOUSELEAVE: u32 = 0x02A3;

pub const RIM_TYPEMOUSE: u32 = 0;
pub const RIM_TYPEKEYBOARD: u32 = 1;
pub const RIM_TYPEHID: u32 = 2;

pub const RIDEV_REMOVE: u32 = 0x0000_0001;
pub const RIDEV_EXCLUDE: u32 = 0x0000_0010;
pub const RIDEV_PAGEONLY: u32 = 0x0000_0020;
pub const RIDEV_NOLEGACY: u32 = 0x0000_0030;
pub const RIDEV_INPUTSINK: u32 = 0x0000_0100;
pub const RIDEV_CAPTUREMOUSE: u32 = 0x0000_0200;
pub const RIDEV_NOHOTKEYS: u32 = 0x0000_0200;
pub const RIDEV_APPKEYS: u32 = 0x0000_0400;
pub const RIDEV_EXINPUTSINK: u32 = 0x0000_1000;
pub const RIDEV_DEVNOTIFY: u32 = 0x0000_2000;

pub const RIDI_PREPARSEDDATA: u32 = 0x2000_0005;
pub const RIDI_DEVICENAME: u32 = 0x2000_0007;
pub const RIDI_DEVICEINFO: u32 = 0x2000_000B;

pub const RID_INPUT: u32 = 0x1000_0003;

pub const RI_KEY_BREAK: u16 = 0x0001;
pub const RI_KEY_E0: u16 = 0x0002;
pub const RI_KEY_E1: u16 = 0x0004;

pub const RI_MOUSE_LEFT_BUTTON_DOWN: u16 = 0x0001;
pub const RI_MOUSE_LEFT_BUTTON_UP: u16 = 0x0002;
pub const RI_MOUSE_RIGHT_BUTTON_DOWN: u16 = 0x0004;
pub const RI_MOUSE_RIGHT_BUTTON_UP: u16 = 0x0008;
pub const RI_MOUSE_MIDDLE_BUTTON_DOWN: u16 = 0x0010;
pub const RI_MOUSE_MIDDLE_BUTTON_UP: u16 = 0x0020;
pub const RI_MOUSE_BUTTON_4_DOWN: u16 = 0x0040;
pub const RI_MOUSE_BUTTON_4_UP: u16 = 0x0080;
pub const RI_MOUSE_BUTTON_5_DOWN: u16 = 0x0100;
pub const RI_MOUSE_BUTTON_5_UP: u16 = 0x0200;
pub const RI_MOUSE_WHEEL: u16 = 0x0400;
pub const RI_MOUSE_HWHEEL: u16 = 0x0800;

pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;
pub const MOUSE_VIRTUAL_DESKTOP: u16 = 0x0002;

/// HID usage page / usages used for device registration.
pub const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
pub const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;
pub const HID_USAGE_GENERIC_JOYSTICK: u16 = 0x04;
pub const HID_USAGE_GENERIC_GAMEPAD: u16 = 0x05;
pub const HID_USAGE_GENERIC_KEYBOARD: u16 = 0x06;

const PTR: usize = core::mem::size_of::<usize>();

/// Size of `RAWINPUTHEADER` on this target.
pub const RAW_INPUT_HEADER_LEN: usize = 8 + 2 * PTR;
pub const RAW_MOUSE_LEN: usize = 24;
pub const RAW_KEYBOARD_LEN: usize = 16;
pub const RAW_HID_HEADER_LEN: usize = 8;
/// Size of `RID_DEVICE_INFO`.
pub const RID_DEVICE_INFO_LEN: usize = 32;
/// Size of `RAWINPUTDEVICELIST` (`HANDLE` + `DWORD`, padded to pointer alignment).
pub const RAW_INPUT_DEVICE_LIST_LEN: usize = 2 * PTR;

/// Is `msg` one of the legacy (cursor-mediated) client-area mouse messages?
pub fn is_legacy_mouse_message(msg: u32) -> bool {
    matches!(msg, WM_MOUSEMOVE..=WM_MOUSEHWHEEL | WM_MOUSEHOVER | WM_MOUSELEAVE)
}

// --------------------- field readers ---------------------

fn field<const N: usize>(buf: &[u8], at: usize, what: &'static str) -> Result<[u8; N]> {
    buf.get(at..at + N)
        .and_then(|s| s.try_into().ok())
        .ok_or(Error::MalformedPayload {
            what,
            needed: at + N,
            got: buf.len(),
        })
}

fn u16_at(buf: &[u8], at: usize, what: &'static str) -> Result<u16> {
    field::<2>(buf, at, what).map(u16::from_le_bytes)
}

fn u32_at(buf: &[u8], at: usize, what: &'static str) -> Result<u32> {
    field::<4>(buf, at, what).map(u32::from_le_bytes)
}

fn i32_at(buf: &[u8], at: usize, what: &'static str) -> Result<i32> {
    field::<4>(buf, at, what).map(i32::from_le_bytes)
}

fn ptr_at(buf: &[u8], at: usize, what: &'static str) -> Result<isize> {
    field::<PTR>(buf, at, what).map(isize::from_le_bytes)
}

// --------------------- RAWINPUT ---------------------

/// Decoded `RAWINPUTHEADER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawInputHeader {
    /// `RIM_TYPE*` discriminant.
    pub kind: u32,
    /// Total size of the `RAWINPUT` block (header + payload).
    pub size: u32,
    /// Device that produced the packet.
    pub device: DeviceHandle,
    /// `RIM_INPUT` (0) foreground or `RIM_INPUTSINK` (1) background delivery.
    pub wparam: usize,
}

pub fn parse_header(buf: &[u8]) -> Result<RawInputHeader> {
    const WHAT: &str = "RAWINPUTHEADER";
    Ok(RawInputHeader {
        kind: u32_at(buf, 0, WHAT)?,
        size: u32_at(buf, 4, WHAT)?,
        device: DeviceHandle(ptr_at(buf, 8, WHAT)?),
        wparam: ptr_at(buf, 8 + PTR, WHAT)? as usize,
    })
}

/// Decode the payload following a header. Returns `Ok(None)` for unknown `dwType`s.
pub fn parse_payload(header: &RawInputHeader, buf: &[u8]) -> Result<Option<RawPayload>> {
    let body = buf.get(RAW_INPUT_HEADER_LEN..).unwrap_or(&[]);
    match header.kind {
        RIM_TYPEKEYBOARD => parse_keyboard(body).map(|k| Some(RawPayload::Keyboard(k))),
        RIM_TYPEMOUSE => parse_mouse(body).map(|m| Some(RawPayload::Mouse(m))),
        RIM_TYPEHID => parse_hid(body).map(|h| Some(RawPayload::Hid(h))),
        _ => Ok(None),
    }
}

fn parse_keyboard(body: &[u8]) -> Result<KeyboardPayload> {
    const WHAT: &str = "RAWKEYBOARD";
    let flags = u16_at(body, 2, WHAT)?;
    Ok(KeyboardPayload {
        scan_code: u16_at(body, 0, WHAT)?,
        flags,
        virtual_key: u16_at(body, 6, WHAT)?,
        message: u32_at(body, 8, WHAT)?,
        extra: u32_at(body, 12, WHAT)?,
        is_break: flags & RI_KEY_BREAK != 0,
        is_extended: flags & (RI_KEY_E0 | RI_KEY_E1) != 0,
    })
}

fn parse_mouse(body: &[u8]) -> Result<MousePayload> {
    const WHAT: &str = "RAWMOUSE";
    let flags = u16_at(body, 0, WHAT)?;
    let button_flags = u16_at(body, 4, WHAT)?;
    let button_data = u16_at(body, 6, WHAT)?;

    let wheel_delta = if button_flags & RI_MOUSE_WHEEL != 0 {
        button_data as i16
    } else {
        0
    };
    let hwheel_delta = if button_flags & RI_MOUSE_HWHEEL != 0 {
        button_data as i16
    } else {
        0
    };

    Ok(MousePayload {
        flags,
        button_flags,
        button_data,
        raw_buttons: u32_at(body, 8, WHAT)?,
        last_x: i32_at(body, 12, WHAT)?,
        last_y: i32_at(body, 16, WHAT)?,
        extra: u32_at(body, 20, WHAT)?,
        wheel_delta,
        hwheel_delta,
    })
}

fn parse_hid(body: &[u8]) -> Result<HidPayload> {
    const WHAT: &str = "RAWHID";
    let size_hid = u32_at(body, 0, WHAT)?;
    let count = u32_at(body, 4, WHAT)?;
    let declared = (size_hid as usize).saturating_mul(count as usize);
    let data = body
        .get(RAW_HID_HEADER_LEN..RAW_HID_HEADER_LEN + declared)
        .ok_or(Error::MalformedPayload {
            what: WHAT,
            needed: RAW_HID_HEADER_LEN + declared,
            got: body.len(),
        })?;
    Ok(HidPayload {
        size_hid,
        count,
        data: data.to_vec(),
    })
}

// --------------------- RID_DEVICE_INFO ---------------------

/// Decode a `RID_DEVICE_INFO` block. Vendor/product of mice and keyboards are not
/// part of this block and are left `None`.
pub fn parse_device_info(buf: &[u8]) -> Result<DeviceInfo> {
    const WHAT: &str = "RID_DEVICE_INFO";
    let kind = u32_at(buf, 4, WHAT)?;
    let u = 8;
    match kind {
        RIM_TYPEMOUSE => Ok(DeviceInfo {
            vendor_id: None,
            product_id: None,
            version: None,
            class: ClassInfo::Mouse(MouseDeviceInfo {
                id: u32_at(buf, u, WHAT)?,
                button_count: u32_at(buf, u + 4, WHAT)?,
                sample_rate: u32_at(buf, u + 8, WHAT)?,
                has_horizontal_wheel: u32_at(buf, u + 12, WHAT)? != 0,
            }),
        }),
        RIM_TYPEKEYBOARD => Ok(DeviceInfo {
            vendor_id: None,
            product_id: None,
            version: None,
            class: ClassInfo::Keyboard(KeyboardDeviceInfo {
                kind: u32_at(buf, u, WHAT)?,
                subtype: u32_at(buf, u + 4, WHAT)?,
                mode: u32_at(buf, u + 8, WHAT)?,
                function_keys: u32_at(buf, u + 12, WHAT)?,
                indicators: u32_at(buf, u + 16, WHAT)?,
                total_keys: u32_at(buf, u + 20, WHAT)?,
            }),
        }),
        RIM_TYPEHID => Ok(DeviceInfo {
            vendor_id: Some(u32_at(buf, u, WHAT)? as u16),
            product_id: Some(u32_at(buf, u + 4, WHAT)? as u16),
            version: Some(u32_at(buf, u + 8, WHAT)?),
            class: ClassInfo::Hid(HidDeviceInfo {
                usage_page: u16_at(buf, u + 12, WHAT)?,
                usage: u16_at(buf, u + 14, WHAT)?,
            }),
        }),
        other => Err(Error::InvalidState(format!(
            "unknown RID_DEVICE_INFO type {other}"
        ))),
    }
}

/// Decode a `RIDI_DEVICENAME` buffer (UTF-16LE, NUL-terminated).
pub fn decode_wide(buf: &[u8]) -> String {
    let mut wide: Vec<u16> = buf
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    while wide.last() == Some(&0) {
        wide.pop();
    }
    String::from_utf16_lossy(&wide)
}

/// Builders for synthetic OS buffers used by tests and the mock backend.
#[cfg(test)]
pub(crate) mod build {
    use super::*;

    pub fn header(kind: u32, total: usize, device: DeviceHandle) -> Vec<u8> {
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&device.0.to_le_bytes());
        out.extend_from_slice(&0usize.to_le_bytes());
        out
    }

    pub fn keyboard(device: DeviceHandle, vkey: u16, make: u16, flags: u16) -> Vec<u8> {
        let mut out = header(RIM_TYPEKEYBOARD, RAW_INPUT_HEADER_LEN + RAW_KEYBOARD_LEN, device);
        out.extend_from_slice(&make.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&vkey.to_le_bytes());
        let msg: u32 = if flags & RI_KEY_BREAK != 0 { 0x0101 } else { 0x0100 };
        out.extend_from_slice(&msg.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    pub fn mouse(
        device: DeviceHandle,
        flags: u16,
        button_flags: u16,
        button_data: u16,
        dx: i32,
        dy: i32,
    ) -> Vec<u8> {
        let mut out = header(RIM_TYPEMOUSE, RAW_INPUT_HEADER_LEN + RAW_MOUSE_LEN, device);
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&button_flags.to_le_bytes());
        out.extend_from_slice(&button_data.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&dx.to_le_bytes());
        out.extend_from_slice(&dy.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out
    }

    pub fn hid(device: DeviceHandle, size_hid: u32, reports: &[&[u8]]) -> Vec<u8> {
        let body = RAW_HID_HEADER_LEN + size_hid as usize * reports.len();
        let mut out = header(RIM_TYPEHID, RAW_INPUT_HEADER_LEN + body, device);
        out.extend_from_slice(&size_hid.to_le_bytes());
        out.extend_from_slice(&(reports.len() as u32).to_le_bytes());
        for r in reports {
            out.extend_from_slice(r);
        }
        out
    }

    fn info(kind: u32, words: &[u32]) -> Vec<u8> {
        let mut out = Vec::with_capacity(RID_DEVICE_INFO_LEN);
        out.extend_from_slice(&(RID_DEVICE_INFO_LEN as u32).to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        for w in words {
            out.extend_from_slice(&w.to_le_bytes());
        }
        out.resize(RID_DEVICE_INFO_LEN, 0);
        out
    }

    pub fn mouse_info(buttons: u32, sample_rate: u32, hwheel: bool) -> Vec<u8> {
        info(RIM_TYPEMOUSE, &[0x100, buttons, sample_rate, hwheel as u32])
    }

    pub fn keyboard_info(subtype: u32, function_keys: u32, total_keys: u32) -> Vec<u8> {
        info(RIM_TYPEKEYBOARD, &[4, subtype, 1, function_keys, 3, total_keys])
    }

    pub fn hid_info(vid: u16, pid: u16, version: u32, usage_page: u16, usage: u16) -> Vec<u8> {
        let usages = (usage_page as u32) | ((usage as u32) << 16);
        info(RIM_TYPEHID, &[vid as u32, pid as u32, version, usages])
    }

    pub fn wide(s: &str) -> Vec<u8> {
        s.encode_utf16()
            .chain(std::iter::once(0))
            .flat_map(|u| u.to_le_bytes())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyboard_packet_decodes_break_and_extended() {
        let buf = build::keyboard(DeviceHandle(0x42), 0x25, 0x4B, RI_KEY_BREAK | RI_KEY_E0);
        let hdr = parse_header(&buf).unwrap();
        assert_eq!(hdr.kind, RIM_TYPEKEYBOARD);
        assert_eq!(hdr.device, DeviceHandle(0x42));
        assert_eq!(hdr.size as usize, buf.len());

        let Some(RawPayload::Keyboard(k)) = parse_payload(&hdr, &buf).unwrap() else {
            panic!("expected keyboard payload");
        };
        assert_eq!(k.virtual_key, 0x25);
        assert_eq!(k.scan_code, 0x4B);
        assert!(k.is_break);
        assert!(k.is_extended);
        assert_eq!(k.message, 0x0101);
    }

    #[test]
    fn mouse_wheel_delta_is_signed() {
        let buf = build::mouse(DeviceHandle(7), 0, RI_MOUSE_WHEEL, (-120i16) as u16, 3, -4);
        let hdr = parse_header(&buf).unwrap();
        let Some(RawPayload::Mouse(m)) = parse_payload(&hdr, &buf).unwrap() else {
            panic!("expected mouse payload");
        };
        assert_eq!(m.wheel_delta, -120);
        assert_eq!(m.hwheel_delta, 0);
        assert_eq!((m.last_x, m.last_y), (3, -4));
        assert!(!m.is_absolute());
    }

    #[test]
    fn hid_payload_respects_declared_size() {
        let buf = build::hid(DeviceHandle(9), 3, &[&[1, 2, 3], &[4, 5, 6]]);
        let hdr = parse_header(&buf).unwrap();
        let Some(RawPayload::Hid(h)) = parse_payload(&hdr, &buf).unwrap() else {
            panic!("expected hid payload");
        };
        assert_eq!(h.size_hid, 3);
        assert_eq!(h.count, 2);
        assert_eq!(h.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let mut buf = build::mouse(DeviceHandle(7), 0, 0, 0, 1, 1);
        buf.truncate(RAW_INPUT_HEADER_LEN + 10);
        let hdr = parse_header(&buf).unwrap();
        assert!(matches!(
            parse_payload(&hdr, &buf),
            Err(Error::MalformedPayload { what: "RAWMOUSE", .. })
        ));
        assert!(matches!(
            parse_header(&buf[..6]),
            Err(Error::MalformedPayload { .. })
        ));
    }

    #[test]
    fn hid_device_info_carries_usage() {
        let info = parse_device_info(&build::hid_info(0x044F, 0xB10A, 0x0100, 0x01, 0x04)).unwrap();
        assert_eq!(info.vendor_id, Some(0x044F));
        assert_eq!(info.product_id, Some(0xB10A));
        assert_eq!(info.version, Some(0x0100));
        match info.class {
            ClassInfo::Hid(h) => assert_eq!((h.usage_page, h.usage), (0x01, 0x04)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn legacy_mouse_messages() {
        for msg in [WM_MOUSEMOVE, WM_LBUTTONDBLCLK, WM_XBUTTONUP, WM_MOUSEHWHEEL, WM_MOUSEHOVER, WM_MOUSELEAVE] {
            assert!(is_legacy_mouse_message(msg), "{msg:#x}");
        }
        for msg in [WM_INPUT, 0x0100, 0x00A0, 0x02A2] {
            assert!(!is_legacy_mouse_message(msg), "{msg:#x}");
        }
    }

    #[test]
    fn wide_strings_drop_terminator() {
        assert_eq!(decode_wide(&build::wide(r"\\?\HID#X")), r"\\?\HID#X");
    }
}
