use crate::event::{RawInputEvent, RawPayload};
use crate::eventbus::InputListener;
use tracing::trace;

/// A listener that logs every routed event at `trace` level.
#[derive(Debug, Default)]
pub struct Logger;

impl Logger {
    pub fn new() -> Self {
        Logger
    }
}

impl InputListener for Logger {
    fn on_input(&mut self, event: &RawInputEvent) {
        match &event.payload {
            RawPayload::Keyboard(k) => trace!(
                identity = %event.identity,
                vkey = k.virtual_key,
                scan = k.scan_code,
                up = k.is_break,
                "keyboard"
            ),
            RawPayload::Mouse(m) => trace!(
                identity = %event.identity,
                dx = m.last_x,
                dy = m.last_y,
                buttons = m.button_flags,
                wheel = m.wheel_delta,
                "mouse"
            ),
            RawPayload::Hid(h) => trace!(
                identity = %event.identity,
                size = h.size_hid,
                count = h.count,
                "hid"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceHandle, DeviceIdentity};
    use crate::eventbus::{EventFilter, InputEventBus};
    use crate::native::{build, parse_header, parse_payload};

    #[test]
    fn logs_every_payload_kind() {
        let mut bus = InputEventBus::new();
        bus.add_listener(Logger::new(), EventFilter::All, None);
        for bytes in [
            build::keyboard(DeviceHandle(1), 0x41, 0x1E, 0),
            build::mouse(DeviceHandle(2), 0, 0x0001, 0, 4, -2),
            build::hid(DeviceHandle(3), 2, &[&[0xAA, 0x55]]),
        ] {
            let header = parse_header(&bytes).unwrap();
            let payload = parse_payload(&header, &bytes).unwrap().unwrap();
            bus.emit(&RawInputEvent {
                identity: DeviceIdentity::from_u128(7),
                device: header.device,
                class: payload.class(),
                payload,
            });
        }
        assert_eq!(bus.len(), 1);
    }
}
