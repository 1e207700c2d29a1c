//! End-to-end flows against the in-memory OS: discover, attach, deliver `WM_INPUT`, detach.

use crate::api::mock::{preparsed, MockDevice, MockOs, FORWARDED, MOCK_ENTRY};
use crate::config::RawInputConfig;
use crate::device::{DeviceClass, DeviceHandle, DeviceIdentity, RawInputHandle, WindowHandle, WndProcPtr};
use crate::event::RawInputEvent;
use crate::eventbus::EventFilter;
use crate::exclusivity::ExclusivityController;
use crate::manager::RawInputManager;
use crate::native::{build, RIDEV_INPUTSINK, RI_KEY_BREAK, WM_INPUT};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const WND: WindowHandle = WindowHandle(0x0005_0A2C);
const ORIGINAL: WndProcPtr = WndProcPtr(0x7FF7_1000_2000);
const KBD: &str = r"\\?\HID#VID_046D&PID_C31C&MI_00#7&2a3b&0&0000#{884b96c3-56ef-11d1-bc8c-00a0c91405dd}";
const MOUSE: &str = r"\\?\HID#VID_1532&PID_0084&MI_00#7&1f&0&0000#{378de44c-56ef-11d1-bc8c-00a0c91405dd}";
const STICK: &str = r"\\?\HID#VID_044F&PID_B10A#8&3c&0&0000#{4d1e55b2-f16f-11cf-88cb-001111000030}";

fn session() -> RawInputManager<MockOs> {
    let os = MockOs::new();
    os.add_device(MockDevice::keyboard(0x10, KBD));
    os.add_device(MockDevice::mouse(0x11, MOUSE));
    os.add_device(MockDevice::hid(0x20, STICK, 0x04, preparsed(1, 4, &[(1, 12)], &[(0, 1023), (0, 1023), (0, 255)])));
    os.add_window(WND, ORIGINAL);
    RawInputManager::with_exclusivity(os, RawInputConfig::default(), Arc::new(ExclusivityController::new()))
}

fn recorder(m: &RawInputManager<MockOs>, filter: EventFilter) -> Rc<RefCell<Vec<RawInputEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let s = seen.clone();
    m.add_listener(move |e: &RawInputEvent| s.borrow_mut().push(e.clone()), filter, None)
        .unwrap();
    seen
}

#[test]
fn keyboard_session_round_trip() {
    let mut m = session();
    assert_eq!(m.discover().unwrap().len(), 3);
    m.attach(WND).unwrap();

    let os = m.api();
    assert_eq!(os.current_proc(WND), Some(MOCK_ENTRY));
    let regs = os.registrations();
    assert_eq!(regs.len(), 4);
    assert!(regs.iter().all(|r| r.target == Some(WND) && r.has_flag(RIDEV_INPUTSINK)));
    let listed = m.registrations().list_registered().unwrap();
    assert_eq!(listed.len(), 4);
    assert!(listed.iter().all(|r| r.target == Some(WND)));

    let seen = recorder(&m, EventFilter::All);
    os.queue_input(RawInputHandle(0x77), build::keyboard(DeviceHandle(0x10), 0x41, 0x1E, 0));
    os.queue_input(RawInputHandle(0x78), build::keyboard(DeviceHandle(0x10), 0x41, 0x1E, RI_KEY_BREAK));
    assert_eq!(os.send(WND, WM_INPUT, 0, 0x77), FORWARDED);
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(os.send(WND, WM_INPUT, 0, 0x78), FORWARDED);

    {
        let events = seen.borrow();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.identity == DeviceIdentity::from_path(KBD)));
        let down = events[0].keyboard().unwrap();
        assert_eq!((down.virtual_key, down.scan_code, down.is_break), (0x41, 0x1E, false));
        assert!(events[1].keyboard().unwrap().is_break);
    }

    // Every WM_INPUT reached the previous procedure.
    let forwarded = os.forwarded();
    assert_eq!(forwarded.iter().filter(|(p, m)| *p == ORIGINAL && m.msg == WM_INPUT).count(), 2);

    m.detach().unwrap();
    let os = m.api();
    assert!(os.registrations().is_empty());
    assert!(m.registrations().list_registered().unwrap().is_empty());
    assert_eq!(os.current_proc(WND), Some(ORIGINAL));
    assert!(!os.has_sink(WND));

    // Nothing reaches the listener once detached.
    os.queue_input(RawInputHandle(0x79), build::keyboard(DeviceHandle(0x10), 0x42, 0x30, 0));
    os.send(WND, WM_INPUT, 0, 0x79);
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn unknown_device_is_dropped_until_a_system_device_is_named() {
    let mut m = session();
    m.discover().unwrap();
    m.attach(WND).unwrap();
    let seen = recorder(&m, EventFilter::KeyboardOnly);

    let os = m.api();
    os.queue_input(RawInputHandle(0x80), build::keyboard(DeviceHandle(0x99), 0x20, 0x39, 0));
    assert_eq!(os.send(WND, WM_INPUT, 0, 0x80), FORWARDED);
    assert!(seen.borrow().is_empty());

    let system = DeviceIdentity::from_u128(0x5157_454D);
    m.set_system_device(DeviceClass::Keyboard, system).unwrap();
    m.api().send(WND, WM_INPUT, 0, 0x80);
    assert_eq!(seen.borrow().len(), 1);
    assert_eq!(seen.borrow()[0].identity, system);
}

#[test]
fn hid_reports_and_capabilities() {
    let mut m = session();
    m.discover().unwrap();
    m.attach(WND).unwrap();
    let seen = recorder(&m, EventFilter::HidOnly);

    let os = m.api();
    os.queue_input(RawInputHandle(0x90), build::hid(DeviceHandle(0x20), 3, &[&[1, 2, 3], &[4, 5, 6]]));
    os.queue_input(RawInputHandle(0x91), build::keyboard(DeviceHandle(0x10), 0x41, 0x1E, 0));
    os.send(WND, WM_INPUT, 0, 0x90);
    os.send(WND, WM_INPUT, 0, 0x91);

    {
        let events = seen.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].identity, DeviceIdentity::from_path(STICK));
        let reports: Vec<&[u8]> = events[0].hid().unwrap().reports().collect();
        assert_eq!(reports, vec![&[1u8, 2, 3][..], &[4, 5, 6][..]]);
    }

    let caps = m.capabilities(DeviceHandle(0x20)).unwrap();
    assert_eq!(caps.button_count, 12);
    assert_eq!(caps.axes.len(), 3);
    assert_eq!((caps.axes[2].minimum, caps.axes[2].maximum), (0, 255));
}

#[test]
fn dropping_the_manager_restores_the_window() {
    let os = Rc::new(MockOs::new());
    os.add_device(MockDevice::keyboard(0x10, KBD));
    os.add_window(WND, ORIGINAL);
    {
        let mut m = RawInputManager::with_shared(
            os.clone(),
            RawInputConfig::default(),
            Arc::new(ExclusivityController::new()),
        );
        m.discover().unwrap();
        m.attach(WND).unwrap();
        assert_eq!(os.registrations().len(), 4);
        assert!(os.has_sink(WND));
    }
    assert!(os.registrations().is_empty());
    assert_eq!(os.current_proc(WND), Some(ORIGINAL));
    assert!(!os.has_sink(WND));
}
