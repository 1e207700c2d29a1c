//! Device-interest registration (`RegisterRawInputDevices`).
//!
//! The OS keeps one registration per usage page/usage per process and is the only source
//! of truth; nothing here keeps a local copy. Every decision re-reads the registered set
//! through [`RegistrationManager::list_registered`].

use crate::api::{RawInputApi, Registration};
use crate::buffer::query_sized;
use crate::device::{DeviceClass, WindowHandle};
use crate::error::Result;
use crate::exclusivity::ExclusivityController;
use crate::native::{
    HID_USAGE_GENERIC_GAMEPAD, HID_USAGE_GENERIC_JOYSTICK, HID_USAGE_GENERIC_KEYBOARD,
    HID_USAGE_GENERIC_MOUSE, HID_USAGE_PAGE_GENERIC, RIDEV_INPUTSINK, RIDEV_NOLEGACY,
    RIDEV_REMOVE,
};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info};

/// A device class (or raw HID usage) the application wants `WM_INPUT` for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Keyboard,
    Mouse,
    Joystick,
    Gamepad,
    Usage { page: u16, usage: u16 },
}

impl Interest {
    /// Keyboard, mouse, joystick and gamepad.
    pub const STANDARD: [Interest; 4] = [
        Interest::Keyboard,
        Interest::Mouse,
        Interest::Joystick,
        Interest::Gamepad,
    ];

    /// `(usage_page, usage)` pair the OS registers.
    pub fn usage(self) -> (u16, u16) {
        match self {
            Interest::Keyboard => (HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_KEYBOARD),
            Interest::Mouse => (HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_MOUSE),
            Interest::Joystick => (HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_JOYSTICK),
            Interest::Gamepad => (HID_USAGE_PAGE_GENERIC, HID_USAGE_GENERIC_GAMEPAD),
            Interest::Usage { page, usage } => (page, usage),
        }
    }

    pub fn matches(self, reg: &Registration) -> bool {
        self.usage() == (reg.usage_page, reg.usage)
    }

    /// Interest that delivers a device class, if the class has a fixed usage.
    pub fn for_class(class: DeviceClass) -> Option<Interest> {
        match class {
            DeviceClass::Keyboard => Some(Interest::Keyboard),
            DeviceClass::Mouse => Some(Interest::Mouse),
            DeviceClass::OtherHid => None,
        }
    }
}

/// Registers, lists and removes device interests for one process.
pub struct RegistrationManager<A: RawInputApi> {
    api: Rc<A>,
    exclusivity: Arc<ExclusivityController>,
}

impl<A: RawInputApi> RegistrationManager<A> {
    pub fn new(api: Rc<A>, exclusivity: Arc<ExclusivityController>) -> Self {
        Self { api, exclusivity }
    }

    pub fn exclusivity(&self) -> &Arc<ExclusivityController> {
        &self.exclusivity
    }

    /// Registrations the OS currently holds for this process.
    pub fn list_registered(&self) -> Result<Vec<Registration>> {
        let api = &*self.api;
        query_sized(
            "GetRegisteredRawInputDevices",
            || api.registered_len(),
            |buf| api.read_registered(buf),
        )
    }

    /// Register `interests` for `window`.
    ///
    /// Returns `Ok(false)` without touching the OS when registrations targeting `window`
    /// already exist. With `background`, input is delivered even when the window is not
    /// in the foreground (`RIDEV_INPUTSINK`). A keyboard registration carries
    /// `RIDEV_NOLEGACY` while keyboard exclusivity is on.
    pub fn register(&self, window: WindowHandle, interests: &[Interest], background: bool) -> Result<bool> {
        if self
            .list_registered()?
            .iter()
            .any(|r| r.target == Some(window))
        {
            debug!(%window, "window already registered, skipping");
            return Ok(false);
        }
        if interests.is_empty() {
            return Ok(false);
        }

        let regs: Vec<Registration> = interests
            .iter()
            .map(|&interest| {
                let (usage_page, usage) = interest.usage();
                let mut flags = if background { RIDEV_INPUTSINK } else { 0 };
                if interest == Interest::Keyboard && self.exclusivity.is_keyboard_exclusive() {
                    flags |= RIDEV_NOLEGACY;
                }
                Registration {
                    usage_page,
                    usage,
                    flags,
                    target: Some(window),
                }
            })
            .collect();

        self.api.register_devices(&regs)?;
        info!(%window, count = regs.len(), background, "registered raw input devices");
        Ok(true)
    }

    /// Remove every registration targeting `window`. Succeeds when there is none.
    pub fn unregister_all(&self, window: WindowHandle) -> Result<()> {
        let removals: Vec<Registration> = self
            .list_registered()?
            .into_iter()
            .filter(|r| r.target == Some(window))
            .map(removal)
            .collect();
        self.remove(removals)
    }

    /// Remove the standard device set (keyboard, mouse, joystick, gamepad), whichever
    /// window it targets.
    pub fn unregister_standard(&self) -> Result<()> {
        self.unregister_interests(&Interest::STANDARD)
    }

    /// Remove whichever of `interests` the OS currently holds, whichever window they target.
    pub fn unregister_interests(&self, interests: &[Interest]) -> Result<()> {
        let removals: Vec<Registration> = self
            .list_registered()?
            .into_iter()
            .filter(|r| interests.iter().any(|i| i.matches(r)))
            .map(removal)
            .collect();
        self.remove(removals)
    }

    fn remove(&self, removals: Vec<Registration>) -> Result<()> {
        if removals.is_empty() {
            return Ok(());
        }
        self.api.register_devices(&removals)?;
        debug!(count = removals.len(), "removed raw input registrations");
        Ok(())
    }

    /// Turn exclusive mode for `class` on or off.
    ///
    /// - Keyboard: re-registers the current keyboard registrations with `RIDEV_NOLEGACY`
    ///   toggled. Returns `Ok(false)` when no keyboard is registered.
    /// - Mouse: only flips the process-wide flag read by the message hook. Always `Ok(true)`.
    /// - Other HID: has no legacy messages; `Ok(false)`.
    pub fn set_exclusive(&self, class: DeviceClass, enabled: bool) -> Result<bool> {
        match class {
            DeviceClass::Mouse => {
                self.exclusivity.set_mouse_exclusive(enabled);
                info!(enabled, "mouse exclusivity");
                Ok(true)
            }
            DeviceClass::Keyboard => {
                let regs: Vec<Registration> = self
                    .list_registered()?
                    .into_iter()
                    .filter(|r| Interest::Keyboard.matches(r))
                    .map(|mut r| {
                        r.flags &= !RIDEV_NOLEGACY;
                        if enabled {
                            r.flags |= RIDEV_NOLEGACY;
                        }
                        r
                    })
                    .collect();
                if regs.is_empty() {
                    debug!(enabled, "no keyboard registered, exclusivity not applied");
                    return Ok(false);
                }
                self.api.register_devices(&regs)?;
                self.exclusivity.set_keyboard_exclusive(enabled);
                info!(enabled, "keyboard exclusivity");
                Ok(true)
            }
            DeviceClass::OtherHid => Ok(false),
        }
    }
}

fn removal(r: Registration) -> Registration {
    Registration {
        usage_page: r.usage_page,
        usage: r.usage,
        flags: RIDEV_REMOVE,
        target: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockOs;
    use crate::error::Error;

    const WND: WindowHandle = WindowHandle(0x1234);

    fn manager() -> (Rc<MockOs>, RegistrationManager<MockOs>) {
        let os = Rc::new(MockOs::new());
        let mgr = RegistrationManager::new(os.clone(), Arc::new(ExclusivityController::new()));
        (os, mgr)
    }

    #[test]
    fn register_then_list_is_a_superset() {
        let (_os, mgr) = manager();
        assert!(mgr.register(WND, &Interest::STANDARD, true).unwrap());
        let listed = mgr.list_registered().unwrap();
        for interest in Interest::STANDARD {
            let reg = listed.iter().find(|r| interest.matches(r)).unwrap();
            assert_eq!(reg.target, Some(WND));
            assert!(reg.has_flag(RIDEV_INPUTSINK));
        }
    }

    #[test]
    fn register_is_a_noop_when_window_already_registered() {
        let (os, mgr) = manager();
        assert!(mgr.register(WND, &[Interest::Keyboard], false).unwrap());
        assert!(!mgr.register(WND, &Interest::STANDARD, false).unwrap());
        assert_eq!(os.register_calls().len(), 1);
        assert_eq!(mgr.list_registered().unwrap().len(), 1);
    }

    #[test]
    fn unregister_all_twice_is_ok() {
        let (os, mgr) = manager();
        mgr.register(WND, &Interest::STANDARD, true).unwrap();
        mgr.unregister_all(WND).unwrap();
        assert!(mgr.list_registered().unwrap().is_empty());
        mgr.unregister_all(WND).unwrap();
        assert!(mgr.list_registered().unwrap().is_empty());
        // second call found nothing to remove and did not hit the OS
        assert_eq!(os.register_calls().len(), 2);
    }

    #[test]
    fn unregister_all_leaves_other_windows_alone() {
        let (_os, mgr) = manager();
        mgr.register(WND, &[Interest::Keyboard], false).unwrap();
        mgr.register(WindowHandle(0x99), &[Interest::Usage { page: 0x0C, usage: 0x01 }], false)
            .unwrap();
        mgr.unregister_all(WND).unwrap();
        let left = mgr.list_registered().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].target, Some(WindowHandle(0x99)));
    }

    #[test]
    fn unregister_standard_keeps_custom_usages() {
        let (_os, mgr) = manager();
        let consumer = Interest::Usage { page: 0x0C, usage: 0x01 };
        mgr.register(WND, &[Interest::Keyboard, Interest::Gamepad, consumer], true)
            .unwrap();
        mgr.unregister_standard().unwrap();
        let left = mgr.list_registered().unwrap();
        assert_eq!(left.len(), 1);
        assert!(consumer.matches(&left[0]));
    }

    #[test]
    fn keyboard_exclusivity_toggles_nolegacy() {
        let (_os, mgr) = manager();
        assert!(!mgr.set_exclusive(DeviceClass::Keyboard, true).unwrap());

        mgr.register(WND, &Interest::STANDARD, true).unwrap();
        assert!(mgr.set_exclusive(DeviceClass::Keyboard, true).unwrap());
        let kbd = mgr
            .list_registered()
            .unwrap()
            .into_iter()
            .find(|r| Interest::Keyboard.matches(r))
            .unwrap();
        assert!(kbd.has_flag(RIDEV_NOLEGACY));
        assert!(kbd.has_flag(RIDEV_INPUTSINK));
        assert!(mgr.exclusivity().is_keyboard_exclusive());

        assert!(mgr.set_exclusive(DeviceClass::Keyboard, false).unwrap());
        let kbd = mgr
            .list_registered()
            .unwrap()
            .into_iter()
            .find(|r| Interest::Keyboard.matches(r))
            .unwrap();
        assert!(!kbd.has_flag(RIDEV_NOLEGACY));
    }

    #[test]
    fn mouse_exclusivity_never_touches_the_os() {
        let (os, mgr) = manager();
        mgr.register(WND, &Interest::STANDARD, true).unwrap();
        let before = os.registrations();
        assert!(mgr.set_exclusive(DeviceClass::Mouse, true).unwrap());
        assert!(mgr.exclusivity().is_mouse_exclusive());
        assert_eq!(os.registrations(), before);
        assert!(!mgr.set_exclusive(DeviceClass::OtherHid, true).unwrap());
    }

    #[test]
    fn os_refusal_surfaces_as_registration_failed() {
        let (os, mgr) = manager();
        os.fail_register(Some(5));
        assert!(matches!(
            mgr.register(WND, &Interest::STANDARD, true),
            Err(Error::RegistrationFailed { code: 5, .. })
        ));
        assert!(mgr.list_registered().unwrap().is_empty());
    }
}
