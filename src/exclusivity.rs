//! Process-wide exclusivity flags.
//!
//! Mouse exclusivity is never expressed through OS registration flags: the message hook
//! reads [`ExclusivityController::is_mouse_exclusive`] on every message and swallows the
//! legacy mouse messages itself. Keyboard exclusivity is an OS flag (`RIDEV_NOLEGACY`);
//! the controller only mirrors it for reporting.
//!
//! A process-wide instance is available through [`ExclusivityController::global`]; tests
//! and embedders that run several sessions inject their own.

use crate::device::DeviceClass;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

#[derive(Debug, Default)]
pub struct ExclusivityController {
    mouse: AtomicBool,
    keyboard: AtomicBool,
}

static GLOBAL: OnceLock<Arc<ExclusivityController>> = OnceLock::new();

impl ExclusivityController {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide controller.
    pub fn global() -> Arc<ExclusivityController> {
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    #[inline]
    pub fn is_mouse_exclusive(&self) -> bool {
        self.mouse.load(Ordering::Acquire)
    }

    pub fn set_mouse_exclusive(&self, enabled: bool) {
        self.mouse.store(enabled, Ordering::Release);
    }

    #[inline]
    pub fn is_keyboard_exclusive(&self) -> bool {
        self.keyboard.load(Ordering::Acquire)
    }

    pub(crate) fn set_keyboard_exclusive(&self, enabled: bool) {
        self.keyboard.store(enabled, Ordering::Release);
    }

    pub fn is_exclusive(&self, class: DeviceClass) -> bool {
        match class {
            DeviceClass::Mouse => self.is_mouse_exclusive(),
            DeviceClass::Keyboard => self.is_keyboard_exclusive(),
            DeviceClass::OtherHid => false,
        }
    }
}
