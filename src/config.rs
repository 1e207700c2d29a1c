//! Session configuration.
//!
//! ```toml
//! background = true
//! standard_devices = ["keyboard", "mouse", "joystick", "gamepad"]
//! keyboard_exclusive = false
//! mouse_exclusive = true
//! skip_remote_desktop = true
//! ```
//!
//! Every key is optional; unknown keys are rejected so typos do not silently fall back
//! to defaults.

use crate::error::{Error, Result};
use crate::registration::Interest;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RawInputConfig {
    /// Receive input while the window is in the background (`RIDEV_INPUTSINK`).
    pub background: bool,
    /// Interests registered when a window is attached and removed when it is detached.
    pub standard_devices: Vec<Interest>,
    /// Suppress legacy keyboard messages (`WM_KEYDOWN`, `WM_CHAR`, ...) at attach.
    pub keyboard_exclusive: bool,
    /// Swallow legacy mouse messages in the hook at attach.
    pub mouse_exclusive: bool,
    /// Ignore devices redirected by a remote-desktop session.
    pub skip_remote_desktop: bool,
}

impl Default for RawInputConfig {
    fn default() -> Self {
        Self {
            background: true,
            standard_devices: Interest::STANDARD.to_vec(),
            keyboard_exclusive: false,
            mouse_exclusive: false,
            skip_remote_desktop: true,
        }
    }
}

impl RawInputConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }
}
