//! Error type shared by every raw-input component.
//!
//! All failures are returned to the immediate caller as values. The only
//! conditions the crate accepts silently are an unresolved device handle during
//! dispatch and unhooking a hook that is already unhooked; neither produces an
//! [`Error`].

use crate::device::{DeviceHandle, WindowHandle};
use thiserror::Error;

/// Raw-input error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A two-call size negotiation still came up short after one retry
    /// (a device attached or changed between the probe and the fetch).
    #[error("{op}: buffer too small after retry (needed {required}, had {capacity})")]
    BufferTooSmall {
        op: &'static str,
        required: usize,
        capacity: usize,
    },

    /// The OS rejected a device query for a reason other than buffer sizing.
    #[error("{op} failed (os error {code})")]
    DeviceQueryFailed { op: &'static str, code: u32 },

    /// A null or empty preparsed HID blob was handed to the capability parser.
    #[error("preparsed HID data is empty or invalid")]
    PreparsedDataInvalid,

    /// The window procedure could not be subclassed.
    #[error("cannot hook window {window}: {reason}")]
    HookInstallFailed {
        window: WindowHandle,
        reason: String,
    },

    /// The OS refused a device-interest registration or removal.
    #[error("raw input registration failed: {op} (os error {code})")]
    RegistrationFailed { op: &'static str, code: u32 },

    /// A payload returned by the OS is shorter than the structure it claims to hold.
    #[error("malformed {what}: need {needed} bytes, got {got}")]
    MalformedPayload {
        what: &'static str,
        needed: usize,
        got: usize,
    },

    /// A route table maps one device handle to two identities.
    #[error("device handle {0} is mapped to more than one identity")]
    RouteConflict(DeviceHandle),

    /// An operation was called in a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
