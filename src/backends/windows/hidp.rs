#![cfg(all(target_os = "windows", feature = "hid"))]

//! `HidParserApi` over hid.dll.
//!
//! The blob is the `RIDI_PREPARSEDDATA` copy held by [`PreparsedData`]; the `HidP_*`
//! functions accept it in place of the pointer `HidD_GetPreparsedData` would return.
//! Only input-report capabilities are read.

use super::Win32;
use crate::api::HidParserApi;
use crate::buffer::PreparsedData;
use crate::error::{Error, Result};
use crate::hid_caps::{ButtonCap, HidCaps, UsageSpan, ValueCap};
use tracing::debug;
use windows_sys::Win32::Devices::HumanInterfaceDevice::*;
use windows_sys::Win32::Foundation::NTSTATUS;

const STATUS_SUCCESS: NTSTATUS = HIDP_STATUS_SUCCESS;
const STATUS_BUFFER_TOO_SMALL: NTSTATUS = HIDP_STATUS_BUFFER_TOO_SMALL;
const STATUS_INVALID_PREPARSED_DATA: NTSTATUS = HIDP_STATUS_INVALID_PREPARSED_DATA;

fn ppd(bytes: &[u8]) -> PHIDP_PREPARSED_DATA {
    bytes.as_ptr() as PHIDP_PREPARSED_DATA
}

fn check(op: &'static str, status: NTSTATUS) -> Result<()> {
    match status {
        STATUS_SUCCESS => Ok(()),
        STATUS_INVALID_PREPARSED_DATA => Err(Error::PreparsedDataInvalid),
        other => Err(Error::DeviceQueryFailed {
            op,
            code: other as u32,
        }),
    }
}

/// Fill a capability array, retrying once with the size HIDP asks for.
fn enumerate<T: Copy>(
    op: &'static str,
    hint: u16,
    mut call: impl FnMut(*mut T, &mut u16) -> NTSTATUS,
) -> Result<Vec<T>> {
    let mut len = hint.max(1);
    for _ in 0..2 {
        let mut caps: Vec<T> = vec![unsafe { core::mem::zeroed() }; len as usize];
        let mut needed = len;
        let status = call(caps.as_mut_ptr(), &mut needed);
        if status == STATUS_BUFFER_TOO_SMALL && needed > len {
            debug!(op, have = len, needed, "capability buffer too small, retrying");
            len = needed;
            continue;
        }
        check(op, status)?;
        caps.truncate(needed as usize);
        return Ok(caps);
    }
    Err(Error::BufferTooSmall {
        op,
        required: len as usize,
        capacity: len as usize,
    })
}

impl HidParserApi for Win32 {
    fn caps(&self, blob: &PreparsedData) -> Result<HidCaps> {
        let bytes = blob.checked()?;
        let mut caps: HIDP_CAPS = unsafe { core::mem::zeroed() };
        check("HidP_GetCaps", unsafe { HidP_GetCaps(ppd(bytes), &mut caps) })?;
        Ok(HidCaps {
            usage_page: caps.UsagePage,
            usage: caps.Usage,
            input_report_len: caps.InputReportByteLength,
            button_caps: caps.NumberInputButtonCaps,
            value_caps: caps.NumberInputValueCaps,
            data_indices: caps.NumberInputDataIndices,
        })
    }

    fn button_caps(&self, blob: &PreparsedData, caps: &HidCaps) -> Result<Vec<ButtonCap>> {
        let bytes = blob.checked()?;
        let raw: Vec<HIDP_BUTTON_CAPS> = enumerate("HidP_GetButtonCaps", caps.button_caps, |ptr, len| unsafe {
            HidP_GetButtonCaps(HidP_Input, ptr, len, ppd(bytes))
        })?;
        Ok(raw
            .iter()
            .map(|c| ButtonCap {
                usage_page: c.UsagePage,
                report_id: c.ReportID,
                usages: unsafe {
                    if c.IsRange != 0 {
                        UsageSpan::Range {
                            min: c.Anonymous.Range.UsageMin,
                            max: c.Anonymous.Range.UsageMax,
                        }
                    } else {
                        UsageSpan::Single(c.Anonymous.NotRange.Usage)
                    }
                },
            })
            .collect())
    }

    fn value_caps(&self, blob: &PreparsedData, caps: &HidCaps) -> Result<Vec<ValueCap>> {
        let bytes = blob.checked()?;
        let raw: Vec<HIDP_VALUE_CAPS> = enumerate("HidP_GetValueCaps", caps.value_caps, |ptr, len| unsafe {
            HidP_GetValueCaps(HidP_Input, ptr, len, ppd(bytes))
        })?;
        Ok(raw
            .iter()
            .map(|c| ValueCap {
                usage_page: c.UsagePage,
                report_id: c.ReportID,
                usages: unsafe {
                    if c.IsRange != 0 {
                        UsageSpan::Range {
                            min: c.Anonymous.Range.UsageMin,
                            max: c.Anonymous.Range.UsageMax,
                        }
                    } else {
                        UsageSpan::Single(c.Anonymous.NotRange.Usage)
                    }
                },
                logical_min: c.LogicalMin,
                logical_max: c.LogicalMax,
                bit_size: c.BitSize,
            })
            .collect())
    }
}
