//! HID capability parsing.
//!
//! A HID device's preparsed descriptor blob (`RIDI_PREPARSEDDATA`) is opaque; it is only
//! ever read through a [`HidParserApi`] (`HidP_GetCaps`, `HidP_GetButtonCaps`,
//! `HidP_GetValueCaps` on Windows). This module turns those records into the small
//! summary the router needs:
//!
//! - **Buttons:** `usage_max - usage_min + 1` of the first input button capability. A
//!   non-range capability counts as one button.
//! - **Axes:** one [`AxisRange`] per input value capability, logical min/max verbatim, in
//!   declaration order.
//!
//! ## Known limitation
//! Devices that declare several disjoint button ranges (e.g. buttons 1-8 and 17-24) are
//! under-counted: only the first capability is considered.

use crate::api::HidParserApi;
use crate::buffer::PreparsedData;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level descriptor summary (`HIDP_CAPS`, input side).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidCaps {
    pub usage_page: u16,
    pub usage: u16,
    pub input_report_len: u16,
    /// `NumberInputButtonCaps`.
    pub button_caps: u16,
    /// `NumberInputValueCaps`.
    pub value_caps: u16,
    pub data_indices: u16,
}

/// Usage(s) a capability record covers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageSpan {
    Range { min: u16, max: u16 },
    Single(u16),
}

impl UsageSpan {
    /// First usage of the span.
    pub fn first(&self) -> u16 {
        match *self {
            UsageSpan::Range { min, .. } => min,
            UsageSpan::Single(u) => u,
        }
    }

    /// Number of usages covered. An inverted range covers none.
    pub fn len(&self) -> u32 {
        match *self {
            UsageSpan::Range { min, max } if max >= min => (max - min) as u32 + 1,
            UsageSpan::Range { .. } => 0,
            UsageSpan::Single(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Input button capability (`HIDP_BUTTON_CAPS`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonCap {
    pub usage_page: u16,
    pub report_id: u8,
    pub usages: UsageSpan,
}

/// Input value capability (`HIDP_VALUE_CAPS`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueCap {
    pub usage_page: u16,
    pub report_id: u8,
    pub usages: UsageSpan,
    pub logical_min: i32,
    pub logical_max: i32,
    pub bit_size: u16,
}

/// Logical range of one value capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisRange {
    pub minimum: i32,
    pub maximum: i32,
}

/// Buttons and axes of one HID device. Built once per device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HidCapabilities {
    pub caps: HidCaps,
    pub button_count: u32,
    pub axes: Vec<AxisRange>,
}

/// Read the top-level caps.
pub fn get_capabilities<P>(parser: &P, blob: &PreparsedData) -> Result<HidCaps>
where
    P: HidParserApi + ?Sized,
{
    blob.checked()?;
    parser.caps(blob)
}

/// Button count of the first input button capability (0 when the device has none).
pub fn get_button_count<P>(parser: &P, blob: &PreparsedData, caps: &HidCaps) -> Result<u32>
where
    P: HidParserApi + ?Sized,
{
    blob.checked()?;
    if caps.button_caps == 0 {
        return Ok(0);
    }
    let buttons = parser.button_caps(blob, caps)?;
    Ok(buttons.first().map(|b| b.usages.len()).unwrap_or(0))
}

/// Logical ranges of every input value capability, in declaration order.
pub fn get_axis_ranges<P>(parser: &P, blob: &PreparsedData, caps: &HidCaps) -> Result<Vec<AxisRange>>
where
    P: HidParserApi + ?Sized,
{
    blob.checked()?;
    if caps.value_caps == 0 {
        return Ok(Vec::new());
    }
    Ok(parser
        .value_caps(blob, caps)?
        .into_iter()
        .map(|v| AxisRange {
            minimum: v.logical_min,
            maximum: v.logical_max,
        })
        .collect())
}

/// Caps, button count and axis ranges in one pass.
pub fn parse_capabilities<P>(parser: &P, blob: &PreparsedData) -> Result<HidCapabilities>
where
    P: HidParserApi + ?Sized,
{
    let caps = get_capabilities(parser, blob)?;
    let button_count = get_button_count(parser, blob, &caps)?;
    let axes = get_axis_ranges(parser, blob, &caps)?;
    debug!(
        usage_page = caps.usage_page,
        usage = caps.usage,
        buttons = button_count,
        axes = axes.len(),
        "parsed HID capabilities"
    );
    Ok(HidCapabilities {
        caps,
        button_count,
        axes,
    })
}
