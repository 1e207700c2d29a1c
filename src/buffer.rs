//! Two-phase (size, then fetch) buffer negotiation.
//!
//! Every sized Win32 query in this crate follows the same shape: ask how large the
//! result is, allocate, then fetch. Between the two calls a device may attach or a
//! descriptor may change, so the fetch can still report "insufficient". One re-query is
//! allowed; a second shortfall is [`Error::BufferTooSmall`].

use crate::error::{Error, Result};
use tracing::debug;

/// Outcome of one fetch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fetch {
    /// The fetch succeeded and wrote this many elements.
    Complete(usize),
    /// The buffer was too small; the OS now requires this many elements.
    Insufficient(usize),
}

/// Run a size probe and a fetch, retrying once when the fetch reports a shortfall.
///
/// A probe of zero yields an empty vector without calling `fetch`.
pub fn query_sized<T, P, F>(op: &'static str, mut probe: P, mut fetch: F) -> Result<Vec<T>>
where
    T: Clone + Default,
    P: FnMut() -> Result<usize>,
    F: FnMut(&mut [T]) -> Result<Fetch>,
{
    let mut capacity = probe()?;
    if capacity == 0 {
        return Ok(Vec::new());
    }

    for attempt in 0..2 {
        let mut buf = vec![T::default(); capacity];
        match fetch(&mut buf)? {
            Fetch::Complete(n) => {
                buf.truncate(n.min(capacity));
                return Ok(buf);
            }
            Fetch::Insufficient(required) if attempt == 0 => {
                debug!(op, capacity, required, "buffer too small, re-querying");
                // The OS does not always report the new size through the fetch; probe again.
                capacity = required.max(probe()?).max(capacity);
            }
            Fetch::Insufficient(required) => {
                return Err(Error::BufferTooSmall {
                    op,
                    required,
                    capacity,
                });
            }
        }
    }

    Err(Error::BufferTooSmall {
        op,
        required: capacity,
        capacity,
    })
}

/// Owned copy of a device's preparsed HID descriptor blob (`RIDI_PREPARSEDDATA`).
///
/// Only meaningful to [`crate::api::HidParserApi`]; the layout is opaque.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PreparsedData(Vec<u8>);

impl PreparsedData {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the blob, rejecting an empty one.
    pub fn checked(&self) -> Result<&[u8]> {
        if self.0.is_empty() {
            Err(Error::PreparsedDataInvalid)
        } else {
            Ok(&self.0)
        }
    }
}
