use serde::{Deserialize, Serialize};
use std::fmt;

/// Serial number correlating a submitted request with its response.
///
/// Serials are carried in-band with every request and echoed back by the
/// service in the matching [`ResponseInfo`](crate::ResponseInfo). They are
/// assigned by the [`RequestTracker`](crate::RequestTracker) and are unique
/// while outstanding. Zero is never issued.
///
/// # Format
///
/// Displayed zero-padded in brackets, e.g. `[0042]`, which is the prefix used
/// in request/response log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Serial(u32);

impl Serial {
    // ---

    /// First serial handed out by a fresh tracker.
    pub const FIRST: Serial = Serial(1);

    /// Wrap a raw serial value.
    pub const fn new(value: u32) -> Self {
        // ---
        Self(value)
    }

    /// Raw serial value as carried on the wire.
    pub const fn get(self) -> u32 {
        // ---
        self.0
    }

    /// The serial following this one, wrapping past `u32::MAX` back to 1.
    pub(crate) fn next(self) -> Self {
        // ---
        match self.0.checked_add(1) {
            Some(v) => Self(v),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for Serial {
    // ---

    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // ---
        write!(f, "[{:04}]", self.0)
    }
}

impl From<u32> for Serial {
    // ---

    fn from(value: u32) -> Self {
        // ---
        Self(value)
    }
}
