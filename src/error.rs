//! Errors reported by the driver.

use core::fmt;

/// Failures of a driver operation. Problems sampling individual pixels are not errors at this
/// level; they are recorded in the frame as [`SAMPLE_FAILED`](::protocol::SAMPLE_FAILED).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    /// A read was requested before `initialize` measured the integration floor.
    Uncalibrated,
    /// A pulse timing with a zero half-period was supplied.
    InvalidPulseTiming,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Uncalibrated => write!(f, "spectrometer read before initialization"),
            Error::InvalidPulseTiming => write!(f, "clock half-period must be non-zero"),
        }
    }
}

#[cfg(feature = "std")]
impl ::std::error::Error for Error {}
