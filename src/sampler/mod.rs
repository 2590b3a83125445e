//! Acquisition of the sensor's analog video output.
//!
//! The readout loop asks for exactly one sample per pixel, between the advance pulses that step
//! the sensor's output register. How that sample is obtained is up to the [`Sampler`]
//! implementation, and differs widely between platforms:
//!
//! - [`OneShotSampler`](oneshot::OneShotSampler) starts a blocking conversion for every pixel
//!   through the `embedded-hal` `OneShot` ADC trait (requires the `unproven` feature).
//! - [`ContinuousSampler`](continuous::ContinuousSampler) consumes conversions produced by an ADC
//!   running in continuous mode, handed over from its conversion-complete interrupt.
//! - Anything else (DMA, a platform's fast-read path) can implement [`Sampler`] directly.

use clock::{Monotonic, Timeout};

pub mod continuous;
#[cfg(feature = "unproven")]
pub mod oneshot;

/// Why a sample could not be produced. The driver stores
/// [`SAMPLE_FAILED`](::protocol::SAMPLE_FAILED) for the pixel in both cases.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleError<E> {
    /// No conversion completed within the bounded wait.
    Timeout,
    /// The ADC reported an error.
    Failure(E),
}

/// An ADC channel connected to the sensor's video output.
pub trait Sampler {
    /// The type of error a conversion may report.
    type Error;

    /// Return the voltage, in millivolts, of the pixel currently presented on the video line.
    ///
    /// Called exactly once per pixel, before that pixel's advance pulse. Implementations must give
    /// up once `timeout` expires rather than wait indefinitely.
    fn sample<C: Monotonic>(
        &mut self,
        channel: u16,
        timeout: &mut Timeout<C>,
    ) -> Result<u16, SampleError<Self::Error>>;

    /// Called once before the first pixel of a frame is sampled.
    fn begin_frame(&mut self) {}

    /// Called once after the last pixel of a frame is sampled.
    fn end_frame(&mut self) {}
}

/// Scale a raw conversion result to millivolts.
pub(crate) fn counts_to_millivolts(raw: u16, full_scale_mv: u16, bits: u8) -> u16 {
    let max = (1u32 << bits.max(1).min(16)) - 1;
    let raw = (raw as u32).min(max);
    ((raw * full_scale_mv as u32 + max / 2) / max) as u16
}

// This is here (and has to be pub) for doctests only.
#[doc(hidden)]
pub mod noop {
    use super::{SampleError, Sampler};
    use clock::{Monotonic, Timeout};
    pub struct NoopSampler;
    impl Sampler for NoopSampler {
        type Error = core::convert::Infallible;
        fn sample<C: Monotonic>(
            &mut self,
            _channel: u16,
            _timeout: &mut Timeout<C>,
        ) -> Result<u16, SampleError<Self::Error>> {
            Ok(0)
        }
    }
}
