//! Continuous-mode sampler.
//!
//! Many MCU ADCs can convert back-to-back on their own and raise an interrupt when each result is
//! ready, which is more than twice as fast as starting a one-shot conversion per pixel. The
//! interrupt handler publishes each result into a [`CompletionSignal`]; the readout loop, through
//! [`ContinuousSampler`], takes one result per pixel.
//!
//! ```
//! # use c12880::sampler::continuous::{CompletionSignal, ContinuousSampler, ConversionControl};
//! # use c12880::DefaultMutex;
//! # struct Adc;
//! # impl ConversionControl for Adc { fn start(&mut self) {} fn stop(&mut self) {} }
//! let signal: CompletionSignal<DefaultMutex<_>> = CompletionSignal::new();
//! let sampler = ContinuousSampler::new(Adc, &signal);
//!
//! // In the conversion-complete interrupt handler:
//! signal.complete(1_234);
//! ```

use core::marker::PhantomData;

use super::{SampleError, Sampler};
use clock::{Monotonic, Timeout};
use mutex::IrqMutex;

/// The outcome of one conversion, as reported by the interrupt handler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Conversion {
    /// A result, already scaled to millivolts.
    Ready(u16),
    /// The ADC flagged the conversion as bad.
    Failed,
}

/// A single-slot hand-over from one producer (the conversion-complete interrupt) to one consumer
/// (the readout loop). A newer result overwrites one that has not been taken yet.
pub struct CompletionSignal<M>
where
    M: IrqMutex<Option<Conversion>>,
{
    slot: M,
}

impl<M> CompletionSignal<M>
where
    M: IrqMutex<Option<Conversion>>,
{
    pub fn new() -> Self {
        Self { slot: M::new(None) }
    }

    /// Publish a result. Called from the interrupt handler.
    pub fn complete(&self, millivolts: u16) {
        self.slot.lock(|s| *s = Some(Conversion::Ready(millivolts)));
    }

    /// Publish a failed conversion. Called from the interrupt handler.
    pub fn fail(&self) {
        self.slot.lock(|s| *s = Some(Conversion::Failed));
    }

    /// Take the pending result, if any.
    pub fn take(&self) -> Option<Conversion> {
        self.slot.lock(|s| s.take())
    }

    /// Discard any pending result.
    pub fn clear(&self) {
        self.slot.lock(|s| *s = None);
    }
}

/// Starts and stops the ADC's continuous conversions.
pub trait ConversionControl {
    /// Begin converting. Results arrive through the [`CompletionSignal`].
    fn start(&mut self);
    /// Stop converting.
    fn stop(&mut self);
}

/// Reported when the interrupt handler signalled [`Conversion::Failed`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConversionFailed;

/// [`Sampler`] backed by an ADC in continuous mode. Conversions run only while a frame is being
/// read out.
pub struct ContinuousSampler<'s, ADC, M>
where
    M: IrqMutex<Option<Conversion>> + 's,
{
    adc: ADC,
    signal: &'s CompletionSignal<M>,
    _m: PhantomData<M>,
}

impl<'s, ADC, M> ContinuousSampler<'s, ADC, M>
where
    ADC: ConversionControl,
    M: IrqMutex<Option<Conversion>> + 's,
{
    pub fn new(adc: ADC, signal: &'s CompletionSignal<M>) -> Self {
        Self {
            adc,
            signal,
            _m: PhantomData,
        }
    }

    pub fn release(self) -> ADC {
        self.adc
    }
}

impl<'s, ADC, M> Sampler for ContinuousSampler<'s, ADC, M>
where
    ADC: ConversionControl,
    M: IrqMutex<Option<Conversion>> + 's,
{
    type Error = ConversionFailed;

    fn sample<C: Monotonic>(
        &mut self,
        _channel: u16,
        timeout: &mut Timeout<C>,
    ) -> Result<u16, SampleError<ConversionFailed>> {
        loop {
            match self.signal.take() {
                Some(Conversion::Ready(mv)) => return Ok(mv),
                Some(Conversion::Failed) => return Err(SampleError::Failure(ConversionFailed)),
                None => {}
            }
            if timeout.expired() {
                return Err(SampleError::Timeout);
            }
        }
    }

    fn begin_frame(&mut self) {
        self.signal.clear();
        self.adc.start();
    }

    fn end_frame(&mut self) {
        self.adc.stop();
    }
}
