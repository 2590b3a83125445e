//! One-shot sampler on top of the `embedded-hal` ADC traits.

use core::marker::PhantomData;

use hal;
use nb;

use super::{counts_to_millivolts, SampleError, Sampler};
use clock::{Monotonic, Timeout};

/// [`Sampler`] that starts one conversion per pixel and polls it until it completes or the
/// per-pixel timeout runs out.
///
/// `ADC` is the HAL's ADC peripheral and `PIN` the analog pin wired to the sensor's VIDEO output.
/// Raw counts are scaled to millivolts using the converter's full-scale voltage and resolution,
/// which default to 3100 mV and 12 bits (a typical 11 dB attenuated MCU ADC input).
pub struct OneShotSampler<A, ADC, PIN> {
    adc: A,
    pin: PIN,
    full_scale_mv: u16,
    resolution_bits: u8,
    _adc: PhantomData<ADC>,
}

impl<A, ADC, PIN> OneShotSampler<A, ADC, PIN>
where
    A: hal::adc::OneShot<ADC, u16, PIN>,
    PIN: hal::adc::Channel<ADC>,
{
    pub fn new(adc: A, pin: PIN) -> Self {
        Self {
            adc,
            pin,
            full_scale_mv: 3_100,
            resolution_bits: 12,
            _adc: PhantomData,
        }
    }

    /// Set the voltage corresponding to the largest conversion result, and the number of bits in
    /// a result.
    pub fn with_scale(mut self, full_scale_mv: u16, resolution_bits: u8) -> Self {
        self.full_scale_mv = full_scale_mv;
        self.resolution_bits = resolution_bits;
        self
    }

    pub fn release(self) -> (A, PIN) {
        (self.adc, self.pin)
    }
}

impl<A, ADC, PIN> Sampler for OneShotSampler<A, ADC, PIN>
where
    A: hal::adc::OneShot<ADC, u16, PIN>,
    PIN: hal::adc::Channel<ADC>,
{
    type Error = A::Error;

    fn sample<C: Monotonic>(
        &mut self,
        _channel: u16,
        timeout: &mut Timeout<C>,
    ) -> Result<u16, SampleError<A::Error>> {
        loop {
            match self.adc.read(&mut self.pin) {
                Ok(raw) => {
                    return Ok(counts_to_millivolts(
                        raw,
                        self.full_scale_mv,
                        self.resolution_bits,
                    ))
                }
                Err(nb::Error::Other(e)) => return Err(SampleError::Failure(e)),
                Err(nb::Error::WouldBlock) => {
                    if timeout.expired() {
                        return Err(SampleError::Timeout);
                    }
                }
            }
        }
    }
}
