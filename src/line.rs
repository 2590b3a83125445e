//! This module provides the shim between `embedded-hal` output pins and the sensor's digital
//! control inputs (CLK and ST). The readout protocol only ever needs to drive a line high or low,
//! so that is all a `Line` can do.

use core::convert::Infallible;

use hal;

/// A digital output connected to one of the sensor's control inputs.
///
/// Toggling a line cannot fail: the protocol is bit-banged with sub-microsecond timing and must
/// run to completion once started, so there is nowhere to report an error to.
pub trait Line {
    /// Drive the line to logic high.
    fn raise(&mut self);
    /// Drive the line to logic low.
    fn lower(&mut self);
}

/// Adapts an `embedded-hal` push-pull output pin into a [`Line`].
///
/// Only pins whose error type is `Infallible` are accepted, which covers the on-chip GPIOs of
/// every mainstream HAL.
pub struct PinLine<P> {
    pin: P,
}

impl<P> PinLine<P>
where
    P: hal::digital::v2::OutputPin<Error = Infallible>,
{
    /// Wrap `pin`, which must already be configured as a push-pull output.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Give the pin back.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P> Line for PinLine<P>
where
    P: hal::digital::v2::OutputPin<Error = Infallible>,
{
    fn raise(&mut self) {
        match self.pin.set_high() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }

    fn lower(&mut self) {
        match self.pin.set_low() {
            Ok(()) => {}
            Err(never) => match never {},
        }
    }
}

// This is here (and has to be pub) for doctests only.
#[doc(hidden)]
pub mod noop {
    use super::Line;
    pub struct NoopLine;
    impl Line for NoopLine {
        fn raise(&mut self) {}
        fn lower(&mut self) {}
    }
}
