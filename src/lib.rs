//! Driver library for the Hamamatsu C12880MA micro-spectrometer.
//!
//! The C12880MA is a fingertip-sized spectrometer whose detector is a linear image sensor with
//! 288 pixels. It is controlled with two digital inputs, a clock (CLK) and a start pulse (ST), and
//! presents one pixel at a time as an analog voltage on its VIDEO output. Exposure is set by how
//! long ST is held high, counted in clock pulses, so reading a spectrum means bit-banging a
//! precisely timed pulse train and sampling VIDEO between clock edges.
//!
//! This driver is intended to work on embedded platforms using any implementation of the
//! `embedded-hal` trait library. It drives CLK and ST through any push-pull output pins, times the
//! clock with any microsecond delay (or, with the `cortexm` feature, a core-cycle delay for clock
//! rates above 500 kHz), and samples VIDEO through any [`Sampler`].
//!
//! # Construction
//!
//! To set up the driver:
//!
//! - Use your platform's `embedded-hal` implementation to obtain two GPIO outputs wired to CLK and
//!   ST, a delay, a monotonic microsecond counter, and an ADC channel wired to VIDEO.
//! - Wrap the pins in [`PinLine`]s and the delay in [`UsTicks`], and pick a [`Sampler`]: the
//!   [`OneShotSampler`] for any `embedded-hal` ADC, or the [`ContinuousSampler`] if your ADC can
//!   convert continuously and interrupt on completion.
//! - Construct a [`Spectrometer`], which will take ownership of all of them, and call
//!   [`Spectrometer::initialize`].
//!
//! ```ignore
//! let clk = c12880::PinLine::new(/* OutputPin wired to CLK */);
//! let st = c12880::PinLine::new(/* OutputPin wired to ST */);
//! let ticks = c12880::UsTicks::new(/* embedded_hal::blocking::delay::DelayUs<u32> */);
//! let clock = /* something implementing c12880::Monotonic */;
//! let sampler = c12880::OneShotSampler::new(/* ADC */, /* analog pin wired to VIDEO */);
//!
//! let mut spec = c12880::Spectrometer::new(clk, st, ticks, clock, sampler);
//! spec.initialize();
//! ```
//!
//! # Reading spectra
//!
//! *See [`Spectrometer::read_into`].*
//!
//! ```
//! # use c12880::clock::noop::{NoopTicks, StepClock};
//! # use c12880::line::noop::NoopLine;
//! # use c12880::sampler::noop::NoopSampler;
//! # fn main() -> Result<(), c12880::Error> {
//! # let mut spec = c12880::Spectrometer::new(NoopLine, NoopLine, NoopTicks, StepClock(0), NoopSampler);
//! spec.initialize();
//! spec.set_integration_time(10_000);
//!
//! let mut frame = [0u16; c12880::CHANNELS];
//! spec.read_into(&mut frame)?;
//! let integration_started = spec.timing(0);
//! # Ok(())
//! # }
//! ```
//!
//! Each read blocks for the integration time plus the pixel readout. Every pixel's slot in the
//! frame receives its voltage in millivolts, or [`SAMPLE_FAILED`] if the sampler could not
//! produce it in time; a failed pixel never aborts the read, so the frame always has the same
//! shape and the sensor is always left idle.
//!
//! # Integration floor
//!
//! The sensor keeps integrating for 48 clock pulses after ST falls. `initialize` measures how long
//! those pulses take on your platform and subtracts that from every requested integration time,
//! so that short exposures come out as requested. Exposures shorter than this floor cannot be
//! produced and are clamped to it. If the clock timing changes, call
//! [`Spectrometer::recalibrate`] (committing a new [`PulseTiming`] through
//! [`Spectrometer::configure`] does so automatically).
//!
//! # Timing diagnostics
//!
//! Every read records five timestamps, available through [`Spectrometer::timing`] and
//! [`TimingTrace`], which make it easy to check the real integration time and readout speed.
//!
//! # Mutual exclusion
//!
//! The continuous-mode sampler receives conversions from the ADC's interrupt handler through a
//! [`CompletionSignal`], whose slot is locked by an [`IrqMutex`]. The `std` feature makes
//! `mutex::DefaultMutex<T>` a `std::sync::Mutex<T>`; on Cortex-M targets the `cortexm` feature
//! makes it a `cortex_m::interrupt::Mutex<core::cell::RefCell<T>>`, which masks interrupts while
//! locked.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate core;
#[cfg(test)]
extern crate proptest;

#[cfg(feature = "cortexm")]
extern crate cortex_m;
extern crate embedded_hal as hal;
#[macro_use]
extern crate log;
extern crate nb;

pub mod clock;
pub mod config;
pub mod error;
pub mod integration;
pub mod line;
pub mod mutex;
pub mod protocol;
pub mod pulse;
pub mod sampler;
pub mod spectrometer;
pub mod timing;

pub use clock::{Monotonic, PulseTiming, TickDelay, Timeout, UsTicks};
pub use config::{Config, Configurator};
pub use error::Error;
pub use line::{Line, PinLine};
pub use mutex::IrqMutex;
#[cfg(any(feature = "std", feature = "cortexm"))]
pub use mutex::DefaultMutex;
pub use protocol::{Frame, CHANNELS, MAX_READING, SAMPLE_FAILED};
pub use sampler::continuous::{CompletionSignal, ContinuousSampler, ConversionControl};
#[cfg(feature = "unproven")]
pub use sampler::oneshot::OneShotSampler;
pub use sampler::{SampleError, Sampler};
pub use spectrometer::Spectrometer;
pub use timing::TimingTrace;
