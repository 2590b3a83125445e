//! Host-side configuration of the driver.

use clock::{Monotonic, PulseTiming, TickDelay};
use error::Error;
use line::Line;
use sampler::Sampler;
use spectrometer::Spectrometer;

/// Settings applied to every read.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    /// Requested exposure in microseconds, before correction for the integration floor.
    pub integration_time_us: u32,
    /// Timing of the sensor clock.
    pub pulse_timing: PulseTiming,
    /// How long to wait for each pixel's sample before recording it as failed.
    pub sample_timeout_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            integration_time_us: 1_000,
            pulse_timing: PulseTiming::default(),
            sample_timeout_us: 100,
        }
    }
}

/// A `Configurator` collects configuration changes and applies them together. You obtain one
/// from [`Spectrometer::configure`], chain method calls on it to make changes, and end the chain
/// with `commit()`.
///
/// ```
/// # use c12880::clock::noop::{NoopTicks, StepClock};
/// # use c12880::line::noop::NoopLine;
/// # use c12880::sampler::noop::NoopSampler;
/// # use c12880::{PulseTiming, Spectrometer};
/// # fn main() -> Result<(), c12880::Error> {
/// # let mut spec = Spectrometer::new(NoopLine, NoopLine, NoopTicks, StepClock(0), NoopSampler);
/// spec.configure()
///     .integration_time(10_000)
///     .pulse_timing(PulseTiming::from_frequency_hz(1_000_000))
///     .sample_timeout(50)
///     .commit()?;
/// # Ok(())
/// # }
/// ```
#[must_use = "Configuration changes are not applied unless committed"]
pub struct Configurator<'s, CLK, ST, T, C, S>
where
    CLK: Line + 's,
    ST: Line + 's,
    T: TickDelay + 's,
    C: Monotonic + 's,
    S: Sampler + 's,
{
    spectrometer: &'s mut Spectrometer<CLK, ST, T, C, S>,
    config: Config,
}

impl<'s, CLK, ST, T, C, S> Configurator<'s, CLK, ST, T, C, S>
where
    CLK: Line,
    ST: Line,
    T: TickDelay,
    C: Monotonic,
    S: Sampler,
{
    pub(crate) fn new(spectrometer: &'s mut Spectrometer<CLK, ST, T, C, S>) -> Self {
        let config = spectrometer.config();
        Self {
            spectrometer,
            config,
        }
    }

    /// Set the requested exposure in microseconds.
    pub fn integration_time(mut self, usec: u32) -> Self {
        self.config.integration_time_us = usec;
        self
    }

    /// Set the sensor clock timing. If the driver is already initialized, committing a new timing
    /// re-measures the integration floor, which depends on it.
    pub fn pulse_timing(mut self, timing: PulseTiming) -> Self {
        self.config.pulse_timing = timing;
        self
    }

    /// Set how long to wait for each pixel's sample, in microseconds.
    pub fn sample_timeout(mut self, usec: u32) -> Self {
        self.config.sample_timeout_us = usec;
        self
    }

    /// Replace every setting at once.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Validate and apply the changes. Nothing is applied if validation fails.
    pub fn commit(self) -> Result<(), Error> {
        if !self.config.pulse_timing.is_valid() {
            return Err(Error::InvalidPulseTiming);
        }
        self.spectrometer.apply_config(self.config);
        Ok(())
    }
}
