//! Integration time bookkeeping.
//!
//! The 48 clock pulses the sensor needs after the start line drops keep the pixels integrating,
//! so they count towards the exposure. Their duration (the *integration floor*) depends on the
//! platform's pulse timing and is measured once at start-up, then subtracted from every requested
//! integration time so the exposure the host asks for is the exposure it gets.

use clock::{Monotonic, TickDelay};
use error::Error;
use line::Line;
use protocol::POST_STOP_PULSES;
use pulse::PulseGenerator;

/// Holds the requested integration time and the measured floor.
pub struct IntegrationController {
    integration_time_us: u32,
    floor_us: Option<u32>,
}

impl IntegrationController {
    pub fn new(integration_time_us: u32) -> Self {
        Self {
            integration_time_us,
            floor_us: None,
        }
    }

    pub fn integration_time(&self) -> u32 {
        self.integration_time_us
    }

    pub fn set_integration_time(&mut self, usec: u32) {
        self.integration_time_us = usec;
    }

    /// The measured floor, or `None` before calibration.
    pub fn floor(&self) -> Option<u32> {
        self.floor_us
    }

    pub fn is_calibrated(&self) -> bool {
        self.floor_us.is_some()
    }

    /// Measure the floor by timing the post-stop pulse train. The caller must have dropped the
    /// start line immediately before.
    pub fn calibrate<CLK, T, C>(
        &mut self,
        pulses: &mut PulseGenerator<CLK, T>,
        clock: &mut C,
    ) -> u32
    where
        CLK: Line,
        T: TickDelay,
        C: Monotonic,
    {
        let start = clock.micros();
        pulses.pulse(POST_STOP_PULSES);
        let floor = clock.micros().wrapping_sub(start);
        self.floor_us = Some(floor);
        floor
    }

    /// The time the clock must free-run during the integrate phase for an exposure of
    /// `requested` microseconds. Requests shorter than the floor yield zero.
    pub fn effective_duration(&self, requested: u32) -> Result<u32, Error> {
        self.floor_us
            .map(|floor| requested.saturating_sub(floor))
            .ok_or(Error::Uncalibrated)
    }

    /// [`effective_duration`](Self::effective_duration) for the configured integration time.
    pub fn current_duration(&self) -> Result<u32, Error> {
        self.effective_duration(self.integration_time_us)
    }
}
