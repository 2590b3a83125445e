//! The sensor clock generator.

use clock::{Monotonic, PulseTiming, TickDelay};
use line::Line;

/// Drives the sensor's CLK line. Every pulse is a high half-period followed by a low
/// half-period, so the line is always left low between calls.
pub struct PulseGenerator<CLK, T> {
    clk: CLK,
    ticks: T,
    timing: PulseTiming,
}

impl<CLK: Line, T: TickDelay> PulseGenerator<CLK, T> {
    pub fn new(clk: CLK, ticks: T, timing: PulseTiming) -> Self {
        Self { clk, ticks, timing }
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    pub(crate) fn set_timing(&mut self, timing: PulseTiming) {
        self.timing = timing;
    }

    /// Drive the clock line low without pulsing.
    pub fn idle(&mut self) {
        self.clk.lower();
    }

    /// Issue exactly `n` high-to-low transitions, returning after the last low half-period.
    pub fn pulse(&mut self, n: u16) {
        for _ in 0..n {
            self.cycle();
        }
    }

    /// Pulse continuously until at least `duration_us` microseconds have elapsed on `clock`.
    ///
    /// The elapsed time is checked only between whole pulses, so the call may overshoot by up to
    /// one pulse. A zero duration issues no pulses.
    pub fn pulse_for_duration<C: Monotonic>(&mut self, clock: &mut C, duration_us: u32) -> u32 {
        let start = clock.micros();
        let mut pulses = 0u32;
        while clock.micros().wrapping_sub(start) < duration_us {
            self.cycle();
            pulses = pulses.wrapping_add(1);
        }
        pulses
    }

    /// The first pulse of a read. `on_fall` runs right after the falling edge, before the low
    /// half-period, which is where the sensor expects the start line to rise.
    pub fn start_pulse<F: FnOnce()>(&mut self, on_fall: F) {
        self.clk.raise();
        self.half_period();
        self.clk.lower();
        on_fall();
        self.half_period();
    }

    pub fn release(self) -> (CLK, T) {
        (self.clk, self.ticks)
    }

    fn cycle(&mut self) {
        self.clk.raise();
        self.half_period();
        self.clk.lower();
        self.half_period();
    }

    fn half_period(&mut self) {
        self.ticks.delay_ns(self.timing.half_period_ns());
    }
}
