//! Time sources used by the driver: a monotonic microsecond clock for measuring elapsed time and
//! a delay for holding each half of a clock pulse.

use hal;

/// A free-running microsecond counter.
///
/// The value wraps at `u32::MAX`; the driver only ever looks at differences between two readings
/// taken with wrapping arithmetic, so rollover mid-read is harmless.
pub trait Monotonic {
    /// Current counter value in microseconds.
    fn micros(&mut self) -> u32;
}

/// A busy-wait delay with nanosecond granularity used to time each half of a clock pulse.
///
/// Implementations may wait longer than asked but never shorter.
pub trait TickDelay {
    /// Block for at least `ns` nanoseconds.
    fn delay_ns(&mut self, ns: u32);
}

/// Timing of the sensor clock signal.
///
/// The C12880MA accepts clock rates up to 5 MHz. The default is a 1 µs half-period (500 kHz),
/// which every platform's microsecond delay can produce.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseTiming {
    half_period_ns: u32,
}

impl PulseTiming {
    /// A clock whose high and low phases each last `ns` nanoseconds.
    pub fn from_half_period_ns(ns: u32) -> Self {
        Self { half_period_ns: ns }
    }

    /// A clock of approximately `hz`, rounded down so that half-periods are never too short.
    pub fn from_frequency_hz(hz: u32) -> Self {
        let hz = hz.max(1) as u64;
        let ns = (1_000_000_000u64 + 2 * hz - 1) / (2 * hz);
        Self {
            half_period_ns: ns.min(u32::max_value() as u64) as u32,
        }
    }

    pub fn half_period_ns(&self) -> u32 {
        self.half_period_ns
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.half_period_ns > 0
    }
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self::from_half_period_ns(1_000)
    }
}

/// A bounded wait measured against a [`Monotonic`] clock, handed to samplers so they can give
/// up on a conversion without knowing anything about the clock behind it.
pub struct Timeout<'c, C: Monotonic + 'c> {
    clock: &'c mut C,
    start: u32,
    limit_us: u32,
}

impl<'c, C: Monotonic> Timeout<'c, C> {
    /// Start a wait of `limit_us` microseconds from now.
    pub fn start(clock: &'c mut C, limit_us: u32) -> Self {
        let start = clock.micros();
        Self {
            clock,
            start,
            limit_us,
        }
    }

    /// Microseconds elapsed since the wait began.
    pub fn elapsed(&mut self) -> u32 {
        self.clock.micros().wrapping_sub(self.start)
    }

    /// Whether the wait has run out.
    pub fn expired(&mut self) -> bool {
        self.elapsed() >= self.limit_us
    }
}

/// [`TickDelay`] on top of an `embedded-hal` microsecond delay. Half-periods are rounded up to
/// whole microseconds.
pub struct UsTicks<D> {
    delay: D,
}

impl<D> UsTicks<D>
where
    D: hal::blocking::delay::DelayUs<u32>,
{
    pub fn new(delay: D) -> Self {
        Self { delay }
    }

    pub fn release(self) -> D {
        self.delay
    }
}

impl<D> TickDelay for UsTicks<D>
where
    D: hal::blocking::delay::DelayUs<u32>,
{
    fn delay_ns(&mut self, ns: u32) {
        let us = (ns as u64 + 999) / 1000;
        self.delay.delay_us(us as u32);
    }
}

#[cfg(feature = "cortexm")]
pub mod cortexm {
    //! Cycle-counting time sources for Cortex-M targets, for clock rates whose half-period is
    //! shorter than one microsecond.

    use super::{Monotonic, TickDelay};
    use cortex_m::peripheral::DWT;

    fn cycles_for_ns(sysclk_hz: u32, ns: u32) -> u32 {
        let cycles = (ns as u64 * sysclk_hz as u64 + 999_999_999) / 1_000_000_000;
        cycles.min(u32::max_value() as u64) as u32
    }

    /// Delay by spinning for a computed number of core cycles.
    pub struct CycleTicks {
        sysclk_hz: u32,
    }

    impl CycleTicks {
        pub fn new(sysclk_hz: u32) -> Self {
            Self { sysclk_hz }
        }
    }

    impl TickDelay for CycleTicks {
        fn delay_ns(&mut self, ns: u32) {
            cortex_m::asm::delay(cycles_for_ns(self.sysclk_hz, ns));
        }
    }

    /// Microsecond clock derived from the DWT cycle counter.
    ///
    /// The cycle counter must already be enabled (`DCB::enable_trace` and
    /// `DWT::enable_cycle_counter`). It wraps far sooner than a microsecond counter would, so
    /// each reading folds the cycles seen since the previous one into a running total; the clock
    /// must therefore be read at least once per cycle-counter period.
    pub struct DwtClock {
        cycles_per_us: u32,
        last: u32,
        residue: u32,
        micros: u32,
    }

    impl DwtClock {
        pub fn new(sysclk_hz: u32) -> Self {
            Self {
                cycles_per_us: (sysclk_hz / 1_000_000).max(1),
                last: DWT::cycle_count(),
                residue: 0,
                micros: 0,
            }
        }
    }

    impl Monotonic for DwtClock {
        fn micros(&mut self) -> u32 {
            let now = DWT::cycle_count();
            let pending = now.wrapping_sub(self.last) as u64 + self.residue as u64;
            self.last = now;
            let whole = pending / self.cycles_per_us as u64;
            self.residue = (pending % self.cycles_per_us as u64) as u32;
            self.micros = self.micros.wrapping_add(whole as u32);
            self.micros
        }
    }
}

// This is here (and has to be pub) for doctests only.
#[doc(hidden)]
pub mod noop {
    use super::{Monotonic, TickDelay};

    /// Returns immediately.
    pub struct NoopTicks;
    impl TickDelay for NoopTicks {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Advances by one microsecond every time it is read.
    pub struct StepClock(pub u32);
    impl Monotonic for StepClock {
        fn micros(&mut self) -> u32 {
            self.0 = self.0.wrapping_add(1);
            self.0
        }
    }
}
