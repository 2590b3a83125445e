//! Phase timestamps captured during a read.

use clock::Monotonic;
use protocol::{Phase, TIMING_MARKS};

/// Microsecond offsets from the start of a read to the end of each timed phase:
///
/// | index | taken after                                  |
/// |-------|----------------------------------------------|
/// | 0     | the 3 pulses that start integration          |
/// | 1     | the start line drops (integration stopping)  |
/// | 2     | the 48 post-stop pulses (integration over)   |
/// | 3     | the 40 pre-readout pulses                    |
/// | 4     | the last pixel is read                       |
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TimingTrace {
    marks: [u32; TIMING_MARKS],
}

impl TimingTrace {
    /// Offset `index`, or 0 if `index` is not a valid mark.
    pub fn get(&self, index: usize) -> u32 {
        self.marks.get(index).cloned().unwrap_or(0)
    }

    pub fn marks(&self) -> &[u32; TIMING_MARKS] {
        &self.marks
    }

    /// Time spent integrating, from the start of integration to the end of the post-stop pulses.
    pub fn exposure_us(&self) -> u32 {
        self.marks[2].saturating_sub(self.marks[0])
    }
}

/// Collects a [`TimingTrace`] while a read is in progress.
pub(crate) struct TimingRecorder {
    start: u32,
    trace: TimingTrace,
}

impl TimingRecorder {
    pub fn start<C: Monotonic>(clock: &mut C) -> Self {
        Self {
            start: clock.micros(),
            trace: TimingTrace::default(),
        }
    }

    pub fn mark<C: Monotonic>(&mut self, index: usize, clock: &mut C) {
        let offset = clock.micros().wrapping_sub(self.start);
        if let Some(slot) = self.trace.marks.get_mut(index) {
            *slot = offset;
        }
    }

    /// Record the mark taken at the end of `phase`, if that phase has one.
    pub fn phase_done<C: Monotonic>(&mut self, phase: Phase, clock: &mut C) {
        if let Some(index) = phase.mark() {
            self.mark(index, clock);
        }
    }

    pub fn finish(self) -> TimingTrace {
        self.trace
    }
}
