//! The spectrometer device API. This provides the `Spectrometer` type, which owns the sensor's
//! control lines and video sampler and runs the readout protocol.

use clock::{Monotonic, PulseTiming, TickDelay, Timeout};
use config::{Config, Configurator};
use error::Error;
use integration::IntegrationController;
use line::Line;
use protocol::{Frame, Phase, CHANNELS, MAX_READING, SAMPLE_FAILED};
use pulse::PulseGenerator;
use sampler::Sampler;
use timing::{TimingRecorder, TimingTrace};

/// A C12880MA micro-spectrometer.
///
/// Takes ownership of the CLK and ST lines, the half-period delay, the monotonic clock, and the
/// sampler connected to the VIDEO output. Every operation takes `&mut self`, so a read can never
/// overlap another read or a calibration.
pub struct Spectrometer<CLK, ST, T, C, S> {
    pulses: PulseGenerator<CLK, T>,
    st: ST,
    clock: C,
    sampler: S,
    integration: IntegrationController,
    sample_timeout_us: u32,
    trace: TimingTrace,
}

impl<CLK, ST, T, C, S> Spectrometer<CLK, ST, T, C, S>
where
    CLK: Line,
    ST: Line,
    T: TickDelay,
    C: Monotonic,
    S: Sampler,
{
    /// Create a new `Spectrometer` with the default [`Config`]. Nothing is driven until
    /// [`initialize`](Self::initialize) is called.
    pub fn new(clk: CLK, st: ST, ticks: T, clock: C, sampler: S) -> Self {
        let config = Config::default();
        Self {
            pulses: PulseGenerator::new(clk, ticks, config.pulse_timing),
            st,
            clock,
            sampler,
            integration: IntegrationController::new(config.integration_time_us),
            sample_timeout_us: config.sample_timeout_us,
            trace: TimingTrace::default(),
        }
    }

    /// Drive both control lines low and measure the integration floor. Must be called before the
    /// first read. Returns the measured floor in microseconds.
    pub fn initialize(&mut self) -> u32 {
        self.pulses.idle();
        self.st.lower();
        self.recalibrate()
    }

    /// Measure the integration floor again, for example after the platform clock changed.
    pub fn recalibrate(&mut self) -> u32 {
        self.st.lower();
        let floor = self.integration.calibrate(&mut self.pulses, &mut self.clock);
        debug!(
            "integration floor {} us at {} ns half-period",
            floor,
            self.pulses.timing().half_period_ns()
        );
        floor
    }

    /// Begin (re)configuring the driver by returning a [`Configurator`].
    pub fn configure<'s>(&'s mut self) -> Configurator<'s, CLK, ST, T, C, S> {
        Configurator::new(self)
    }

    /// The settings currently in effect.
    pub fn config(&self) -> Config {
        Config {
            integration_time_us: self.integration.integration_time(),
            pulse_timing: self.pulses.timing(),
            sample_timeout_us: self.sample_timeout_us,
        }
    }

    pub(crate) fn apply_config(&mut self, config: Config) {
        self.integration
            .set_integration_time(config.integration_time_us);
        self.sample_timeout_us = config.sample_timeout_us;
        if config.pulse_timing != self.pulses.timing() {
            self.pulses.set_timing(config.pulse_timing);
            if self.integration.is_calibrated() {
                self.recalibrate();
            }
        }
        debug!("configuration applied: {:?}", config);
    }

    /// Set the requested exposure in microseconds. Takes effect on the next read.
    pub fn set_integration_time(&mut self, usec: u32) {
        self.integration.set_integration_time(usec);
    }

    pub fn integration_time(&self) -> u32 {
        self.integration.integration_time()
    }

    /// The integration floor measured by the last calibration, or `None` before
    /// [`initialize`](Self::initialize).
    pub fn integration_floor(&self) -> Option<u32> {
        self.integration.floor()
    }

    pub fn pulse_timing(&self) -> PulseTiming {
        self.pulses.timing()
    }

    /// Run one complete exposure and readout, storing each pixel's voltage in millivolts into
    /// `buffer` in pixel order.
    ///
    /// Blocks for the integration time plus the readout. Pixels whose sample could not be
    /// obtained hold [`SAMPLE_FAILED`]; this never interrupts the readout. Readings at or above
    /// the sentinel are clamped to [`MAX_READING`]. Fails only if the
    /// driver has not been initialized, in which case neither the lines nor `buffer` are touched.
    pub fn read_into(&mut self, buffer: &mut Frame) -> Result<(), Error> {
        let integrate_us = self.integration.current_duration()?;

        self.trace = TimingTrace::default();
        let mut rec = TimingRecorder::start(&mut self.clock);

        let mut failed = 0;
        for &phase in Phase::SEQUENCE.iter() {
            match phase {
                Phase::Start => {
                    let st = &mut self.st;
                    self.pulses.start_pulse(|| st.raise());
                }
                Phase::Integrate => {
                    self.pulses.pulse_for_duration(&mut self.clock, integrate_us);
                }
                Phase::Stop => self.st.lower(),
                Phase::Readout => failed = self.read_out(buffer),
                counted => self.pulses.pulse(counted.pulses().unwrap_or(0)),
            }
            rec.phase_done(phase, &mut self.clock);
        }

        self.trace = rec.finish();
        if failed > 0 {
            warn!("{} of {} pixels failed to sample", failed, CHANNELS);
        }
        trace!("read timings (us): {:?}", self.trace.marks());
        Ok(())
    }

    /// Like [`read_into`](Self::read_into), returning a new frame.
    pub fn read(&mut self) -> Result<Frame, Error> {
        let mut frame = [0u16; CHANNELS];
        self.read_into(&mut frame)?;
        Ok(frame)
    }

    /// Offset `index` (0 to 4) of the most recent read's [`TimingTrace`], in microseconds.
    /// Returns 0 for any other index, and for every index before the first read.
    pub fn timing(&self, index: usize) -> u32 {
        self.trace.get(index)
    }

    pub fn timing_trace(&self) -> &TimingTrace {
        &self.trace
    }

    /// Destroy the driver and give back the devices it owned.
    pub fn release(self) -> (CLK, ST, T, C, S) {
        let (clk, ticks) = self.pulses.release();
        (clk, self.st, ticks, self.clock, self.sampler)
    }

    // One sample then one advance pulse per pixel. Returns the number of failed samples.
    fn read_out(&mut self, buffer: &mut Frame) -> u16 {
        let mut failed = 0u16;
        self.sampler.begin_frame();
        for (channel, slot) in buffer.iter_mut().enumerate() {
            let result = {
                let mut timeout = Timeout::start(&mut self.clock, self.sample_timeout_us);
                self.sampler.sample(channel as u16, &mut timeout)
            };
            *slot = match result {
                Ok(millivolts) => millivolts.min(MAX_READING),
                Err(_) => {
                    failed += 1;
                    SAMPLE_FAILED
                }
            };
            self.pulses.pulse(1);
        }
        self.sampler.end_frame();
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clock::test_spy::SimTime;
    use line::test_spy::{count_pulses, Event, LineLog, SpyLine};
    use proptest::prelude::*;
    use protocol::fixed_pulses_per_read;
    use sampler::test_spy::{ScriptedSampler, SilentSampler};
    use sampler::SampleError;

    type TestSpectrometer<S> = Spectrometer<SpyLine, SpyLine, SimTime, SimTime, S>;

    fn rig<S: Sampler>(time: &SimTime, log: &LineLog, sampler: S) -> TestSpectrometer<S> {
        Spectrometer::new(
            log.clock_line(),
            log.control_line(),
            time.split(),
            time.split(),
            sampler,
        )
    }

    fn initialized(
        sampler: ScriptedSampler,
    ) -> (TestSpectrometer<ScriptedSampler>, LineLog, SimTime) {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, sampler);
        spec.initialize();
        log.clear();
        (spec, log, time)
    }

    // Clock pulses issued before the start line rises, while it is high, and after it drops.
    fn pulses_by_control_state(events: &[Event]) -> (usize, usize, usize) {
        let rise = events
            .iter()
            .position(|e| *e == Event::Control(true))
            .unwrap();
        let fall = events
            .iter()
            .position(|e| *e == Event::Control(false))
            .unwrap();
        (
            count_pulses(&events[..rise]),
            count_pulses(&events[rise..fall]),
            count_pulses(&events[fall..]),
        )
    }

    #[test]
    fn read_before_initialize_is_uncalibrated() {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, ScriptedSampler::ramp());
        let mut buffer = [0x5555u16; CHANNELS];

        assert_eq!(spec.read_into(&mut buffer), Err(Error::Uncalibrated));
        assert_eq!(spec.read().err(), Some(Error::Uncalibrated));
        assert!(buffer.iter().all(|&v| v == 0x5555));
        assert!(log.events().is_empty());
        assert_eq!(time.now_ns(), 0);
        assert_eq!((0..5).map(|i| spec.timing(i)).sum::<u32>(), 0);
        assert!(spec.release().4.calls.is_empty());
    }

    #[test]
    fn initialize_idles_lines_then_calibrates() {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, ScriptedSampler::ramp());

        assert_eq!(spec.initialize(), 96);
        assert_eq!(spec.integration_floor(), Some(96));
        let events = log.events();
        assert_eq!(&events[..2], &[Event::Clock(false), Event::Control(false)]);
        assert_eq!(count_pulses(&events), 48);
    }

    #[test]
    fn frame_holds_samples_in_pixel_order() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        let mut buffer = [0u16; CHANNELS];
        assert!(spec.read_into(&mut buffer).is_ok());
        for (i, v) in buffer.iter().enumerate() {
            assert_eq!(*v, 1_000 + i as u16);
        }
        assert_eq!(
            spec.release().4.calls,
            (0..CHANNELS as u16).collect::<Vec<_>>()
        );
    }

    #[test]
    fn timed_out_samples_become_sentinels() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::stalled());
        let frame = spec.read().unwrap();
        assert!(frame.iter().all(|&v| v == SAMPLE_FAILED));
        assert_eq!(log.clock_pulses() as u32, 380 + 452);
    }

    #[test]
    fn readings_never_collide_with_sentinel() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::new(|ch| match ch % 3 {
            0 => Ok(SAMPLE_FAILED),
            1 => Ok(u16::max_value()),
            _ => Ok(MAX_READING),
        }));
        let frame = spec.read().unwrap();
        assert!(frame.iter().all(|&v| v == MAX_READING));
    }

    #[test]
    fn failures_are_per_pixel() {
        fn every_seventh_fails(ch: u16) -> Result<u16, SampleError<()>> {
            if ch % 7 == 0 {
                Err(SampleError::Failure(()))
            } else {
                Ok(ch)
            }
        }
        let (mut spec, _log, _time) = initialized(ScriptedSampler::new(every_seventh_fails));
        let frame = spec.read().unwrap();
        for (i, v) in frame.iter().enumerate() {
            if i % 7 == 0 {
                assert_eq!(*v, SAMPLE_FAILED);
            } else {
                assert_eq!(*v, i as u16);
            }
        }
    }

    #[test]
    fn silent_adc_waits_out_each_timeout() {
        let time = SimTime::new().with_read_cost(100);
        let log = LineLog::new();
        let mut spec = rig(&time, &log, SilentSampler);
        spec.initialize();
        assert!(spec.configure().sample_timeout(20).commit().is_ok());

        let frame = spec.read().unwrap();
        assert!(frame.iter().all(|&v| v == SAMPLE_FAILED));
        let readout = spec.timing(4) - spec.timing(3);
        // Each pixel waits 20 us plus its 2 us advance pulse.
        assert!(readout >= 20 * CHANNELS as u32);
        assert!(readout < 30 * CHANNELS as u32);
    }

    #[test]
    fn phase_timestamps() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        spec.read().unwrap();
        assert_eq!(spec.timing_trace().marks(), &[8, 912, 1_008, 1_088, 1_664]);
        assert_eq!(spec.timing(5), 0);
    }

    #[test]
    fn slow_sampler_stretches_readout_only() {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, ScriptedSampler::ramp().costing(&time, 10_000));
        spec.initialize();
        spec.read().unwrap();
        assert_eq!(spec.timing(3), 1_088);
        assert_eq!(spec.timing(4), 1_088 + 288 * 12);
    }

    #[test]
    fn fixed_phases_issue_380_pulses() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        spec.set_integration_time(0);
        spec.read().unwrap();
        assert_eq!(log.clock_pulses(), 380);
        assert_eq!(log.clock_pulses() as u32, fixed_pulses_per_read());
        assert_eq!(pulses_by_control_state(&log.events()), (1, 3, 376));
    }

    #[test]
    fn integrate_phase_adds_pulses_while_start_line_high() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        spec.read().unwrap();
        // 904 us of integration at 2 us per pulse.
        assert_eq!(pulses_by_control_state(&log.events()), (1, 3 + 452, 376));
    }

    #[test]
    fn each_pixel_sampled_before_its_advance_pulse() {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, ScriptedSampler::ramp().logging_to(&log));
        spec.initialize();
        log.clear();
        spec.read().unwrap();

        let events = log.events();
        let begin = events.iter().position(|e| *e == Event::FrameBegin).unwrap();
        let readout = &events[begin + 1..];
        assert_eq!(readout.len(), CHANNELS * 3 + 1);
        for (ch, chunk) in readout.chunks(3).take(CHANNELS).enumerate() {
            assert_eq!(
                chunk,
                &[Event::Sample(ch as u16), Event::Clock(true), Event::Clock(false)]
            );
        }
        assert_eq!(readout.last(), Some(&Event::FrameEnd));
    }

    #[test]
    fn lines_end_low() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        spec.read().unwrap();
        let events = log.events();
        let last_control = events.iter().rev().find(|e| match **e {
            Event::Control(_) => true,
            _ => false,
        });
        assert_eq!(last_control, Some(&Event::Control(false)));
        assert_eq!(events.last(), Some(&Event::Clock(false)));
    }

    #[test]
    fn start_line_rises_on_first_falling_edge() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        spec.read().unwrap();
        assert_eq!(
            &log.events()[..3],
            &[Event::Clock(true), Event::Clock(false), Event::Control(true)]
        );
    }

    #[test]
    fn repeated_reads_are_identical() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        let first = spec.read().unwrap();
        let first_trace = *spec.timing_trace();
        let second = spec.read().unwrap();
        assert_eq!(&first[..], &second[..]);
        assert_eq!(&first_trace, spec.timing_trace());
    }

    #[test]
    fn short_integration_clamps_to_floor() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        spec.set_integration_time(10);
        spec.read().unwrap();
        assert_eq!(spec.timing(1) - spec.timing(0), 0);
        // Exposure never drops below the post-stop pulse train.
        assert_eq!(spec.timing_trace().exposure_us(), 96);
    }

    #[test]
    fn integration_time_persists_across_reads() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        spec.set_integration_time(2_096);
        spec.read().unwrap();
        spec.read().unwrap();
        assert_eq!(spec.integration_time(), 2_096);
        assert_eq!(spec.timing_trace().exposure_us(), 2_096);
    }

    #[test]
    fn new_pulse_timing_recalibrates() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        assert!(spec
            .configure()
            .pulse_timing(PulseTiming::from_half_period_ns(500))
            .commit()
            .is_ok());
        assert_eq!(spec.integration_floor(), Some(48));
        assert_eq!(log.clock_pulses(), 48);
    }

    #[test]
    fn unchanged_pulse_timing_does_not_recalibrate() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        assert!(spec.configure().integration_time(5_000).commit().is_ok());
        assert_eq!(spec.integration_time(), 5_000);
        assert!(log.events().is_empty());
    }

    #[test]
    fn configure_before_initialize_does_not_calibrate() {
        let time = SimTime::new();
        let log = LineLog::new();
        let mut spec = rig(&time, &log, ScriptedSampler::ramp());
        assert!(spec
            .configure()
            .pulse_timing(PulseTiming::from_half_period_ns(250))
            .commit()
            .is_ok());
        assert_eq!(spec.integration_floor(), None);
        assert!(log.events().is_empty());
        assert_eq!(spec.initialize(), 24);
    }

    #[test]
    fn invalid_pulse_timing_is_rejected() {
        let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
        let before = spec.config();
        assert_eq!(
            spec.configure()
                .integration_time(1)
                .pulse_timing(PulseTiming::from_half_period_ns(0))
                .commit(),
            Err(Error::InvalidPulseTiming)
        );
        assert_eq!(spec.config(), before);
    }

    #[test]
    fn recalibrate_keeps_control_line_low() {
        let (mut spec, log, _time) = initialized(ScriptedSampler::ramp());
        assert_eq!(spec.recalibrate(), 96);
        assert_eq!(log.events()[0], Event::Control(false));
        assert_eq!(log.clock_pulses(), 48);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn timestamps_are_monotonic(integration in 0u32..20_000) {
            let (mut spec, _log, _time) = initialized(ScriptedSampler::ramp());
            spec.set_integration_time(integration);
            spec.read().unwrap();
            let marks = *spec.timing_trace().marks();
            prop_assert!(marks.windows(2).all(|w| w[0] <= w[1]));

            // The integrate phase runs in whole 2 us pulses.
            let integrate = integration.saturating_sub(96);
            prop_assert_eq!(marks[1] - marks[0], (integrate + 1) / 2 * 2);
        }

        #[test]
        fn failures_never_shift_pixels(
            failing in prop::collection::vec(any::<bool>(), CHANNELS)
        ) {
            let script = failing.clone();
            let sampler = ScriptedSampler::new(move |ch| {
                if script[ch as usize] {
                    Err(SampleError::Timeout)
                } else {
                    Ok(ch)
                }
            });
            let (mut spec, log, _time) = initialized(sampler);
            spec.set_integration_time(0);
            let mut buffer = [0u16; CHANNELS];
            prop_assert!(spec.read_into(&mut buffer).is_ok());
            for (i, v) in buffer.iter().enumerate() {
                let expected = if failing[i] { SAMPLE_FAILED } else { i as u16 };
                prop_assert_eq!(*v, expected);
            }
            prop_assert_eq!(log.clock_pulses(), 380);
            prop_assert_eq!(spec.release().4.calls.len(), CHANNELS);
        }
    }
}
