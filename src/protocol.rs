//! Fixed properties of the C12880MA readout protocol.

/// Number of pixels on the sensor. Each pixel is read out on its own analog channel sample.
pub const CHANNELS: usize = 288;

/// Reserved reading stored in a frame slot whose sample timed out or failed. It sits well above
/// the ~3.1 V full scale of the video output, so it cannot collide with a real reading.
pub const SAMPLE_FAILED: u16 = 9999;

/// Largest reading stored in a frame. Samplers scaled past the sentinel are clamped to this.
pub const MAX_READING: u16 = SAMPLE_FAILED - 1;

/// Clock pulses between raising the start line and the start of integration.
pub const INTEGRATION_START_PULSES: u16 = 3;

/// Clock pulses after the start line drops until integration ends.
pub const POST_STOP_PULSES: u16 = 48;

/// Clock pulses after integration ends until the first pixel is on the video line.
pub const PRE_READOUT_PULSES: u16 = 40;

/// Number of timestamps recorded by each read.
pub const TIMING_MARKS: usize = 5;

/// One complete readout of every pixel, indexed by pixel position.
pub type Frame = [u16; CHANNELS];

/// The phases of one read, in the order they are executed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    /// One clock pulse, with the start line raised on its falling edge.
    Start,

    /// Clock pulses after the start line goes high. The sensor begins integrating on the third.
    StartOfIntegration,

    /// Free-running clock for the corrected integration duration.
    Integrate,

    /// Start line lowered. No clock activity.
    Stop,

    /// Clock pulses after the start line goes low. Integration ends on the 48th.
    PostStopSettle,

    /// Further clock pulses before the first pixel appears on the video line.
    PreReadoutSettle,

    /// One sample and one advance pulse per pixel.
    Readout,
}

impl Phase {
    /// All phases in execution order.
    pub const SEQUENCE: [Phase; 7] = [
        Phase::Start,
        Phase::StartOfIntegration,
        Phase::Integrate,
        Phase::Stop,
        Phase::PostStopSettle,
        Phase::PreReadoutSettle,
        Phase::Readout,
    ];

    /// Number of clock pulses this phase always issues, or `None` for the integrate phase, whose
    /// pulse count depends on the integration time.
    pub fn pulses(self) -> Option<u16> {
        use self::Phase::*;
        match self {
            Start => Some(1),
            StartOfIntegration => Some(INTEGRATION_START_PULSES),
            Integrate => None,
            Stop => Some(0),
            PostStopSettle => Some(POST_STOP_PULSES),
            PreReadoutSettle => Some(PRE_READOUT_PULSES),
            Readout => Some(CHANNELS as u16),
        }
    }

    /// The timing mark recorded when this phase completes, if any.
    pub fn mark(self) -> Option<usize> {
        use self::Phase::*;
        match self {
            Start | Integrate => None,
            StartOfIntegration => Some(0),
            Stop => Some(1),
            PostStopSettle => Some(2),
            PreReadoutSettle => Some(3),
            Readout => Some(4),
        }
    }
}

/// Clock pulses issued by the fixed-length phases of every read.
pub fn fixed_pulses_per_read() -> u32 {
    Phase::SEQUENCE
        .iter()
        .filter_map(|p| p.pulses())
        .map(u32::from)
        .sum()
}
