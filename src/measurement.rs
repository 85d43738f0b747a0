use core::fmt::{Display, Formatter};

/// Size of the result block starting at `RESULT__RANGE_STATUS`.
pub const RESULT_BLOCK_LEN: usize = 17;

const RANGE_STATUS_OFFSET: usize = 0;
const STREAM_COUNT_OFFSET: usize = 2;
const FINAL_RANGE_OFFSET: usize = 13;

// Gain correction of the final range, 2011/2048 as characterized for the
// sensor family.
const GAIN_NUMERATOR: u32 = 2011;
const GAIN_SHIFT: u32 = 11;

/// Raw contents of the result block.
pub type RawRangeResult = [u8; RESULT_BLOCK_LEN];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Measurement {
    /// Range status register, unmodified.
    pub status: u8,
    /// Measurement counter, increments with every range.
    pub stream_count: u8,
    /// Gain-corrected distance.
    pub distance_mm: u16,
}

impl Measurement {
    /// Decodes a result block. Pure; no bus access.
    pub fn decode(raw: &RawRangeResult) -> Self {
        let final_range = u16::from_be_bytes([
            raw[FINAL_RANGE_OFFSET],
            raw[FINAL_RANGE_OFFSET + 1],
        ]);

        Self {
            status: raw[RANGE_STATUS_OFFSET],
            stream_count: raw[STREAM_COUNT_OFFSET],
            distance_mm: gain_corrected_mm(final_range),
        }
    }

    pub fn range_status(&self) -> RangeStatus {
        RangeStatus::from_register(self.status)
    }
}

/// Applies the 2011/2048 gain factor, rounding half up.
pub fn gain_corrected_mm(final_range: u16) -> u16 {
    let scaled = u32::from(final_range) * GAIN_NUMERATOR;
    let corrected = (scaled + (1 << (GAIN_SHIFT - 1))) >> GAIN_SHIFT;

    // 65535 * 2011 / 2048 still fits
    corrected as u16
}

// Magic numbers and comments below are from the STM driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeStatus {
    /// No error
    Ok,
    /// The repeatability or standard deviation of the measurement is bad due
    /// to a decreasing signal noise ratio. Increasing the timing budget can
    /// help.
    SigmaFailureWarning,
    /// The return signal is too weak to return a good answer: the target is
    /// too far, not reflective enough, or too small.
    SignalFailureWarning,
    /// The sensor is ranging in a "non-appropriated" zone and the result may
    /// be inconsistent. Typically a bright target at the maximum distance.
    OutOfBoundsError,
    /// "Wraparound": a very reflective target beyond the physical limit of
    /// the distance mode is reported closer than it is.
    WraparoundError,
    /// Error code not documented by STM.
    Undocumented(u8),
    /// Register value doesn't map to error code.
    InvalidRegisterValue(u8),
}

impl RangeStatus {
    pub fn from_register(value: u8) -> Self {
        match value & 0x1f {
            3 => RangeStatus::Undocumented(5),
            4 => RangeStatus::SignalFailureWarning,
            5 => RangeStatus::OutOfBoundsError,
            6 => RangeStatus::SigmaFailureWarning,
            7 => RangeStatus::WraparoundError,
            8 => RangeStatus::Undocumented(3),
            9 => RangeStatus::Ok,
            12 => RangeStatus::Undocumented(9),
            13 => RangeStatus::Undocumented(13),
            18 => RangeStatus::Undocumented(10),
            19 => RangeStatus::Undocumented(6),
            22 => RangeStatus::Undocumented(11),
            23 => RangeStatus::Undocumented(12),
            v => RangeStatus::InvalidRegisterValue(v),
        }
    }
}

impl Display for RangeStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match *self {
            RangeStatus::Ok => f.pad("Ok"),
            RangeStatus::SigmaFailureWarning => f.pad("sigma failure"),
            RangeStatus::SignalFailureWarning => f.pad("signal failure"),
            RangeStatus::OutOfBoundsError => f.pad("out of bounds"),
            RangeStatus::WraparoundError => f.pad("wraparound"),
            RangeStatus::Undocumented(status) => {
                f.write_fmt(format_args!("undocumented({})", status))
            }
            RangeStatus::InvalidRegisterValue(status) => {
                f.write_fmt(format_args!("invalid({})", status))
            }
        }
    }
}
