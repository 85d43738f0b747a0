//! Conversions between microseconds, macro-period clocks (mclks) and the
//! sensor's encoded timeout registers.
//!
//! All arithmetic is fixed point. Macro periods are in 12.12 format, the PLL
//! period in 0.24 format.

/// Timeout register contents: `(mantissa << exponent) + 1` mclks, with the
/// exponent in the high byte and the mantissa in the low byte.
pub type EncodedTimeout = u16;

// Macro period is 2304 PLL periods per VCSEL pclk.
const MACRO_PERIOD_PLL_CLOCKS: u64 = 2304;

/// Length of one macro period in microseconds (12.12 fixed point) for the
/// given VCSEL period register value.
///
/// Returns 0 when `fast_osc_frequency` is 0, which means the oscillator was
/// never measured. Callers must treat that as a failure.
pub fn macro_period_us(vcsel_period: u8, fast_osc_frequency: u16) -> u32 {
    if fast_osc_frequency == 0 {
        return 0;
    }

    let pll_period_us = (1u64 << 30) / u64::from(fast_osc_frequency);
    let vcsel_period_pclks = (u64::from(vcsel_period) + 1) << 1;

    // The two shifts keep the intermediate product small; don't merge them.
    let mut macro_period_us = MACRO_PERIOD_PLL_CLOCKS * pll_period_us;
    macro_period_us >>= 6;
    macro_period_us *= vcsel_period_pclks;
    macro_period_us >>= 6;

    u32::try_from(macro_period_us).unwrap_or(u32::MAX)
}

/// Converts a timeout in microseconds to macro-period clocks, rounding to
/// nearest. A zero macro period yields 0.
pub fn timeout_us_to_mclks(timeout_us: u32, macro_period_us: u32) -> u32 {
    if macro_period_us == 0 {
        return 0;
    }

    let macro_period_us = u64::from(macro_period_us);
    let mclks = ((u64::from(timeout_us) << 12) + (macro_period_us >> 1)) / macro_period_us;

    u32::try_from(mclks).unwrap_or(u32::MAX)
}

/// Converts macro-period clocks back to microseconds, rounding to nearest.
pub fn timeout_mclks_to_us(timeout_mclks: u32, macro_period_us: u32) -> u32 {
    let us = (u64::from(timeout_mclks) * u64::from(macro_period_us) + 0x800) >> 12;

    u32::try_from(us).unwrap_or(u32::MAX)
}

/// Packs a timeout into the register format. Zero encodes as zero.
pub fn encode_timeout(timeout_mclks: u32) -> EncodedTimeout {
    if timeout_mclks == 0 {
        return 0;
    }

    let value = timeout_mclks - 1;
    let bit_length = u32::BITS - value.leading_zeros();
    let exponent = bit_length.saturating_sub(8);
    let mantissa = value >> exponent;

    ((exponent as u16) << 8) | (mantissa as u16 & 0xff)
}

/// Unpacks a timeout register value into mclks.
pub fn decode_timeout(encoded: EncodedTimeout) -> u32 {
    let mantissa = u32::from(encoded & 0xff);
    let exponent = u32::from(encoded >> 8);

    mantissa
        .checked_shl(exponent)
        .map_or(u32::MAX, |mclks| mclks.saturating_add(1))
}

/// Encoded timeouts for the two ranging phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncodedTimeouts {
    pub a: EncodedTimeout,
    pub b: EncodedTimeout,
}

/// Splits `budget_us` evenly between phases A and B and encodes each half
/// against its own VCSEL period.
///
/// Returns `None` if either macro period comes out as zero.
pub fn encode_timing_budget(
    budget_us: u32,
    vcsel_period_a: u8,
    vcsel_period_b: u8,
    fast_osc_frequency: u16,
) -> Option<EncodedTimeouts> {
    let macro_period_a = macro_period_us(vcsel_period_a, fast_osc_frequency);
    let macro_period_b = macro_period_us(vcsel_period_b, fast_osc_frequency);
    if macro_period_a == 0 || macro_period_b == 0 {
        return None;
    }

    let phase_us = budget_us / 2;

    Some(EncodedTimeouts {
        a: encode_timeout(timeout_us_to_mclks(phase_us, macro_period_a)),
        b: encode_timeout(timeout_us_to_mclks(phase_us, macro_period_b)),
    })
}

/// Turns encoded phase timeouts back into a total budget in microseconds.
/// Returns `None` if the oscillator frequency is unknown.
pub fn decode_timing_budget(
    timeouts: EncodedTimeouts,
    vcsel_period_a: u8,
    vcsel_period_b: u8,
    fast_osc_frequency: u16,
) -> Option<u32> {
    let macro_period_a = macro_period_us(vcsel_period_a, fast_osc_frequency);
    let macro_period_b = macro_period_us(vcsel_period_b, fast_osc_frequency);
    if macro_period_a == 0 || macro_period_b == 0 {
        return None;
    }

    let a_us = timeout_mclks_to_us(decode_timeout(timeouts.a), macro_period_a);
    let b_us = timeout_mclks_to_us(decode_timeout(timeouts.b), macro_period_b);

    Some(a_us.saturating_add(b_us))
}
